//! Serialization primitives and the PDX structured field format.

mod data_input;
mod data_output;
pub mod pdx;

pub use data_input::{DataInput, ObjectDataInput};
pub use data_output::{DataOutput, ObjectDataOutput, NULL_LENGTH};
