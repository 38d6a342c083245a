//! Core types for the gridcache client: errors and PDX serialization.

#![warn(missing_docs)]

pub mod error;
pub mod serialization;

pub use error::{GridError, Result, TeardownFailure};
pub use serialization::{DataInput, DataOutput, ObjectDataInput, ObjectDataOutput};
