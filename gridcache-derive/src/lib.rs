//! Derive macro for gridcache PDX serialization.
//!
//! `#[derive(PdxSerializable)]` generates both `PdxSerializable` and
//! `PdxDeserializable` for a struct with named fields.
//!
//! # Example
//!
//! ```ignore
//! use gridcache_core::serialization::pdx::PdxUnreadFields;
//! use gridcache_derive::PdxSerializable;
//!
//! #[derive(PdxSerializable)]
//! #[pdx(type_name = "com.example.Order")]
//! struct Order {
//!     #[pdx(identity)]
//!     id: i64,
//!     #[pdx(field_name = "customerName")]
//!     customer: Option<String>,
//!     #[pdx(unread)]
//!     unread: PdxUnreadFields,
//! }
//! ```

extern crate proc_macro;

mod pdx;

use proc_macro::TokenStream;

/// Derives `PdxSerializable` and `PdxDeserializable` for a struct.
///
/// # Attributes
///
/// ## Struct-level
/// - `#[pdx(type_name = "...")]` sets the recorded type name (defaults to the
///   Rust struct name).
///
/// ## Field-level
/// - `#[pdx(field_name = "...")]` overrides the wire field name.
/// - `#[pdx(identity)]` marks the field as part of the object's identity.
/// - `#[pdx(skip)]` leaves the field out; it is rebuilt with `Default`.
/// - `#[pdx(unread)]` holds the `PdxUnreadFields` of the last read, replayed
///   before the other fields on write. At most one field may carry it.
///
/// # Field Types
///
/// Any type that implements both `PdxField` and `FromPdxValue + Default`:
/// the primitive integers and floats, `bool`, `u8` (single-byte char),
/// `char` (wide char), `String`, `DateTime<Utc>`, the supported `Vec`
/// element types, and `Option` of any of those. Fields missing from an older
/// record are read as `Default::default()`.
#[proc_macro_derive(PdxSerializable, attributes(pdx))]
pub fn derive_pdx(input: TokenStream) -> TokenStream {
    pdx::derive_pdx_impl(input)
}
