//! # busgen-signature
//!
//! The recursive D-Bus type-signature grammar. A [`Signature`] describes
//! exactly one complete type; argument lists are several signatures, never
//! one combined value.
//!
//! ```rust
//! use busgen_signature::Signature;
//!
//! let sig = Signature::parse("a(sa{sv})").unwrap();
//! assert_eq!(sig.to_signature(), "a(sa{sv})");
//! ```

pub mod error;
pub mod signature;

pub use error::{Container, SignatureError, SignatureResult};
pub use signature::{PrimitiveCode, Signature, MAX_DEPTH};
