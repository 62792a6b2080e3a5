//! # busgen-introspect
//!
//! Structural extraction of D-Bus introspection XML into an immutable AST.
//! Signature text is parsed here, so a document that makes it through
//! [`parse`] only carries well-formed [`busgen_signature::Signature`]s.

pub mod ast;
pub mod error;
pub mod parser;

pub use ast::{
    Access, Annotation, Arg, Direction, Interface, IntrospectionNode, Method, Property, Signal,
};
pub use error::{IntrospectError, IntrospectResult};
pub use parser::parse;
