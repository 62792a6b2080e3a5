//! # busgen-compiler
//!
//! Turns a parsed introspection document into Rust source for typed client
//! stubs. Each interface becomes a struct wrapping a `Connection` with one
//! async function per method, one stream-returning function per signal and
//! getters/setters per property.
//!
//! ```rust
//! use busgen_compiler::{compile_xml, CompileOptions};
//!
//! let xml = r#"
//! <node>
//!   <interface name="org.example.Clock">
//!     <method name="Now"><arg name="seconds" type="t" direction="out"/></method>
//!   </interface>
//! </node>"#;
//!
//! let source = compile_xml(xml, CompileOptions::default()).unwrap();
//! assert!(source.contains("pub async fn now(&self) -> RuntimeResult<u64>"));
//! ```

mod compiler;
mod context;
mod error;
pub mod naming;
pub mod plan;
pub mod types;

pub use compiler::{compile_document, compile_xml};
pub use context::{CompileOptions, CompilerContext};
pub use error::{CompileError, CompileResult};
pub use types::{map_type, HostType};
