use busgen_introspect::IntrospectError;
use busgen_signature::{Signature, SignatureError};
use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Introspect(#[from] IntrospectError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("Dictionary entry {signature} is only valid as an array element")]
    DictEntryOutsideArray { signature: String },

    #[error("Unsupported shape {signature}: {reason}")]
    UnsupportedShape { signature: String, reason: String },

    #[error("{name} is generated more than once in {scope}")]
    NameCollision { scope: String, name: String },

    #[error("In {interface}.{member}: {source}")]
    Member {
        interface: String,
        member: String,
        #[source]
        source: Box<CompileError>,
    },
}

impl CompileError {
    pub fn dict_entry_outside_array(signature: &Signature) -> Self {
        Self::DictEntryOutsideArray {
            signature: signature.to_signature(),
        }
    }

    pub fn unsupported(signature: &Signature, reason: impl Into<String>) -> Self {
        Self::UnsupportedShape {
            signature: signature.to_signature(),
            reason: reason.into(),
        }
    }

    pub fn collision(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NameCollision {
            scope: scope.into(),
            name: name.into(),
        }
    }

    /// Attach the member being compiled
    pub fn in_member(self, interface: &str, member: &str) -> Self {
        Self::Member {
            interface: interface.to_string(),
            member: member.to_string(),
            source: Box::new(self),
        }
    }

    /// The error without member context
    pub fn root_cause(&self) -> &CompileError {
        match self {
            Self::Member { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
