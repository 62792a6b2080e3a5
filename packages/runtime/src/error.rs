use busgen_signature::SignatureError;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Cannot write a {0} as a variant")]
    UnsupportedVariant(String),

    #[error("Dictionary keys must be strings, got {0}")]
    NonStringKey(String),

    #[error("Unexpected end of {0}")]
    UnexpectedEnd(String),

    #[error("Container mismatch: {0}")]
    ContainerMismatch(String),

    #[error("Invalid signature: {0}")]
    Signature(#[from] SignatureError),

    #[error("Remote error {name}: {message}")]
    Remote { name: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection closed")]
    Disconnected,
}

impl RuntimeError {
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn remote(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            name: name.into(),
            message: message.into(),
        }
    }
}
