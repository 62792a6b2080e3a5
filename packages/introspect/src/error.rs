use busgen_signature::SignatureError;
use thiserror::Error;

pub type IntrospectResult<T> = Result<T, IntrospectError>;

#[derive(Error, Debug)]
pub enum IntrospectError {
    #[error("Malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Root element must be <node>, found <{0}>")]
    UnexpectedRoot(String),

    #[error("Missing attribute '{attribute}' on <{element}> at line {line}")]
    MissingAttribute {
        element: String,
        attribute: String,
        line: u32,
    },

    #[error("Invalid type signature on {context}: {source}")]
    Signature {
        context: String,
        #[source]
        source: SignatureError,
    },

    #[error("Unexpected access \"{literal}\" on property {property}")]
    AccessLiteral { property: String, literal: String },

    #[error("Unexpected direction \"{literal}\" on an argument of {member}")]
    DirectionLiteral { member: String, literal: String },
}

impl IntrospectError {
    pub fn missing_attribute(element: impl Into<String>, attribute: impl Into<String>, line: u32) -> Self {
        Self::MissingAttribute {
            element: element.into(),
            attribute: attribute.into(),
            line,
        }
    }

    pub fn signature(context: impl Into<String>, source: SignatureError) -> Self {
        Self::Signature {
            context: context.into(),
            source,
        }
    }
}
