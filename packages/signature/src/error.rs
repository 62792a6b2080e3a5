use thiserror::Error;

pub type SignatureResult<T> = Result<T, SignatureError>;

/// Container kinds that can be left open at end of input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Array,
    Struct,
    DictEntry,
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Container::Array => "array",
            Container::Struct => "struct",
            Container::DictEntry => "dict entry",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Unknown type code '{code}' at {pos} in \"{signature}\"")]
    UnknownCode {
        code: char,
        pos: usize,
        signature: String,
    },

    #[error("Unclosed {container} at end of \"{signature}\"")]
    Unclosed {
        container: Container,
        signature: String,
    },

    #[error("Empty signature: expected exactly one complete type")]
    Empty,

    #[error("Struct without fields at {pos} in \"{signature}\"")]
    EmptyStruct { pos: usize, signature: String },

    #[error("Unexpected '{found}' at {pos} in \"{signature}\"")]
    UnexpectedChar {
        found: char,
        pos: usize,
        signature: String,
    },

    #[error("Containers nested deeper than {limit} levels at {pos} in \"{signature}\"")]
    TooDeep {
        limit: usize,
        pos: usize,
        signature: String,
    },

    #[error("Signature \"{signature}\" has trailing characters after index {pos}")]
    TrailingCharacters { pos: usize, signature: String },
}

impl SignatureError {
    pub fn unknown_code(code: char, pos: usize, signature: impl Into<String>) -> Self {
        Self::UnknownCode {
            code,
            pos,
            signature: signature.into(),
        }
    }

    pub fn unclosed(container: Container, signature: impl Into<String>) -> Self {
        Self::Unclosed {
            container,
            signature: signature.into(),
        }
    }

    pub fn empty_struct(pos: usize, signature: impl Into<String>) -> Self {
        Self::EmptyStruct {
            pos,
            signature: signature.into(),
        }
    }

    pub fn unexpected_char(found: char, pos: usize, signature: impl Into<String>) -> Self {
        Self::UnexpectedChar {
            found,
            pos,
            signature: signature.into(),
        }
    }

    pub fn trailing(pos: usize, signature: impl Into<String>) -> Self {
        Self::TrailingCharacters {
            pos,
            signature: signature.into(),
        }
    }
}
