use crate::error::{Container, SignatureError, SignatureResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Maximum container nesting accepted by the parser (32 arrays + 32 structs on the wire)
pub const MAX_DEPTH: usize = 64;

/// The 13 basic (single character) type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveCode {
    Byte,
    Boolean,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Double,
    String,
    ObjectPath,
    Signature,
    UnixFd,
}

impl PrimitiveCode {
    pub const ALL: [PrimitiveCode; 13] = [
        PrimitiveCode::Byte,
        PrimitiveCode::Boolean,
        PrimitiveCode::Int16,
        PrimitiveCode::UInt16,
        PrimitiveCode::Int32,
        PrimitiveCode::UInt32,
        PrimitiveCode::Int64,
        PrimitiveCode::UInt64,
        PrimitiveCode::Double,
        PrimitiveCode::String,
        PrimitiveCode::ObjectPath,
        PrimitiveCode::Signature,
        PrimitiveCode::UnixFd,
    ];

    pub fn from_char(code: char) -> Option<Self> {
        let primitive = match code {
            'y' => PrimitiveCode::Byte,
            'b' => PrimitiveCode::Boolean,
            'n' => PrimitiveCode::Int16,
            'q' => PrimitiveCode::UInt16,
            'i' => PrimitiveCode::Int32,
            'u' => PrimitiveCode::UInt32,
            'x' => PrimitiveCode::Int64,
            't' => PrimitiveCode::UInt64,
            'd' => PrimitiveCode::Double,
            's' => PrimitiveCode::String,
            'o' => PrimitiveCode::ObjectPath,
            'g' => PrimitiveCode::Signature,
            'h' => PrimitiveCode::UnixFd,
            _ => return None,
        };
        Some(primitive)
    }

    pub fn as_char(self) -> char {
        match self {
            PrimitiveCode::Byte => 'y',
            PrimitiveCode::Boolean => 'b',
            PrimitiveCode::Int16 => 'n',
            PrimitiveCode::UInt16 => 'q',
            PrimitiveCode::Int32 => 'i',
            PrimitiveCode::UInt32 => 'u',
            PrimitiveCode::Int64 => 'x',
            PrimitiveCode::UInt64 => 't',
            PrimitiveCode::Double => 'd',
            PrimitiveCode::String => 's',
            PrimitiveCode::ObjectPath => 'o',
            PrimitiveCode::Signature => 'g',
            PrimitiveCode::UnixFd => 'h',
        }
    }

    /// String, object path and signature all travel as text
    pub fn is_string_like(self) -> bool {
        matches!(
            self,
            PrimitiveCode::String | PrimitiveCode::ObjectPath | PrimitiveCode::Signature
        )
    }
}

impl fmt::Display for PrimitiveCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A single complete D-Bus type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signature {
    Primitive(PrimitiveCode),
    Array(Box<Signature>),
    Struct(Vec<Signature>),
    DictEntry(Box<Signature>, Box<Signature>),
    Variant,
}

impl Signature {
    /// Parse exactly one complete type
    pub fn parse(source: &str) -> SignatureResult<Signature> {
        let mut parser = SignatureParser::new(source);
        if parser.is_at_end() {
            return Err(SignatureError::Empty);
        }
        let signature = parser.parse_single(None, 0)?;
        if !parser.is_at_end() {
            return Err(SignatureError::trailing(parser.pos, source));
        }
        Ok(signature)
    }

    /// Parse a concatenation of complete types, e.g. a message body signature
    pub fn parse_list(source: &str) -> SignatureResult<Vec<Signature>> {
        let mut parser = SignatureParser::new(source);
        let mut signatures = Vec::new();
        while !parser.is_at_end() {
            signatures.push(parser.parse_single(None, 0)?);
        }
        Ok(signatures)
    }

    /// Canonical text form, the exact left inverse of [`Signature::parse`]
    pub fn to_signature(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        match self {
            Signature::Primitive(code) => out.push(code.as_char()),
            Signature::Array(element) => {
                out.push('a');
                element.write_to(out);
            }
            Signature::Struct(fields) => {
                out.push('(');
                for field in fields {
                    field.write_to(out);
                }
                out.push(')');
            }
            Signature::DictEntry(key, value) => {
                out.push('{');
                key.write_to(out);
                value.write_to(out);
                out.push('}');
            }
            Signature::Variant => out.push('v'),
        }
    }

    pub fn primitive(code: PrimitiveCode) -> Self {
        Signature::Primitive(code)
    }

    pub fn array(element: Signature) -> Self {
        Signature::Array(Box::new(element))
    }

    pub fn dict_entry(key: Signature, value: Signature) -> Self {
        Signature::DictEntry(Box::new(key), Box::new(value))
    }

    pub fn as_primitive(&self) -> Option<PrimitiveCode> {
        match self {
            Signature::Primitive(code) => Some(*code),
            _ => None,
        }
    }

    pub fn is_dict_entry(&self) -> bool {
        matches!(self, Signature::DictEntry(..))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_signature())
    }
}

impl std::str::FromStr for Signature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Signature::parse(s)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_signature())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Signature::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Recursive descent over the signature characters with one character of lookahead
struct SignatureParser<'src> {
    source: &'src str,
    chars: Vec<char>,
    pos: usize,
}

impl<'src> SignatureParser<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    /// `enclosing` is the container we are inside of, used to report unclosed input
    fn parse_single(
        &mut self,
        enclosing: Option<Container>,
        depth: usize,
    ) -> SignatureResult<Signature> {
        let start = self.pos;
        let ch = match self.advance() {
            Some(ch) => ch,
            None => {
                return Err(match enclosing {
                    Some(container) => SignatureError::unclosed(container, self.source),
                    None => SignatureError::Empty,
                })
            }
        };

        if let Some(code) = PrimitiveCode::from_char(ch) {
            return Ok(Signature::Primitive(code));
        }

        match ch {
            'v' => Ok(Signature::Variant),
            'a' => {
                self.check_depth(start, depth)?;
                let element = self.parse_single(Some(Container::Array), depth + 1)?;
                Ok(Signature::Array(Box::new(element)))
            }
            '(' => {
                self.check_depth(start, depth)?;
                if self.peek() == Some(')') {
                    return Err(SignatureError::empty_struct(start, self.source));
                }
                let mut fields = Vec::new();
                loop {
                    match self.peek() {
                        Some(')') => {
                            self.advance();
                            break;
                        }
                        None => {
                            return Err(SignatureError::unclosed(Container::Struct, self.source))
                        }
                        Some(_) => {
                            fields.push(self.parse_single(Some(Container::Struct), depth + 1)?)
                        }
                    }
                }
                Ok(Signature::Struct(fields))
            }
            '{' => {
                self.check_depth(start, depth)?;
                let key = self.parse_single(Some(Container::DictEntry), depth + 1)?;
                let value = self.parse_single(Some(Container::DictEntry), depth + 1)?;
                match self.advance() {
                    Some('}') => Ok(Signature::DictEntry(Box::new(key), Box::new(value))),
                    Some(other) => Err(SignatureError::unexpected_char(
                        other,
                        self.pos - 1,
                        self.source,
                    )),
                    None => Err(SignatureError::unclosed(Container::DictEntry, self.source)),
                }
            }
            ')' | '}' => Err(SignatureError::unexpected_char(ch, start, self.source)),
            other => Err(SignatureError::unknown_code(other, start, self.source)),
        }
    }

    fn check_depth(&self, pos: usize, depth: usize) -> SignatureResult<()> {
        if depth >= MAX_DEPTH {
            return Err(SignatureError::TooDeep {
                limit: MAX_DEPTH,
                pos,
                signature: self.source.to_string(),
            });
        }
        Ok(())
    }
}
