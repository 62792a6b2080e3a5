//! Message bodies and the read/write catalogue that generated stubs call.
//!
//! A body is kept as a flat stream of tokens instead of wire bytes; the
//! transport owns serialization. The catalogue is expressed as provided
//! methods on [`MessageWriter`] and [`MessageReader`], so any body type only
//! has to implement the handful of primitive operations.

use crate::error::{RuntimeError, RuntimeResult};
use crate::value::Value;
use busgen_signature::{PrimitiveCode, Signature};
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Array,
    Struct,
    DictEntry,
    Variant,
}

impl ContainerKind {
    /// Leading signature character of the container
    pub fn code(self) -> char {
        match self {
            ContainerKind::Array => 'a',
            ContainerKind::Struct => '(',
            ContainerKind::DictEntry => '{',
            ContainerKind::Variant => 'v',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Basic(Value),
    Open { kind: ContainerKind, contents: String },
    Close,
}

/// Ordered body of a message with a read cursor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    tokens: Vec<Token>,
    cursor: usize,
    writing: Vec<ContainerKind>,
    reading: Vec<ContainerKind>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Move the read cursor back to the first token
    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.reading.clear();
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn scope(&self) -> String {
        match self.reading.last() {
            Some(kind) => format!("{:?}", kind).to_lowercase(),
            None => "body".to_string(),
        }
    }
}

fn mismatch_for(expected: impl Into<String>, token: Option<&Token>) -> RuntimeError {
    let found = match token {
        Some(Token::Basic(value)) => value.kind().to_string(),
        Some(Token::Open { kind, .. }) => format!("{:?}", kind).to_lowercase(),
        Some(Token::Close) | None => "end of container".to_string(),
    };
    RuntimeError::type_mismatch(expected, found)
}

/// Coerce a basic value to the exact code a signature asks for. Object paths,
/// signatures and strings are interchangeable, as are fds and `i32`.
fn coerce_basic(code: PrimitiveCode, value: &Value) -> RuntimeResult<Value> {
    let coerced = match (code, value) {
        (
            PrimitiveCode::String,
            Value::String(s) | Value::ObjectPath(s) | Value::Signature(s),
        ) => Value::String(s.clone()),
        (
            PrimitiveCode::ObjectPath,
            Value::String(s) | Value::ObjectPath(s) | Value::Signature(s),
        ) => Value::ObjectPath(s.clone()),
        (
            PrimitiveCode::Signature,
            Value::String(s) | Value::ObjectPath(s) | Value::Signature(s),
        ) => Value::Signature(s.clone()),
        (PrimitiveCode::UnixFd, Value::Fd(fd) | Value::I32(fd)) => Value::Fd(*fd),
        (PrimitiveCode::Int32, Value::Fd(v) | Value::I32(v)) => Value::I32(*v),
        (code, value) if value.code() == Some(code) => value.clone(),
        (code, value) => {
            return Err(RuntimeError::type_mismatch(
                code.as_char().to_string(),
                value.kind(),
            ))
        }
    };
    Ok(coerced)
}

fn dict_entry_contents(entry_signature: &str) -> &str {
    entry_signature
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(entry_signature)
}

/// Write side of the catalogue
pub trait MessageWriter {
    /// Append one basic value
    fn write_basic(&mut self, value: Value) -> RuntimeResult<()>;

    /// Open a container; `contents` is the element or content signature
    fn open_container(&mut self, kind: ContainerKind, contents: &str) -> RuntimeResult<()>;

    fn close_container(&mut self) -> RuntimeResult<()>;

    fn write_byte(&mut self, value: u8) -> RuntimeResult<()> {
        self.write_basic(Value::Byte(value))
    }

    fn write_bool(&mut self, value: bool) -> RuntimeResult<()> {
        self.write_basic(Value::Bool(value))
    }

    fn write_i16(&mut self, value: i16) -> RuntimeResult<()> {
        self.write_basic(Value::I16(value))
    }

    fn write_u16(&mut self, value: u16) -> RuntimeResult<()> {
        self.write_basic(Value::U16(value))
    }

    fn write_i32(&mut self, value: i32) -> RuntimeResult<()> {
        self.write_basic(Value::I32(value))
    }

    fn write_u32(&mut self, value: u32) -> RuntimeResult<()> {
        self.write_basic(Value::U32(value))
    }

    fn write_i64(&mut self, value: i64) -> RuntimeResult<()> {
        self.write_basic(Value::I64(value))
    }

    fn write_u64(&mut self, value: u64) -> RuntimeResult<()> {
        self.write_basic(Value::U64(value))
    }

    fn write_f64(&mut self, value: f64) -> RuntimeResult<()> {
        self.write_basic(Value::F64(value))
    }

    fn write_string(&mut self, value: &str) -> RuntimeResult<()> {
        self.write_basic(Value::String(value.to_string()))
    }

    fn write_object_path(&mut self, value: &str) -> RuntimeResult<()> {
        self.write_basic(Value::ObjectPath(value.to_string()))
    }

    fn write_signature(&mut self, value: &str) -> RuntimeResult<()> {
        self.write_basic(Value::Signature(value.to_string()))
    }

    fn write_fd(&mut self, value: i32) -> RuntimeResult<()> {
        self.write_basic(Value::Fd(value))
    }

    /// Generic array: `write_item` is called once per element
    fn write_array<T>(
        &mut self,
        element_signature: &str,
        values: &[T],
        mut write_item: impl FnMut(&mut Self, &T) -> RuntimeResult<()>,
    ) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.open_container(ContainerKind::Array, element_signature)?;
        for value in values {
            write_item(self, value)?;
        }
        self.close_container()
    }

    fn write_byte_array(&mut self, values: &[u8]) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_array("y", values, |message, value| message.write_byte(*value))
    }

    fn write_bool_array(&mut self, values: &[bool]) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_array("b", values, |message, value| message.write_bool(*value))
    }

    fn write_i16_array(&mut self, values: &[i16]) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_array("n", values, |message, value| message.write_i16(*value))
    }

    fn write_u16_array(&mut self, values: &[u16]) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_array("q", values, |message, value| message.write_u16(*value))
    }

    fn write_i32_array(&mut self, values: &[i32]) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_array("i", values, |message, value| message.write_i32(*value))
    }

    fn write_u32_array(&mut self, values: &[u32]) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_array("u", values, |message, value| message.write_u32(*value))
    }

    fn write_i64_array(&mut self, values: &[i64]) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_array("x", values, |message, value| message.write_i64(*value))
    }

    fn write_u64_array(&mut self, values: &[u64]) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_array("t", values, |message, value| message.write_u64(*value))
    }

    fn write_f64_array(&mut self, values: &[f64]) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_array("d", values, |message, value| message.write_f64(*value))
    }

    fn write_string_array(&mut self, values: &[String]) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_array("s", values, |message, value| message.write_string(value))
    }

    fn write_object_path_array(&mut self, values: &[String]) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_array("o", values, |message, value| {
            message.write_object_path(value)
        })
    }

    fn write_signature_array(&mut self, values: &[String]) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_array("g", values, |message, value| message.write_signature(value))
    }

    fn write_fd_array(&mut self, values: &[i32]) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_array("h", values, |message, value| message.write_fd(*value))
    }

    /// Struct of any arity; the closure writes every field in order
    fn write_struct(
        &mut self,
        signature: &str,
        write_fields: impl FnOnce(&mut Self) -> RuntimeResult<()>,
    ) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.open_container(ContainerKind::Struct, signature)?;
        write_fields(self)?;
        self.close_container()
    }

    fn write_struct_pair<A, B>(
        &mut self,
        value: &(A, B),
        write_a: impl FnOnce(&mut Self, &A) -> RuntimeResult<()>,
        write_b: impl FnOnce(&mut Self, &B) -> RuntimeResult<()>,
    ) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.open_container(ContainerKind::Struct, "")?;
        write_a(self, &value.0)?;
        write_b(self, &value.1)?;
        self.close_container()
    }

    fn write_struct_triple<A, B, C>(
        &mut self,
        value: &(A, B, C),
        write_a: impl FnOnce(&mut Self, &A) -> RuntimeResult<()>,
        write_b: impl FnOnce(&mut Self, &B) -> RuntimeResult<()>,
        write_c: impl FnOnce(&mut Self, &C) -> RuntimeResult<()>,
    ) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.open_container(ContainerKind::Struct, "")?;
        write_a(self, &value.0)?;
        write_b(self, &value.1)?;
        write_c(self, &value.2)?;
        self.close_container()
    }

    fn write_struct_array<T>(
        &mut self,
        signature: &str,
        values: &[T],
        write_item: impl Fn(&mut Self, &T) -> RuntimeResult<()>,
    ) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_array(signature, values, |message, value| {
            message.write_struct(signature, |message| write_item(message, value))
        })
    }

    fn write_struct_pair_array<A, B>(
        &mut self,
        signature: &str,
        values: &[(A, B)],
        write_a: impl Fn(&mut Self, &A) -> RuntimeResult<()>,
        write_b: impl Fn(&mut Self, &B) -> RuntimeResult<()>,
    ) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_array(signature, values, |message, value| {
            message.write_struct_pair(value, &write_a, &write_b)
        })
    }

    fn write_struct_triple_array<A, B, C>(
        &mut self,
        signature: &str,
        values: &[(A, B, C)],
        write_a: impl Fn(&mut Self, &A) -> RuntimeResult<()>,
        write_b: impl Fn(&mut Self, &B) -> RuntimeResult<()>,
        write_c: impl Fn(&mut Self, &C) -> RuntimeResult<()>,
    ) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_array(signature, values, |message, value| {
            message.write_struct_triple(value, &write_a, &write_b, &write_c)
        })
    }

    /// Dictionary with string-like keys; `entry_signature` is `{kv}`
    fn write_dict<V>(
        &mut self,
        entry_signature: &str,
        values: &IndexMap<String, V>,
        write_key: impl Fn(&mut Self, &str) -> RuntimeResult<()>,
        write_value: impl Fn(&mut Self, &V) -> RuntimeResult<()>,
    ) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        let contents = dict_entry_contents(entry_signature);
        self.open_container(ContainerKind::Array, entry_signature)?;
        for (key, value) in values {
            self.open_container(ContainerKind::DictEntry, contents)?;
            write_key(self, key)?;
            write_value(self, value)?;
            self.close_container()?;
        }
        self.close_container()
    }

    /// `a{sv}`, the vardict
    fn write_map_variant(&mut self, values: &IndexMap<String, Value>) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.write_dict(
            "{sv}",
            values,
            |message, key| message.write_string(key),
            |message, value| message.write_variant(value),
        )
    }

    /// Variant whose contents signature is derived from the value
    fn write_variant(&mut self, value: &Value) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        let signature = value.variant_signature()?;
        self.write_variant_as(&signature, value)
    }

    /// Variant with an explicit contents signature
    fn write_variant_as(&mut self, signature: &str, value: &Value) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        self.open_container(ContainerKind::Variant, signature)?;
        self.write_typed_value(signature, value)?;
        self.close_container()
    }

    /// Write a dynamic value in the shape `signature` describes
    fn write_typed_value(&mut self, signature: &str, value: &Value) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        let signature = Signature::parse(signature)?;
        self.write_value_as(&signature, value)
    }

    fn write_value_as(&mut self, signature: &Signature, value: &Value) -> RuntimeResult<()>
    where
        Self: Sized,
    {
        match (signature, value) {
            (Signature::Primitive(code), value) => self.write_basic(coerce_basic(*code, value)?),
            (Signature::Variant, value) => self.write_variant(value),
            (Signature::Array(element), Value::Dict(map)) => match element.as_ref() {
                Signature::DictEntry(key, item) => {
                    let key_code = key
                        .as_primitive()
                        .filter(|code| code.is_string_like())
                        .ok_or_else(|| RuntimeError::NonStringKey(key.to_signature()))?;
                    let entry = element.to_signature();
                    self.write_dict(
                        &entry,
                        map,
                        |message, k| {
                            message.write_basic(coerce_basic(key_code, &Value::String(k.to_string()))?)
                        },
                        |message, v| message.write_value_as(item, v),
                    )
                }
                other => Err(RuntimeError::type_mismatch(
                    format!("a{}", other.to_signature()),
                    "dict",
                )),
            },
            (Signature::Array(element), Value::Array(items)) if !element.is_dict_entry() => {
                self.write_array(&element.to_signature(), items, |message, item| {
                    message.write_value_as(element, item)
                })
            }
            (Signature::Struct(fields), Value::Struct(items)) if fields.len() == items.len() => {
                self.write_struct(&signature.to_signature(), |message| {
                    for (field, item) in fields.iter().zip(items) {
                        message.write_value_as(field, item)?;
                    }
                    Ok(())
                })
            }
            (signature, value) => Err(RuntimeError::type_mismatch(
                signature.to_signature(),
                value.kind(),
            )),
        }
    }
}

macro_rules! basic_reader {
    ($name:ident, $ty:ty, $code:ident, $variant:ident) => {
        fn $name(&mut self) -> RuntimeResult<$ty> {
            match self.read_basic(PrimitiveCode::$code)? {
                Value::$variant(inner) => Ok(inner),
                other => Err(RuntimeError::type_mismatch(stringify!($ty), other.kind())),
            }
        }
    };
}

macro_rules! basic_array_reader {
    ($name:ident, $ty:ty, $signature:literal, $element:ident) => {
        fn $name(&mut self) -> RuntimeResult<Vec<$ty>>
        where
            Self: Sized,
        {
            self.read_array($signature, |message| message.$element())
        }
    };
}

/// Read side of the catalogue
pub trait MessageReader {
    /// Signature code of the next item, `None` at the end of the current
    /// container or body
    fn peek_code(&self) -> Option<char>;

    /// Contents signature of the container at the cursor
    fn peek_contents(&self) -> Option<String>;

    fn read_basic(&mut self, code: PrimitiveCode) -> RuntimeResult<Value>;

    fn enter_container(&mut self, kind: ContainerKind, contents: &str) -> RuntimeResult<()>;

    /// Leave the current container, skipping anything left unread
    fn exit_container(&mut self) -> RuntimeResult<()>;

    basic_reader!(read_byte, u8, Byte, Byte);
    basic_reader!(read_bool, bool, Boolean, Bool);
    basic_reader!(read_i16, i16, Int16, I16);
    basic_reader!(read_u16, u16, UInt16, U16);
    basic_reader!(read_i32, i32, Int32, I32);
    basic_reader!(read_u32, u32, UInt32, U32);
    basic_reader!(read_i64, i64, Int64, I64);
    basic_reader!(read_u64, u64, UInt64, U64);
    basic_reader!(read_f64, f64, Double, F64);
    basic_reader!(read_string, String, String, String);
    basic_reader!(read_object_path, String, ObjectPath, ObjectPath);
    basic_reader!(read_signature, String, Signature, Signature);
    basic_reader!(read_fd, i32, UnixFd, Fd);

    fn read_array<T>(
        &mut self,
        element_signature: &str,
        mut read_item: impl FnMut(&mut Self) -> RuntimeResult<T>,
    ) -> RuntimeResult<Vec<T>>
    where
        Self: Sized,
    {
        self.enter_container(ContainerKind::Array, element_signature)?;
        let mut items = Vec::new();
        while self.peek_code().is_some() {
            items.push(read_item(self)?);
        }
        self.exit_container()?;
        Ok(items)
    }

    basic_array_reader!(read_byte_array, u8, "y", read_byte);
    basic_array_reader!(read_bool_array, bool, "b", read_bool);
    basic_array_reader!(read_i16_array, i16, "n", read_i16);
    basic_array_reader!(read_u16_array, u16, "q", read_u16);
    basic_array_reader!(read_i32_array, i32, "i", read_i32);
    basic_array_reader!(read_u32_array, u32, "u", read_u32);
    basic_array_reader!(read_i64_array, i64, "x", read_i64);
    basic_array_reader!(read_u64_array, u64, "t", read_u64);
    basic_array_reader!(read_f64_array, f64, "d", read_f64);
    basic_array_reader!(read_string_array, String, "s", read_string);
    basic_array_reader!(read_object_path_array, String, "o", read_object_path);
    basic_array_reader!(read_signature_array, String, "g", read_signature);
    basic_array_reader!(read_fd_array, i32, "h", read_fd);

    fn read_struct<T>(
        &mut self,
        signature: &str,
        read_fields: impl FnOnce(&mut Self) -> RuntimeResult<T>,
    ) -> RuntimeResult<T>
    where
        Self: Sized,
    {
        self.enter_container(ContainerKind::Struct, signature)?;
        let value = read_fields(self)?;
        self.exit_container()?;
        Ok(value)
    }

    fn read_struct_pair<A, B>(
        &mut self,
        read_a: impl FnOnce(&mut Self) -> RuntimeResult<A>,
        read_b: impl FnOnce(&mut Self) -> RuntimeResult<B>,
    ) -> RuntimeResult<(A, B)>
    where
        Self: Sized,
    {
        self.read_struct("", |message| Ok((read_a(message)?, read_b(message)?)))
    }

    fn read_struct_triple<A, B, C>(
        &mut self,
        read_a: impl FnOnce(&mut Self) -> RuntimeResult<A>,
        read_b: impl FnOnce(&mut Self) -> RuntimeResult<B>,
        read_c: impl FnOnce(&mut Self) -> RuntimeResult<C>,
    ) -> RuntimeResult<(A, B, C)>
    where
        Self: Sized,
    {
        self.read_struct("", |message| {
            Ok((read_a(message)?, read_b(message)?, read_c(message)?))
        })
    }

    fn read_struct_array<T>(
        &mut self,
        signature: &str,
        read_item: impl Fn(&mut Self) -> RuntimeResult<T>,
    ) -> RuntimeResult<Vec<T>>
    where
        Self: Sized,
    {
        self.read_array(signature, |message| message.read_struct(signature, &read_item))
    }

    fn read_struct_pair_array<A, B>(
        &mut self,
        signature: &str,
        read_a: impl Fn(&mut Self) -> RuntimeResult<A>,
        read_b: impl Fn(&mut Self) -> RuntimeResult<B>,
    ) -> RuntimeResult<Vec<(A, B)>>
    where
        Self: Sized,
    {
        self.read_array(signature, |message| message.read_struct_pair(&read_a, &read_b))
    }

    fn read_struct_triple_array<A, B, C>(
        &mut self,
        signature: &str,
        read_a: impl Fn(&mut Self) -> RuntimeResult<A>,
        read_b: impl Fn(&mut Self) -> RuntimeResult<B>,
        read_c: impl Fn(&mut Self) -> RuntimeResult<C>,
    ) -> RuntimeResult<Vec<(A, B, C)>>
    where
        Self: Sized,
    {
        self.read_array(signature, |message| {
            message.read_struct_triple(&read_a, &read_b, &read_c)
        })
    }

    fn read_dict<V>(
        &mut self,
        entry_signature: &str,
        read_key: impl Fn(&mut Self) -> RuntimeResult<String>,
        read_value: impl Fn(&mut Self) -> RuntimeResult<V>,
    ) -> RuntimeResult<IndexMap<String, V>>
    where
        Self: Sized,
    {
        let contents = dict_entry_contents(entry_signature);
        self.enter_container(ContainerKind::Array, entry_signature)?;
        let mut map = IndexMap::new();
        while self.peek_code().is_some() {
            self.enter_container(ContainerKind::DictEntry, contents)?;
            let key = read_key(self)?;
            let value = read_value(self)?;
            self.exit_container()?;
            map.insert(key, value);
        }
        self.exit_container()?;
        Ok(map)
    }

    fn read_string_variant_dict(&mut self) -> RuntimeResult<IndexMap<String, Value>>
    where
        Self: Sized,
    {
        self.read_dict(
            "{sv}",
            |message| message.read_string(),
            |message| message.read_variant(),
        )
    }

    fn read_variant(&mut self) -> RuntimeResult<Value>
    where
        Self: Sized,
    {
        self.enter_container(ContainerKind::Variant, "")?;
        let value = self.read_dynamic_value()?;
        self.exit_container()?;
        Ok(value)
    }

    /// Read whatever comes next as a [`Value`]
    fn read_dynamic_value(&mut self) -> RuntimeResult<Value>
    where
        Self: Sized,
    {
        let code = self
            .peek_code()
            .ok_or_else(|| RuntimeError::UnexpectedEnd("container".to_string()))?;
        match code {
            'a' => {
                let contents = self.peek_contents().unwrap_or_default();
                if contents.starts_with('{') {
                    let map = self.read_dict(
                        &contents,
                        |message| match message.read_dynamic_value()? {
                            Value::String(key) | Value::ObjectPath(key) | Value::Signature(key) => {
                                Ok(key)
                            }
                            other => Err(RuntimeError::NonStringKey(other.kind().to_string())),
                        },
                        |message| message.read_dynamic_value(),
                    )?;
                    Ok(Value::Dict(map))
                } else {
                    let items = self.read_array(&contents, |message| message.read_dynamic_value())?;
                    Ok(Value::Array(items))
                }
            }
            '(' => {
                let fields = self.read_struct("", |message| {
                    let mut fields = Vec::new();
                    while message.peek_code().is_some() {
                        fields.push(message.read_dynamic_value()?);
                    }
                    Ok(fields)
                })?;
                Ok(Value::Struct(fields))
            }
            'v' => self.read_variant(),
            '{' => Err(RuntimeError::type_mismatch("value", "dict entry")),
            other => {
                let code = PrimitiveCode::from_char(other)
                    .ok_or_else(|| RuntimeError::type_mismatch("value", other.to_string()))?;
                self.read_basic(code)
            }
        }
    }
}

impl MessageWriter for Body {
    fn write_basic(&mut self, value: Value) -> RuntimeResult<()> {
        if value.code().is_none() {
            return Err(RuntimeError::type_mismatch("basic value", value.kind()));
        }
        self.tokens.push(Token::Basic(value));
        Ok(())
    }

    fn open_container(&mut self, kind: ContainerKind, contents: &str) -> RuntimeResult<()> {
        self.writing.push(kind);
        self.tokens.push(Token::Open {
            kind,
            contents: contents.to_string(),
        });
        Ok(())
    }

    fn close_container(&mut self) -> RuntimeResult<()> {
        self.writing
            .pop()
            .ok_or_else(|| RuntimeError::ContainerMismatch("no open container".to_string()))?;
        self.tokens.push(Token::Close);
        Ok(())
    }
}

impl MessageReader for Body {
    fn peek_code(&self) -> Option<char> {
        match self.current()? {
            Token::Basic(value) => value.code().map(PrimitiveCode::as_char),
            Token::Open { kind, .. } => Some(kind.code()),
            Token::Close => None,
        }
    }

    fn peek_contents(&self) -> Option<String> {
        match self.current()? {
            Token::Open { contents, .. } => Some(contents.clone()),
            _ => None,
        }
    }

    fn read_basic(&mut self, code: PrimitiveCode) -> RuntimeResult<Value> {
        match self.current() {
            Some(Token::Basic(value)) if value.code() == Some(code) => {
                let value = value.clone();
                self.cursor += 1;
                Ok(value)
            }
            Some(Token::Close) | None => Err(RuntimeError::UnexpectedEnd(self.scope())),
            other => Err(mismatch_for(code.as_char().to_string(), other)),
        }
    }

    fn enter_container(&mut self, kind: ContainerKind, contents: &str) -> RuntimeResult<()> {
        match self.current() {
            Some(Token::Open {
                kind: found,
                contents: found_contents,
            }) if *found == kind => {
                if !contents.is_empty() && !found_contents.is_empty() && found_contents != contents
                {
                    return Err(RuntimeError::type_mismatch(
                        format!("{}{}", kind.code(), contents),
                        format!("{}{}", kind.code(), found_contents),
                    ));
                }
                self.cursor += 1;
                self.reading.push(kind);
                Ok(())
            }
            Some(Token::Close) | None => Err(RuntimeError::UnexpectedEnd(self.scope())),
            other => Err(mismatch_for(kind.code().to_string(), other)),
        }
    }

    fn exit_container(&mut self) -> RuntimeResult<()> {
        if self.reading.pop().is_none() {
            return Err(RuntimeError::ContainerMismatch(
                "not inside a container".to_string(),
            ));
        }
        let mut depth = 0usize;
        loop {
            match self.tokens.get(self.cursor) {
                Some(Token::Open { .. }) => depth += 1,
                Some(Token::Close) if depth == 0 => {
                    self.cursor += 1;
                    return Ok(());
                }
                Some(Token::Close) => depth -= 1,
                Some(Token::Basic(_)) => {}
                None => return Err(RuntimeError::UnexpectedEnd("body".to_string())),
            }
            self.cursor += 1;
        }
    }
}

/// Implements both catalogue traits by delegating to a [`Body`] field
macro_rules! delegate_body {
    ($ty:ty) => {
        impl MessageWriter for $ty {
            fn write_basic(&mut self, value: Value) -> RuntimeResult<()> {
                self.body.write_basic(value)
            }

            fn open_container(&mut self, kind: ContainerKind, contents: &str) -> RuntimeResult<()> {
                self.body.open_container(kind, contents)
            }

            fn close_container(&mut self) -> RuntimeResult<()> {
                self.body.close_container()
            }
        }

        impl MessageReader for $ty {
            fn peek_code(&self) -> Option<char> {
                self.body.peek_code()
            }

            fn peek_contents(&self) -> Option<String> {
                self.body.peek_contents()
            }

            fn read_basic(&mut self, code: PrimitiveCode) -> RuntimeResult<Value> {
                self.body.read_basic(code)
            }

            fn enter_container(&mut self, kind: ContainerKind, contents: &str) -> RuntimeResult<()> {
                self.body.enter_container(kind, contents)
            }

            fn exit_container(&mut self) -> RuntimeResult<()> {
                self.body.exit_container()
            }
        }
    };
}

/// Outgoing method call
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub destination: String,
    pub path: String,
    pub interface: String,
    pub member: String,
    pub body: Body,
}

impl MethodCall {
    pub fn new(
        destination: impl Into<String>,
        path: impl Into<String>,
        interface: impl Into<String>,
        member: impl Into<String>,
    ) -> Self {
        Self {
            destination: destination.into(),
            path: path.into(),
            interface: interface.into(),
            member: member.into(),
            body: Body::new(),
        }
    }

    /// Send the call over `bus` and wait for its reply
    pub async fn await_reply(self, bus: &crate::connection::Connection) -> RuntimeResult<Reply> {
        bus.call(self).await
    }
}

/// Method return body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub body: Body,
}

impl Reply {
    pub fn new(body: Body) -> Self {
        Self { body }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Incoming signal
#[derive(Debug, Clone, PartialEq)]
pub struct SignalMessage {
    pub sender: String,
    pub path: String,
    pub interface: String,
    pub member: String,
    pub body: Body,
}

impl SignalMessage {
    pub fn new(
        sender: impl Into<String>,
        path: impl Into<String>,
        interface: impl Into<String>,
        member: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            path: path.into(),
            interface: interface.into(),
            member: member.into(),
            body: Body::new(),
        }
    }
}

delegate_body!(MethodCall);
delegate_body!(Reply);
delegate_body!(SignalMessage);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vardict() -> IndexMap<String, Value> {
        let mut map = IndexMap::new();
        map.insert("handle_token".to_string(), Value::from("t1"));
        map.insert("modal".to_string(), Value::Bool(true));
        map.insert("ids".to_string(), Value::from(vec![1u32, 2]));
        map
    }

    #[test]
    fn test_basic_values_come_back_in_order() {
        let mut body = Body::new();
        body.write_fd(3).unwrap();
        body.write_object_path("/org/x").unwrap();
        body.write_f64(1.5).unwrap();

        assert_eq!(body.read_fd().unwrap(), 3);
        assert_eq!(body.read_object_path().unwrap(), "/org/x");
        assert_eq!(body.read_f64().unwrap(), 1.5);
        assert!(matches!(
            body.read_u32(),
            Err(RuntimeError::UnexpectedEnd(_))
        ));
    }

    #[test]
    fn test_kind_mismatch_is_reported() {
        let mut body = Body::new();
        body.write_string("x").unwrap();
        assert!(matches!(
            body.read_object_path(),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_map_variant() {
        let mut body = Body::new();
        body.write_map_variant(&vardict()).unwrap();
        assert_eq!(body.read_string_variant_dict().unwrap(), vardict());
    }

    #[test]
    fn test_pair_array() {
        let devices = vec![
            ("dev1".to_string(), vardict()),
            ("dev2".to_string(), IndexMap::new()),
        ];
        let mut body = Body::new();
        body.write_struct_pair_array(
            "(sa{sv})",
            &devices,
            |message, value| message.write_string(value),
            |message, value| message.write_map_variant(value),
        )
        .unwrap();

        let read = body
            .read_struct_pair_array(
                "(sa{sv})",
                |message| message.read_string(),
                |message| message.read_string_variant_dict(),
            )
            .unwrap();
        assert_eq!(read, devices);
    }

    #[test]
    fn test_generic_struct_array() {
        let rows = vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]];
        let mut body = Body::new();
        body.write_struct_array("(iiii)", &rows, |message, item| {
            for field in item {
                message.write_i32(*field)?;
            }
            Ok(())
        })
        .unwrap();

        let read = body
            .read_struct_array("(iiii)", |message| {
                Ok(vec![
                    message.read_i32()?,
                    message.read_i32()?,
                    message.read_i32()?,
                    message.read_i32()?,
                ])
            })
            .unwrap();
        assert_eq!(read, rows);
    }

    #[test]
    fn test_typed_dict_with_object_path_keys() {
        let mut inner = IndexMap::new();
        inner.insert("org.x.Iface".to_string(), Value::Dict(vardict()));
        let mut body = Body::new();
        body.write_typed_value("a{oa{sa{sv}}}", &Value::Dict({
            let mut objects = IndexMap::new();
            objects.insert("/org/x/1".to_string(), Value::Dict(inner.clone()));
            objects
        }))
        .unwrap();

        let read = body
            .read_dict(
                "{oa{sa{sv}}}",
                |message| message.read_object_path(),
                |message| message.read_dynamic_value(),
            )
            .unwrap();
        assert_eq!(read.get("/org/x/1"), Some(&Value::Dict(inner)));
    }

    #[test]
    fn test_typed_value_rejects_wrong_shape() {
        let mut body = Body::new();
        assert!(matches!(
            body.write_typed_value("as", &Value::U32(1)),
            Err(RuntimeError::TypeMismatch { .. })
        ));
        assert!(matches!(
            body.write_typed_value("a{us}", &Value::Dict(IndexMap::new())),
            Err(RuntimeError::NonStringKey(_))
        ));
    }

    #[test]
    fn test_variant_of_nested_list() {
        let value = Value::Array(vec![Value::from(vec![1u8, 2]), Value::from("x")]);
        let mut body = Body::new();
        body.write_variant(&value).unwrap();
        assert_eq!(body.read_variant().unwrap(), value);
    }

    #[test]
    fn test_struct_variant_write_fails() {
        let mut body = Body::new();
        assert_eq!(
            body.write_variant(&Value::Struct(vec![Value::U32(1)])),
            Err(RuntimeError::UnsupportedVariant("struct".to_string()))
        );
    }

    #[test]
    fn test_exit_skips_unread_items() {
        let mut body = Body::new();
        body.write_struct("(uu)", |message| {
            message.write_u32(1)?;
            message.write_u32(2)
        })
        .unwrap();
        body.write_bool(true).unwrap();

        let first = body.read_struct("(uu)", |message| message.read_u32()).unwrap();
        assert_eq!(first, 1);
        assert!(body.read_bool().unwrap());
    }

    #[test]
    fn test_unbalanced_close() {
        let mut body = Body::new();
        assert!(matches!(
            body.close_container(),
            Err(RuntimeError::ContainerMismatch(_))
        ));
    }
}
