use crate::error::{RuntimeError, RuntimeResult};
use busgen_signature::PrimitiveCode;
use indexmap::IndexMap;

/// Dynamically typed D-Bus value, used for variants and for struct fields
/// that don't share one host type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Byte(u8),
    Bool(bool),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F64(f64),
    String(String),
    ObjectPath(String),
    Signature(String),
    Fd(i32),
    Array(Vec<Value>),
    Dict(IndexMap<String, Value>),
    Struct(Vec<Value>),
}

impl Value {
    /// Type code for basic values, `None` for containers
    pub fn code(&self) -> Option<PrimitiveCode> {
        let code = match self {
            Value::Byte(_) => PrimitiveCode::Byte,
            Value::Bool(_) => PrimitiveCode::Boolean,
            Value::I16(_) => PrimitiveCode::Int16,
            Value::U16(_) => PrimitiveCode::UInt16,
            Value::I32(_) => PrimitiveCode::Int32,
            Value::U32(_) => PrimitiveCode::UInt32,
            Value::I64(_) => PrimitiveCode::Int64,
            Value::U64(_) => PrimitiveCode::UInt64,
            Value::F64(_) => PrimitiveCode::Double,
            Value::String(_) => PrimitiveCode::String,
            Value::ObjectPath(_) => PrimitiveCode::ObjectPath,
            Value::Signature(_) => PrimitiveCode::Signature,
            Value::Fd(_) => PrimitiveCode::UnixFd,
            Value::Array(_) | Value::Dict(_) | Value::Struct(_) => return None,
        };
        Some(code)
    }

    /// Short name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Byte(_) => "byte",
            Value::Bool(_) => "bool",
            Value::I16(_) => "i16",
            Value::U16(_) => "u16",
            Value::I32(_) => "i32",
            Value::U32(_) => "u32",
            Value::I64(_) => "i64",
            Value::U64(_) => "u64",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::ObjectPath(_) => "object path",
            Value::Signature(_) => "signature",
            Value::Fd(_) => "fd",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
            Value::Struct(_) => "struct",
        }
    }

    /// Signature a variant holding this value is written with.
    ///
    /// Lists whose elements are all basic values of one type become `a<code>`,
    /// every other list (including the empty one) becomes `av`. Maps are
    /// always `a{sv}`. Structs have no variant form.
    pub fn variant_signature(&self) -> RuntimeResult<String> {
        if let Some(code) = self.code() {
            return Ok(code.as_char().to_string());
        }
        match self {
            Value::Array(items) => {
                let first = items.first().and_then(Value::code);
                let uniform = first.filter(|code| items.iter().all(|item| item.code() == Some(*code)));
                Ok(match uniform {
                    Some(code) => format!("a{}", code.as_char()),
                    None => "av".to_string(),
                })
            }
            Value::Dict(_) => Ok("a{sv}".to_string()),
            other => Err(RuntimeError::UnsupportedVariant(other.kind().to_string())),
        }
    }

    /// Struct from the fields of a struct held as a list
    pub fn from_fields<T: Into<Value>>(fields: Vec<T>) -> Self {
        Value::Struct(fields.into_iter().map(Into::into).collect())
    }

    /// Array of structs from structs held as lists
    pub fn from_field_lists<T: Into<Value>>(structs: Vec<Vec<T>>) -> Self {
        Value::Array(structs.into_iter().map(Value::from_fields).collect())
    }

    /// Convert into a concrete host type
    pub fn cast<T: FromValue>(&self) -> RuntimeResult<T> {
        T::from_value(self)
    }

    fn mismatch(&self, expected: &str) -> RuntimeError {
        RuntimeError::type_mismatch(expected, self.kind())
    }
}

/// Conversion from a dynamic [`Value`] into a host type
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> RuntimeResult<Self>;
}

macro_rules! scalar_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: &Value) -> RuntimeResult<Self> {
                    match value {
                        Value::$variant(inner) => Ok(*inner),
                        other => Err(other.mismatch(stringify!($ty))),
                    }
                }
            }
        )*
    };
}

scalar_conversions! {
    u8 => Byte,
    bool => Bool,
    i16 => I16,
    u16 => U16,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f64 => F64,
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I32(value)
    }
}

/// File descriptors surface as `i32` in stubs
impl FromValue for i32 {
    fn from_value(value: &Value) -> RuntimeResult<Self> {
        match value {
            Value::I32(inner) | Value::Fd(inner) => Ok(*inner),
            other => Err(other.mismatch("i32")),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

/// Object paths and signatures surface as plain strings
impl FromValue for String {
    fn from_value(value: &Value) -> RuntimeResult<Self> {
        match value {
            Value::String(inner) | Value::ObjectPath(inner) | Value::Signature(inner) => {
                Ok(inner.clone())
            }
            other => Err(other.mismatch("string")),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> RuntimeResult<Self> {
        Ok(value.clone())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> RuntimeResult<Self> {
        match value {
            Value::Array(items) | Value::Struct(items) => items.iter().map(T::from_value).collect(),
            other => Err(other.mismatch("array")),
        }
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Dict(map)
    }
}

impl FromValue for IndexMap<String, Value> {
    fn from_value(value: &Value) -> RuntimeResult<Self> {
        match value {
            Value::Dict(map) => Ok(map.clone()),
            other => Err(other.mismatch("dict")),
        }
    }
}

impl<A: Into<Value>, B: Into<Value>> From<(A, B)> for Value {
    fn from((a, b): (A, B)) -> Self {
        Value::Struct(vec![a.into(), b.into()])
    }
}

impl<A: FromValue, B: FromValue> FromValue for (A, B) {
    fn from_value(value: &Value) -> RuntimeResult<Self> {
        match value {
            Value::Struct(fields) if fields.len() == 2 => {
                Ok((A::from_value(&fields[0])?, B::from_value(&fields[1])?))
            }
            other => Err(other.mismatch("pair")),
        }
    }
}

impl<A: Into<Value>, B: Into<Value>, C: Into<Value>> From<(A, B, C)> for Value {
    fn from((a, b, c): (A, B, C)) -> Self {
        Value::Struct(vec![a.into(), b.into(), c.into()])
    }
}

impl<A: FromValue, B: FromValue, C: FromValue> FromValue for (A, B, C) {
    fn from_value(value: &Value) -> RuntimeResult<Self> {
        match value {
            Value::Struct(fields) if fields.len() == 3 => Ok((
                A::from_value(&fields[0])?,
                B::from_value(&fields[1])?,
                C::from_value(&fields[2])?,
            )),
            other => Err(other.mismatch("triple")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_variant_signatures() {
        assert_eq!(Value::U32(7).variant_signature().unwrap(), "u");
        assert_eq!(Value::Fd(3).variant_signature().unwrap(), "h");
        assert_eq!(
            Value::ObjectPath("/a".into()).variant_signature().unwrap(),
            "o"
        );
    }

    #[test]
    fn test_uniform_list_uses_element_code() {
        let list = Value::from(vec!["a", "b"]);
        assert_eq!(list.variant_signature().unwrap(), "as");
    }

    #[test]
    fn test_mixed_and_empty_lists_fall_back_to_variants() {
        let mixed = Value::Array(vec![Value::I32(1), Value::String("x".into())]);
        assert_eq!(mixed.variant_signature().unwrap(), "av");
        assert_eq!(Value::Array(vec![]).variant_signature().unwrap(), "av");
        let nested = Value::Array(vec![Value::Array(vec![])]);
        assert_eq!(nested.variant_signature().unwrap(), "av");
    }

    #[test]
    fn test_struct_has_no_variant_form() {
        let value = Value::from((1i32, "x"));
        assert_eq!(
            value.variant_signature(),
            Err(RuntimeError::UnsupportedVariant("struct".to_string()))
        );
    }

    #[test]
    fn test_casts() {
        assert_eq!(Value::Fd(4).cast::<i32>().unwrap(), 4);
        assert_eq!(
            Value::ObjectPath("/x".into()).cast::<String>().unwrap(),
            "/x"
        );
        let pair = Value::from(("k".to_string(), 2u32));
        assert_eq!(
            pair.cast::<(String, u32)>().unwrap(),
            ("k".to_string(), 2)
        );
        assert!(Value::Bool(true).cast::<u8>().is_err());
    }

    #[test]
    fn test_vec_cast_accepts_struct_fields() {
        // Lists are the host form of both arrays and structs of other arities
        let value = Value::Struct(vec![Value::I32(1), Value::I32(2)]);
        assert_eq!(value.cast::<Vec<i32>>().unwrap(), vec![1, 2]);
        assert!(Value::Dict(IndexMap::new()).cast::<Vec<i32>>().is_err());
    }

    #[test]
    fn test_fields_keep_struct_shape() {
        let fields = Value::from_fields(vec![1u32, 2, 3, 4]);
        assert_eq!(
            fields,
            Value::Struct(vec![Value::U32(1), Value::U32(2), Value::U32(3), Value::U32(4)])
        );
        assert_ne!(fields, Value::from(vec![1u32, 2, 3, 4]));

        let lists = Value::from_field_lists(vec![vec![Value::from("a"), Value::Bool(true)]]);
        assert_eq!(
            lists,
            Value::Array(vec![Value::Struct(vec![
                Value::String("a".to_string()),
                Value::Bool(true)
            ])])
        );
        assert_eq!(
            lists.cast::<Vec<Vec<Value>>>().unwrap(),
            vec![vec![Value::String("a".to_string()), Value::Bool(true)]]
        );
    }
}
