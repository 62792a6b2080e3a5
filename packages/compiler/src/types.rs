use crate::error::{CompileError, CompileResult};
use busgen_signature::{PrimitiveCode, Signature};

/// Rust type a signature surfaces as in a stub
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostType {
    U8,
    Bool,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F64,
    String,
    /// Dynamic value (`v`, mixed struct fields)
    Any,
    /// `ay`
    Bytes,
    List(Box<HostType>),
    /// Any `a{..}`; keys are strings and values stay dynamic
    StringMap,
    Pair(Box<HostType>, Box<HostType>),
    Triple(Box<HostType>, Box<HostType>, Box<HostType>),
}

impl HostType {
    pub fn list(element: HostType) -> Self {
        HostType::List(Box::new(element))
    }

    pub fn render(&self) -> String {
        match self {
            HostType::U8 => "u8".to_string(),
            HostType::Bool => "bool".to_string(),
            HostType::I16 => "i16".to_string(),
            HostType::U16 => "u16".to_string(),
            HostType::I32 => "i32".to_string(),
            HostType::U32 => "u32".to_string(),
            HostType::I64 => "i64".to_string(),
            HostType::U64 => "u64".to_string(),
            HostType::F64 => "f64".to_string(),
            HostType::String => "String".to_string(),
            HostType::Any => "Value".to_string(),
            HostType::Bytes => "Vec<u8>".to_string(),
            HostType::List(element) => format!("Vec<{}>", element.render()),
            HostType::StringMap => "IndexMap<String, Value>".to_string(),
            HostType::Pair(a, b) => format!("({}, {})", a.render(), b.render()),
            HostType::Triple(a, b, c) => {
                format!("({}, {}, {})", a.render(), b.render(), c.render())
            }
        }
    }

    /// Runtime items the rendered type names
    pub fn imports(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        self.collect_imports(&mut out);
        out
    }

    fn collect_imports(&self, out: &mut Vec<&'static str>) {
        match self {
            HostType::Any => out.push("Value"),
            HostType::StringMap => out.extend(["IndexMap", "Value"]),
            HostType::List(element) => element.collect_imports(out),
            HostType::Pair(a, b) => {
                a.collect_imports(out);
                b.collect_imports(out);
            }
            HostType::Triple(a, b, c) => {
                a.collect_imports(out);
                b.collect_imports(out);
                c.collect_imports(out);
            }
            _ => {}
        }
    }
}

/// How a struct's fields are represented on the host side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructLayout {
    Pair(HostType, HostType),
    Triple(HostType, HostType, HostType),
    /// Every other arity with one shared field type: `Vec<T>`
    Uniform(HostType),
    /// Every other arity with differing field types: `Vec<Value>`; keeps the
    /// per-field types for casting
    Mixed(Vec<HostType>),
}

impl StructLayout {
    pub fn host_type(&self) -> HostType {
        match self {
            StructLayout::Pair(a, b) => HostType::Pair(Box::new(a.clone()), Box::new(b.clone())),
            StructLayout::Triple(a, b, c) => HostType::Triple(
                Box::new(a.clone()),
                Box::new(b.clone()),
                Box::new(c.clone()),
            ),
            StructLayout::Uniform(element) => HostType::list(element.clone()),
            StructLayout::Mixed(_) => HostType::list(HostType::Any),
        }
    }
}

pub fn struct_layout(fields: &[Signature]) -> CompileResult<StructLayout> {
    let types = fields.iter().map(map_type).collect::<CompileResult<Vec<_>>>()?;
    let layout = match types.as_slice() {
        [a, b] => StructLayout::Pair(a.clone(), b.clone()),
        [a, b, c] => StructLayout::Triple(a.clone(), b.clone(), c.clone()),
        [first, rest @ ..] if rest.iter().all(|t| t == first) => StructLayout::Uniform(first.clone()),
        _ => StructLayout::Mixed(types),
    };
    Ok(layout)
}

pub fn primitive_type(code: PrimitiveCode) -> HostType {
    match code {
        PrimitiveCode::Byte => HostType::U8,
        PrimitiveCode::Boolean => HostType::Bool,
        PrimitiveCode::Int16 => HostType::I16,
        PrimitiveCode::UInt16 => HostType::U16,
        PrimitiveCode::Int32 => HostType::I32,
        PrimitiveCode::UInt32 => HostType::U32,
        PrimitiveCode::Int64 => HostType::I64,
        PrimitiveCode::UInt64 => HostType::U64,
        PrimitiveCode::Double => HostType::F64,
        PrimitiveCode::String | PrimitiveCode::ObjectPath | PrimitiveCode::Signature => {
            HostType::String
        }
        PrimitiveCode::UnixFd => HostType::I32,
    }
}

/// Check a dict entry's key and value, returning the key code
pub(crate) fn dict_entry_key(
    whole: &Signature,
    key: &Signature,
    value: &Signature,
) -> CompileResult<PrimitiveCode> {
    map_type(value)?;
    match key.as_primitive() {
        Some(code) if code.is_string_like() => Ok(code),
        _ => Err(CompileError::unsupported(
            whole,
            format!("dictionary key {} is not a string", key),
        )),
    }
}

/// Map a signature to the host type stubs expose for it
pub fn map_type(signature: &Signature) -> CompileResult<HostType> {
    match signature {
        Signature::Primitive(code) => Ok(primitive_type(*code)),
        Signature::Variant => Ok(HostType::Any),
        Signature::DictEntry(..) => Err(CompileError::dict_entry_outside_array(signature)),
        Signature::Struct(fields) => Ok(struct_layout(fields)?.host_type()),
        Signature::Array(element) => match element.as_ref() {
            Signature::Primitive(PrimitiveCode::Byte) => Ok(HostType::Bytes),
            Signature::Primitive(code) => Ok(HostType::list(primitive_type(*code))),
            Signature::DictEntry(key, value) => {
                dict_entry_key(signature, key, value)?;
                Ok(HostType::StringMap)
            }
            Signature::Struct(fields) => Ok(HostType::list(struct_layout(fields)?.host_type())),
            Signature::Array(inner) => {
                let inner_type = map_type(element)?;
                if inner.is_dict_entry() {
                    Ok(HostType::list(inner_type))
                } else {
                    Ok(HostType::list(HostType::Any))
                }
            }
            Signature::Variant => Ok(HostType::list(HostType::Any)),
        },
    }
}
