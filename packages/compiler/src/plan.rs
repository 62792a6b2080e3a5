//! Marshal plans: the sequence of catalogue calls that writes or reads one
//! value of a given signature. Plans are plain data and render to Rust
//! expression text against a receiver (`method_call`, `reply`, `signal`, or
//! the `message` parameter of a nested closure).

use crate::error::{CompileError, CompileResult};
use crate::types::{dict_entry_key, map_type, struct_layout, HostType, StructLayout};
use busgen_signature::{PrimitiveCode, Signature};

/// Receiver name inside nested closures
const CLOSURE_RECEIVER: &str = "message";

fn kind_name(code: PrimitiveCode) -> &'static str {
    match code {
        PrimitiveCode::Byte => "byte",
        PrimitiveCode::Boolean => "bool",
        PrimitiveCode::Int16 => "i16",
        PrimitiveCode::UInt16 => "u16",
        PrimitiveCode::Int32 => "i32",
        PrimitiveCode::UInt32 => "u32",
        PrimitiveCode::Int64 => "i64",
        PrimitiveCode::UInt64 => "u64",
        PrimitiveCode::Double => "f64",
        PrimitiveCode::String => "string",
        PrimitiveCode::ObjectPath => "object_path",
        PrimitiveCode::Signature => "signature",
        PrimitiveCode::UnixFd => "fd",
    }
}

/// Value operand of a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    pub expr: String,
    /// `true` for places holding the value itself (`options`, `item[0]`),
    /// `false` for references (closure parameters)
    pub owned: bool,
    /// Convert out of a dynamic `Value` first
    pub cast: Option<HostType>,
}

impl Access {
    pub fn owned(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            owned: true,
            cast: None,
        }
    }

    pub fn borrowed(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            owned: false,
            cast: None,
        }
    }

    fn field(&self, index: usize, cast: Option<HostType>) -> Self {
        Self {
            expr: format!("{}[{}]", self.base(), index),
            owned: true,
            cast,
        }
    }

    fn base(&self) -> String {
        match &self.cast {
            Some(ty) => format!("{}.cast::<{}>()?", self.expr, ty.render()),
            None => self.expr.clone(),
        }
    }

    fn by_value(&self) -> String {
        if self.owned || self.cast.is_some() {
            self.base()
        } else {
            format!("*{}", self.expr)
        }
    }

    fn by_ref(&self) -> String {
        if self.owned || self.cast.is_some() {
            format!("&{}", self.base())
        } else {
            self.expr.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteHelper {
    Basic(PrimitiveCode),
    BasicArray(PrimitiveCode),
    Variant,
    MapVariant,
    TypedValue,
    Dict,
    Array,
    Struct,
    StructPair,
    StructTriple,
    StructArray,
    StructPairArray,
    StructTripleArray,
}

impl WriteHelper {
    pub fn method_name(&self) -> String {
        match self {
            WriteHelper::Basic(code) => format!("write_{}", kind_name(*code)),
            WriteHelper::BasicArray(code) => format!("write_{}_array", kind_name(*code)),
            WriteHelper::Variant => "write_variant".to_string(),
            WriteHelper::MapVariant => "write_map_variant".to_string(),
            WriteHelper::TypedValue => "write_typed_value".to_string(),
            WriteHelper::Dict => "write_dict".to_string(),
            WriteHelper::Array => "write_array".to_string(),
            WriteHelper::Struct => "write_struct".to_string(),
            WriteHelper::StructPair => "write_struct_pair".to_string(),
            WriteHelper::StructTriple => "write_struct_triple".to_string(),
            WriteHelper::StructArray => "write_struct_array".to_string(),
            WriteHelper::StructPairArray => "write_struct_pair_array".to_string(),
            WriteHelper::StructTripleArray => "write_struct_triple_array".to_string(),
        }
    }

    /// Scalars other than strings are passed by value
    fn takes_value(&self) -> bool {
        matches!(self, WriteHelper::Basic(code) if !code.is_string_like())
    }
}

/// One write against the catalogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCall {
    pub helper: WriteHelper,
    /// Signature literal passed first, for helpers that take one
    pub signature: Option<String>,
    pub value: Option<Access>,
    pub closures: Vec<WriteClosure>,
}

/// `|message, <param>| ...` writing the elements or fields of a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteClosure {
    pub param: Option<String>,
    pub body: Vec<WriteCall>,
}

impl WriteCall {
    fn new(helper: WriteHelper, value: Access) -> Self {
        Self {
            helper,
            signature: None,
            value: Some(value),
            closures: Vec::new(),
        }
    }

    fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    fn with_closure(mut self, param: Option<&str>, body: Vec<WriteCall>) -> Self {
        self.closures.push(WriteClosure {
            param: param.map(str::to_string),
            body,
        });
        self
    }

    /// Render as an expression of type `RuntimeResult<()>`
    pub fn render(&self, receiver: &str) -> String {
        let mut args = Vec::new();
        if let Some(signature) = &self.signature {
            args.push(format!("{:?}", signature));
        }
        if let Some(value) = &self.value {
            args.push(if self.helper.takes_value() {
                value.by_value()
            } else {
                value.by_ref()
            });
        }
        args.extend(self.closures.iter().map(WriteClosure::render));
        format!("{}.{}({})", receiver, self.helper.method_name(), args.join(", "))
    }
}

impl WriteClosure {
    pub fn render(&self) -> String {
        let params = match &self.param {
            Some(param) => format!("|{}, {}|", CLOSURE_RECEIVER, param),
            None => format!("|{}|", CLOSURE_RECEIVER),
        };
        match self.body.as_slice() {
            [single] => format!("{} {}", params, single.render(CLOSURE_RECEIVER)),
            calls => {
                let statements: Vec<String> = calls
                    .iter()
                    .map(|call| format!("{}?;", call.render(CLOSURE_RECEIVER)))
                    .collect();
                format!("{} {{ {} Ok(()) }}", params, statements.join(" "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadHelper {
    Basic(PrimitiveCode),
    BasicArray(PrimitiveCode),
    Variant,
    StringVariantDict,
    DynamicValue,
    Dict,
    Array,
    Struct,
    StructPair,
    StructTriple,
    StructArray,
    StructPairArray,
    StructTripleArray,
}

impl ReadHelper {
    pub fn method_name(&self) -> String {
        match self {
            ReadHelper::Basic(code) => format!("read_{}", kind_name(*code)),
            ReadHelper::BasicArray(code) => format!("read_{}_array", kind_name(*code)),
            ReadHelper::Variant => "read_variant".to_string(),
            ReadHelper::StringVariantDict => "read_string_variant_dict".to_string(),
            ReadHelper::DynamicValue => "read_dynamic_value".to_string(),
            ReadHelper::Dict => "read_dict".to_string(),
            ReadHelper::Array => "read_array".to_string(),
            ReadHelper::Struct => "read_struct".to_string(),
            ReadHelper::StructPair => "read_struct_pair".to_string(),
            ReadHelper::StructTriple => "read_struct_triple".to_string(),
            ReadHelper::StructArray => "read_struct_array".to_string(),
            ReadHelper::StructPairArray => "read_struct_pair_array".to_string(),
            ReadHelper::StructTripleArray => "read_struct_triple_array".to_string(),
        }
    }
}

/// Wrapper turning a typed field into a dynamic `Value`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueWrap {
    From,
    Fd,
    ObjectPath,
    Signature,
    /// Struct held as a list
    Fields,
    /// Array of structs held as lists
    FieldLists,
}

impl ValueWrap {
    fn for_field(signature: &Signature, ty: &HostType) -> Option<Self> {
        if *ty == HostType::Any {
            return None;
        }
        if let Some(code) = signature.as_primitive() {
            return Some(match code {
                PrimitiveCode::UnixFd => ValueWrap::Fd,
                PrimitiveCode::ObjectPath => ValueWrap::ObjectPath,
                PrimitiveCode::Signature => ValueWrap::Signature,
                _ => ValueWrap::From,
            });
        }
        let wrap = match signature {
            Signature::Struct(fields) if is_list_layout(fields) => ValueWrap::Fields,
            Signature::Array(element) => match element.as_ref() {
                Signature::Struct(fields) if is_list_layout(fields) => ValueWrap::FieldLists,
                _ => ValueWrap::From,
            },
            _ => ValueWrap::From,
        };
        Some(wrap)
    }

    fn render(self, expr: &str) -> String {
        let constructor = match self {
            ValueWrap::From => "Value::from",
            ValueWrap::Fd => "Value::Fd",
            ValueWrap::ObjectPath => "Value::ObjectPath",
            ValueWrap::Signature => "Value::Signature",
            ValueWrap::Fields => "Value::from_fields",
            ValueWrap::FieldLists => "Value::from_field_lists",
        };
        format!("{}({})", constructor, expr)
    }
}

/// `expr` of host type `ty` as a dynamic `Value` of `signature`
pub fn wrap_value(signature: &Signature, ty: &HostType, expr: &str) -> String {
    match ValueWrap::for_field(signature, ty) {
        Some(wrap) => wrap.render(expr),
        None => expr.to_string(),
    }
}

/// Whether a struct with these fields is held as `Vec<T>`
fn is_list_layout(fields: &[Signature]) -> bool {
    matches!(
        struct_layout(fields),
        Ok(StructLayout::Uniform(_)) | Ok(StructLayout::Mixed(_))
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRead {
    pub call: ReadCall,
    pub wrap: Option<ValueWrap>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadClosure {
    /// `|message| <call>`
    Call(ReadCall),
    /// `|message| Ok(vec![..])` for generic structs
    Fields(Vec<FieldRead>),
}

/// One read against the catalogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadCall {
    pub helper: ReadHelper,
    pub signature: Option<String>,
    pub closures: Vec<ReadClosure>,
}

impl ReadCall {
    fn new(helper: ReadHelper) -> Self {
        Self {
            helper,
            signature: None,
            closures: Vec::new(),
        }
    }

    fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    fn with_closure(mut self, closure: ReadClosure) -> Self {
        self.closures.push(closure);
        self
    }

    /// Render as an expression of type `RuntimeResult<T>`
    pub fn render(&self, receiver: &str) -> String {
        let mut args = Vec::new();
        if let Some(signature) = &self.signature {
            args.push(format!("{:?}", signature));
        }
        args.extend(self.closures.iter().map(ReadClosure::render));
        format!("{}.{}({})", receiver, self.helper.method_name(), args.join(", "))
    }

    /// Whether the rendered text names `Value`
    pub fn uses_value(&self) -> bool {
        self.closures.iter().any(|closure| match closure {
            ReadClosure::Call(call) => call.uses_value(),
            ReadClosure::Fields(fields) => fields
                .iter()
                .any(|field| field.wrap.is_some() || field.call.uses_value()),
        })
    }
}

impl ReadClosure {
    pub fn render(&self) -> String {
        match self {
            ReadClosure::Call(call) => {
                format!("|{}| {}", CLOSURE_RECEIVER, call.render(CLOSURE_RECEIVER))
            }
            ReadClosure::Fields(fields) => {
                let items: Vec<String> = fields
                    .iter()
                    .map(|field| {
                        let read = format!("{}?", field.call.render(CLOSURE_RECEIVER));
                        match field.wrap {
                            Some(wrap) => wrap.render(&read),
                            None => read,
                        }
                    })
                    .collect();
                format!("|{}| Ok(vec![{}])", CLOSURE_RECEIVER, items.join(", "))
            }
        }
    }
}

impl WriteCall {
    /// Whether the rendered text names `Value` or `IndexMap`
    pub fn imports(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if let Some(ty) = self.value.as_ref().and_then(|value| value.cast.as_ref()) {
            out.extend(ty.imports());
        }
        for closure in &self.closures {
            for call in &closure.body {
                out.extend(call.imports());
            }
        }
        out
    }
}

/// Plan writing the value behind `access` as `signature`
pub fn plan_encode(signature: &Signature, access: Access) -> CompileResult<WriteCall> {
    map_type(signature)?;
    encode(signature, access)
}

/// Plan reading one value of `signature`
pub fn plan_decode(signature: &Signature) -> CompileResult<ReadCall> {
    map_type(signature)?;
    decode(signature)
}

fn encode(signature: &Signature, access: Access) -> CompileResult<WriteCall> {
    match signature {
        Signature::Primitive(code) => Ok(WriteCall::new(WriteHelper::Basic(*code), access)),
        Signature::Variant => Ok(WriteCall::new(WriteHelper::Variant, access)),
        Signature::DictEntry(..) => Err(CompileError::dict_entry_outside_array(signature)),
        Signature::Struct(fields) => encode_struct(signature, fields, access),
        Signature::Array(element) => encode_array(signature, element, access),
    }
}

fn encode_struct(
    signature: &Signature,
    fields: &[Signature],
    access: Access,
) -> CompileResult<WriteCall> {
    match struct_layout(fields)? {
        StructLayout::Pair(..) => {
            let call = WriteCall::new(WriteHelper::StructPair, access);
            field_closures(call, fields)
        }
        StructLayout::Triple(..) => {
            let call = WriteCall::new(WriteHelper::StructTriple, access);
            field_closures(call, fields)
        }
        layout => {
            let body = generic_fields(fields, &layout, &access)?;
            Ok(WriteCall {
                helper: WriteHelper::Struct,
                signature: Some(signature.to_signature()),
                value: None,
                closures: Vec::new(),
            }
            .with_closure(None, body))
        }
    }
}

/// One `|message, value|` closure per field, for the pair/triple helpers
fn field_closures(mut call: WriteCall, fields: &[Signature]) -> CompileResult<WriteCall> {
    for field in fields {
        let body = encode(field, Access::borrowed("value"))?;
        call = call.with_closure(Some("value"), vec![body]);
    }
    Ok(call)
}

/// Indexed writes for a generic struct held as `Vec<T>` or `Vec<Value>`
fn generic_fields(
    fields: &[Signature],
    layout: &StructLayout,
    item: &Access,
) -> CompileResult<Vec<WriteCall>> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let cast = match layout {
                StructLayout::Mixed(types) if types[index] != HostType::Any => {
                    Some(types[index].clone())
                }
                _ => None,
            };
            encode(field, item.field(index, cast))
        })
        .collect()
}

fn encode_array(
    signature: &Signature,
    element: &Signature,
    access: Access,
) -> CompileResult<WriteCall> {
    match element {
        Signature::Primitive(code) => Ok(WriteCall::new(WriteHelper::BasicArray(*code), access)),
        Signature::Variant => Ok(WriteCall::new(WriteHelper::Array, access)
            .with_signature("v")
            .with_closure(
                Some("item"),
                vec![WriteCall::new(WriteHelper::Variant, Access::borrowed("item"))],
            )),
        Signature::DictEntry(key, value) => {
            let key_code = dict_entry_key(signature, key, value)?;
            if key_code == PrimitiveCode::String && **value == Signature::Variant {
                return Ok(WriteCall::new(WriteHelper::MapVariant, access));
            }
            let value_write = if **value == Signature::Variant {
                WriteCall::new(WriteHelper::Variant, Access::borrowed("value"))
            } else {
                WriteCall::new(WriteHelper::TypedValue, Access::borrowed("value"))
                    .with_signature(value.to_signature())
            };
            Ok(WriteCall::new(WriteHelper::Dict, access)
                .with_signature(element.to_signature())
                .with_closure(
                    Some("key"),
                    vec![WriteCall::new(WriteHelper::Basic(key_code), Access::borrowed("key"))],
                )
                .with_closure(Some("value"), vec![value_write]))
        }
        Signature::Struct(fields) => {
            let element_signature = element.to_signature();
            match struct_layout(fields)? {
                StructLayout::Pair(..) => field_closures(
                    WriteCall::new(WriteHelper::StructPairArray, access)
                        .with_signature(element_signature),
                    fields,
                ),
                StructLayout::Triple(..) => field_closures(
                    WriteCall::new(WriteHelper::StructTripleArray, access)
                        .with_signature(element_signature),
                    fields,
                ),
                layout => {
                    let body = generic_fields(fields, &layout, &Access::borrowed("item"))?;
                    Ok(WriteCall::new(WriteHelper::StructArray, access)
                        .with_signature(element_signature)
                        .with_closure(Some("item"), body))
                }
            }
        }
        Signature::Array(inner) if inner.is_dict_entry() => {
            let item = encode(element, Access::borrowed("item"))?;
            Ok(WriteCall::new(WriteHelper::Array, access)
                .with_signature(element.to_signature())
                .with_closure(Some("item"), vec![item]))
        }
        Signature::Array(_) => Err(CompileError::unsupported(
            signature,
            "arrays of arrays are only supported when the inner array is a dictionary",
        )),
    }
}

fn decode(signature: &Signature) -> CompileResult<ReadCall> {
    match signature {
        Signature::Primitive(code) => Ok(ReadCall::new(ReadHelper::Basic(*code))),
        Signature::Variant => Ok(ReadCall::new(ReadHelper::Variant)),
        Signature::DictEntry(..) => Err(CompileError::dict_entry_outside_array(signature)),
        Signature::Struct(fields) => match struct_layout(fields)? {
            StructLayout::Pair(..) => field_readers(ReadCall::new(ReadHelper::StructPair), fields),
            StructLayout::Triple(..) => {
                field_readers(ReadCall::new(ReadHelper::StructTriple), fields)
            }
            layout => Ok(ReadCall::new(ReadHelper::Struct)
                .with_signature(signature.to_signature())
                .with_closure(generic_field_reads(fields, &layout)?)),
        },
        Signature::Array(element) => decode_array(signature, element),
    }
}

fn field_readers(mut call: ReadCall, fields: &[Signature]) -> CompileResult<ReadCall> {
    for field in fields {
        call = call.with_closure(ReadClosure::Call(decode(field)?));
    }
    Ok(call)
}

fn generic_field_reads(fields: &[Signature], layout: &StructLayout) -> CompileResult<ReadClosure> {
    let reads = fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let wrap = match layout {
                StructLayout::Mixed(types) => ValueWrap::for_field(field, &types[index]),
                _ => None,
            };
            Ok(FieldRead {
                call: decode(field)?,
                wrap,
            })
        })
        .collect::<CompileResult<Vec<_>>>()?;
    Ok(ReadClosure::Fields(reads))
}

fn decode_array(signature: &Signature, element: &Signature) -> CompileResult<ReadCall> {
    match element {
        Signature::Primitive(code) => Ok(ReadCall::new(ReadHelper::BasicArray(*code))),
        Signature::Variant => Ok(ReadCall::new(ReadHelper::Array)
            .with_signature("v")
            .with_closure(ReadClosure::Call(ReadCall::new(ReadHelper::Variant)))),
        Signature::DictEntry(key, value) => {
            let key_code = dict_entry_key(signature, key, value)?;
            if key_code == PrimitiveCode::String && **value == Signature::Variant {
                return Ok(ReadCall::new(ReadHelper::StringVariantDict));
            }
            let value_read = if **value == Signature::Variant {
                ReadCall::new(ReadHelper::Variant)
            } else {
                ReadCall::new(ReadHelper::DynamicValue)
            };
            Ok(ReadCall::new(ReadHelper::Dict)
                .with_signature(element.to_signature())
                .with_closure(ReadClosure::Call(ReadCall::new(ReadHelper::Basic(key_code))))
                .with_closure(ReadClosure::Call(value_read)))
        }
        Signature::Struct(fields) => {
            let element_signature = element.to_signature();
            match struct_layout(fields)? {
                StructLayout::Pair(..) => field_readers(
                    ReadCall::new(ReadHelper::StructPairArray).with_signature(element_signature),
                    fields,
                ),
                StructLayout::Triple(..) => field_readers(
                    ReadCall::new(ReadHelper::StructTripleArray).with_signature(element_signature),
                    fields,
                ),
                layout => Ok(ReadCall::new(ReadHelper::StructArray)
                    .with_signature(element_signature)
                    .with_closure(generic_field_reads(fields, &layout)?)),
            }
        }
        Signature::Array(inner) if inner.is_dict_entry() => Ok(ReadCall::new(ReadHelper::Array)
            .with_signature(element.to_signature())
            .with_closure(ReadClosure::Call(decode(element)?))),
        Signature::Array(_) => Err(CompileError::unsupported(
            signature,
            "arrays of arrays are only supported when the inner array is a dictionary",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sig(text: &str) -> Signature {
        Signature::parse(text).unwrap()
    }

    fn write(text: &str, param: &str) -> String {
        plan_encode(&sig(text), Access::owned(param))
            .unwrap()
            .render("method_call")
    }

    fn read(text: &str) -> String {
        plan_decode(&sig(text)).unwrap().render("reply")
    }

    #[test]
    fn test_scalars_by_value_strings_by_reference() {
        assert_eq!(write("h", "fd"), "method_call.write_fd(fd)");
        assert_eq!(write("o", "handle"), "method_call.write_object_path(&handle)");
        assert_eq!(read("b"), "reply.read_bool()");
    }

    #[test]
    fn test_vardict() {
        assert_eq!(write("a{sv}", "options"), "method_call.write_map_variant(&options)");
        assert_eq!(read("a{sv}"), "reply.read_string_variant_dict()");
    }

    #[test]
    fn test_byte_array() {
        assert_eq!(write("ay", "data"), "method_call.write_byte_array(&data)");
        assert_eq!(read("ay"), "reply.read_byte_array()");
    }

    #[test]
    fn test_pair_array() {
        assert_eq!(
            write("a(sa{sv})", "devices"),
            "method_call.write_struct_pair_array(\"(sa{sv})\", &devices, \
             |message, value| message.write_string(value), \
             |message, value| message.write_map_variant(value))"
        );
        assert_eq!(
            read("a(sa{sv})"),
            "reply.read_struct_pair_array(\"(sa{sv})\", \
             |message| message.read_string(), \
             |message| message.read_string_variant_dict())"
        );
    }

    #[test]
    fn test_triple_scalar_fields_deref() {
        assert_eq!(
            write("(sut)", "entry"),
            "method_call.write_struct_triple(&entry, \
             |message, value| message.write_string(value), \
             |message, value| message.write_u32(*value), \
             |message, value| message.write_u64(*value))"
        );
    }

    #[test]
    fn test_generic_uniform_struct_array() {
        assert_eq!(
            write("a(iiii)", "rects"),
            "method_call.write_struct_array(\"(iiii)\", &rects, |message, item| { \
             message.write_i32(item[0])?; message.write_i32(item[1])?; \
             message.write_i32(item[2])?; message.write_i32(item[3])?; Ok(()) })"
        );
        assert_eq!(
            read("a(iiii)"),
            "reply.read_struct_array(\"(iiii)\", |message| Ok(vec![\
             message.read_i32()?, message.read_i32()?, message.read_i32()?, message.read_i32()?]))"
        );
    }

    #[test]
    fn test_generic_mixed_struct() {
        assert_eq!(
            write("(subh)", "info"),
            "method_call.write_struct(\"(subh)\", |message| { \
             message.write_string(&info[0].cast::<String>()?)?; \
             message.write_u32(info[1].cast::<u32>()?)?; \
             message.write_bool(info[2].cast::<bool>()?)?; \
             message.write_fd(info[3].cast::<i32>()?)?; Ok(()) })"
        );
        assert_eq!(
            read("(subh)"),
            "reply.read_struct(\"(subh)\", |message| Ok(vec![\
             Value::from(message.read_string()?), Value::from(message.read_u32()?), \
             Value::from(message.read_bool()?), Value::Fd(message.read_fd()?)]))"
        );
        assert!(plan_decode(&sig("(subh)")).unwrap().uses_value());
    }

    #[test]
    fn test_nested_generic_struct_stays_a_struct() {
        let encoded = write("(s(subh)uu)", "x");
        assert!(encoded.contains(
            "message.write_struct(\"(subh)\", |message| { \
             message.write_string(&x[1].cast::<Vec<Value>>()?[0].cast::<String>()?)?; \
             message.write_u32(x[1].cast::<Vec<Value>>()?[1].cast::<u32>()?)?;"
        ));

        let decoded = read("(s(subh)uu)");
        assert!(decoded.contains(
            "Value::from_fields(message.read_struct(\"(subh)\", |message| Ok(vec![\
             Value::from(message.read_string()?), Value::from(message.read_u32()?), \
             Value::from(message.read_bool()?), Value::Fd(message.read_fd()?)]))?)"
        ));
        assert!(!decoded.contains("Value::from(message.read_struct"));

        assert!(read("(sa(subh)bb)").contains("Value::from_field_lists(message.read_struct_array("));
        assert!(read("(s(uuuu)bb)").contains("Value::from_fields(message.read_struct("));
        // Pairs already become `Value::Struct` through their tuple conversion
        assert!(read("(s(su)bb)").contains("Value::from(message.read_struct_pair("));
    }

    #[test]
    fn test_mixed_struct_keeps_variant_fields_dynamic() {
        assert_eq!(
            write("(svuu)", "x"),
            "method_call.write_struct(\"(svuu)\", |message| { \
             message.write_string(&x[0].cast::<String>()?)?; \
             message.write_variant(&x[1])?; \
             message.write_u32(x[2].cast::<u32>()?)?; \
             message.write_u32(x[3].cast::<u32>()?)?; Ok(()) })"
        );
    }

    #[test]
    fn test_single_field_struct() {
        assert_eq!(
            write("(o)", "x"),
            "method_call.write_struct(\"(o)\", |message| message.write_object_path(&x[0]))"
        );
    }

    #[test]
    fn test_array_of_vardicts() {
        assert_eq!(
            write("aa{sv}", "entries"),
            "method_call.write_array(\"a{sv}\", &entries, |message, item| message.write_map_variant(item))"
        );
        assert_eq!(
            read("aa{sv}"),
            "reply.read_array(\"a{sv}\", |message| message.read_string_variant_dict())"
        );
    }

    #[test]
    fn test_typed_dict() {
        assert_eq!(
            write("a{oa{sv}}", "objects"),
            "method_call.write_dict(\"{oa{sv}}\", &objects, \
             |message, key| message.write_object_path(key), \
             |message, value| message.write_typed_value(\"a{sv}\", value))"
        );
        assert_eq!(
            read("a{ov}"),
            "reply.read_dict(\"{ov}\", |message| message.read_object_path(), |message| message.read_variant())"
        );
    }

    #[test]
    fn test_variant_array() {
        assert_eq!(
            write("av", "values"),
            "method_call.write_array(\"v\", &values, |message, item| message.write_variant(item))"
        );
        assert_eq!(read("av"), "reply.read_array(\"v\", |message| message.read_variant())");
    }

    #[test]
    fn test_unsupported_shapes() {
        for text in ["aas", "a{uv}", "a{(ss)v}"] {
            assert!(
                matches!(
                    plan_encode(&sig(text), Access::owned("x")),
                    Err(CompileError::UnsupportedShape { .. })
                ),
                "{} should not encode",
                text
            );
            assert!(
                matches!(
                    plan_decode(&sig(text)),
                    Err(CompileError::UnsupportedShape { .. })
                ),
                "{} should not decode",
                text
            );
        }
    }

    #[test]
    fn test_dict_entry_outside_array() {
        assert!(matches!(
            plan_encode(&sig("{sv}"), Access::owned("x")),
            Err(CompileError::DictEntryOutsideArray { .. })
        ));
        assert!(matches!(
            plan_decode(&sig("a(s{sv})")),
            Err(CompileError::DictEntryOutsideArray { .. })
        ));
    }

    #[test]
    fn test_imports_follow_casts() {
        let plan = plan_encode(&sig("a(sa{sv}ii)"), Access::owned("x")).unwrap();
        assert_eq!(plan.imports(), vec!["IndexMap", "Value"]);
        let plan = plan_encode(&sig("a(iiii)"), Access::owned("x")).unwrap();
        assert!(plan.imports().is_empty());
    }
}
