use busgen_compiler::plan::{plan_decode, plan_encode, Access};
use busgen_compiler::{compile_xml, map_type, CompileError, CompileOptions};
use busgen_signature::{PrimitiveCode, Signature};
use proptest::prelude::*;

fn arb_primitive() -> impl Strategy<Value = Signature> {
    proptest::sample::select(PrimitiveCode::ALL.to_vec()).prop_map(Signature::Primitive)
}

fn arb_string_key() -> impl Strategy<Value = Signature> {
    proptest::sample::select(vec![
        PrimitiveCode::String,
        PrimitiveCode::ObjectPath,
        PrimitiveCode::Signature,
    ])
    .prop_map(Signature::Primitive)
}

/// Anything the grammar can express, misplaced dict entries included
fn arb_signature() -> impl Strategy<Value = Signature> {
    let leaf = prop_oneof![arb_primitive(), Just(Signature::Variant)];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(Signature::array),
            proptest::collection::vec(inner.clone(), 1..6).prop_map(Signature::Struct),
            (inner.clone(), inner).prop_map(|(k, v)| Signature::dict_entry(k, v)),
        ]
    })
}

/// Shapes stubs can be generated for
fn arb_supported() -> impl Strategy<Value = Signature> {
    let leaf = prop_oneof![arb_primitive(), Just(Signature::Variant)];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            inner
                .clone()
                .prop_filter("arrays of non-dictionary arrays", |element| {
                    !matches!(element, Signature::Array(nested) if !nested.is_dict_entry())
                })
                .prop_map(Signature::array),
            proptest::collection::vec(inner.clone(), 1..6).prop_map(Signature::Struct),
            (arb_string_key(), inner)
                .prop_map(|(k, v)| Signature::array(Signature::dict_entry(k, v))),
        ]
    })
}

fn documented(error: &CompileError) -> bool {
    matches!(
        error,
        CompileError::DictEntryOutsideArray { .. } | CompileError::UnsupportedShape { .. }
    )
}

proptest! {
    #[test]
    fn mapping_and_planning_are_total(sig in arb_signature()) {
        let mapped = map_type(&sig);
        let encoded = plan_encode(&sig, Access::owned("value"));
        let decoded = plan_decode(&sig);

        for error in [mapped.as_ref().err(), encoded.as_ref().err(), decoded.as_ref().err()]
            .into_iter()
            .flatten()
        {
            prop_assert!(documented(error), "undocumented error {:?} for {}", error, sig);
        }
        // A shape the mapper rejects is never planned
        if mapped.is_err() {
            prop_assert!(encoded.is_err() && decoded.is_err());
        }
        prop_assert_eq!(encoded.is_ok(), decoded.is_ok());
    }

    #[test]
    fn supported_shapes_always_plan(sig in arb_supported()) {
        prop_assert!(map_type(&sig).is_ok());
        let encoded = plan_encode(&sig, Access::owned("value")).unwrap();
        let decoded = plan_decode(&sig).unwrap();
        prop_assert!(encoded.render("method_call").starts_with("method_call.write_"));
        prop_assert!(decoded.render("reply").starts_with("reply.read_"));
    }

    #[test]
    fn supported_shapes_compile(sig in arb_supported()) {
        let xml = format!(
            r#"<node><interface name="org.example.Echo"><method name="Echo"><arg name="input" type="{0}" direction="in"/><arg name="output" type="{0}" direction="out"/></method></interface></node>"#,
            sig
        );
        let output = compile_xml(&xml, CompileOptions::bare()).unwrap();
        let mapped = map_type(&sig).unwrap().render();
        let expected = format!("input: {}) -> RuntimeResult<{}>", mapped, mapped);
        prop_assert!(output.contains(&expected));
    }

    #[test]
    fn nested_list_structs_stay_structs(sig in arb_supported()) {
        // Four fields of differing types give a struct held as `Vec<Value>`
        let outer = Signature::Struct(vec![
            Signature::Primitive(PrimitiveCode::String),
            sig,
            Signature::Primitive(PrimitiveCode::Boolean),
            Signature::Primitive(PrimitiveCode::Boolean),
        ]);
        let decoded = plan_decode(&outer).unwrap().render("reply");
        prop_assert!(!decoded.contains("Value::from(message.read_struct(\""), "{}", decoded);
        prop_assert!(!decoded.contains("Value::from(message.read_struct_array("), "{}", decoded);
    }
}
