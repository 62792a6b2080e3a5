use crate::ast::*;
use crate::error::{IntrospectError, IntrospectResult};
use busgen_signature::Signature;
use roxmltree::{Document, Node, ParsingOptions};

/// Parse an introspection document into its node tree
pub fn parse(xml: &str) -> IntrospectResult<IntrospectionNode> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(xml, options)?;
    let root = document.root_element();
    if root.tag_name().name() != "node" {
        return Err(IntrospectError::UnexpectedRoot(
            root.tag_name().name().to_string(),
        ));
    }

    Parser::new(&document).parse_node(root)
}

/// Structural walk over the XML tree. Only direct children are visited, so a
/// nested `<node>` keeps its own interfaces.
struct Parser<'a, 'input> {
    document: &'a Document<'input>,
}

impl<'a, 'input> Parser<'a, 'input> {
    fn new(document: &'a Document<'input>) -> Self {
        Self { document }
    }

    fn parse_node(&self, element: Node<'a, 'input>) -> IntrospectResult<IntrospectionNode> {
        let mut node = IntrospectionNode::new(element.attribute("name").unwrap_or_default());

        for child in child_elements(element) {
            match child.tag_name().name() {
                "interface" => node.interfaces.push(self.parse_interface(child)?),
                "node" => node.children.push(self.parse_node(child)?),
                _ => {}
            }
        }

        Ok(node)
    }

    fn parse_interface(&self, element: Node<'a, 'input>) -> IntrospectResult<Interface> {
        let mut interface = Interface::new(self.required(element, "name")?);

        for child in child_elements(element) {
            match child.tag_name().name() {
                "method" => interface.methods.push(self.parse_method(child)?),
                "signal" => interface.signals.push(self.parse_signal(child)?),
                "property" => interface.properties.push(self.parse_property(child)?),
                "annotation" => interface.annotations.push(self.parse_annotation(child)?),
                _ => {}
            }
        }

        Ok(interface)
    }

    fn parse_method(&self, element: Node<'a, 'input>) -> IntrospectResult<Method> {
        let name = self.required(element, "name")?.to_string();
        let mut in_args = Vec::new();
        let mut out_args = Vec::new();
        let mut annotations = Vec::new();

        for child in child_elements(element) {
            match child.tag_name().name() {
                "arg" => {
                    let arg = self.parse_arg(child, &name, Direction::In)?;
                    match arg.direction {
                        Direction::In => in_args.push(arg),
                        Direction::Out => out_args.push(arg),
                    }
                }
                "annotation" => annotations.push(self.parse_annotation(child)?),
                _ => {}
            }
        }

        Ok(Method {
            name,
            in_args,
            out_args,
            annotations,
        })
    }

    fn parse_signal(&self, element: Node<'a, 'input>) -> IntrospectResult<Signal> {
        let name = self.required(element, "name")?.to_string();
        let mut args = Vec::new();
        let mut annotations = Vec::new();

        for child in child_elements(element) {
            match child.tag_name().name() {
                "arg" => {
                    let arg = self.parse_arg(child, &name, Direction::Out)?;
                    // Signal payloads only ever flow outwards
                    if arg.direction == Direction::In {
                        return Err(IntrospectError::DirectionLiteral {
                            member: name,
                            literal: "in".to_string(),
                        });
                    }
                    args.push(arg);
                }
                "annotation" => annotations.push(self.parse_annotation(child)?),
                _ => {}
            }
        }

        Ok(Signal {
            name,
            args,
            annotations,
        })
    }

    fn parse_property(&self, element: Node<'a, 'input>) -> IntrospectResult<Property> {
        let name = self.required(element, "name")?.to_string();
        let raw_type = self.required(element, "type")?;
        let raw_access = self.required(element, "access")?;

        let access =
            Access::from_literal(raw_access).ok_or_else(|| IntrospectError::AccessLiteral {
                property: name.clone(),
                literal: raw_access.to_string(),
            })?;
        let type_ = Signature::parse(raw_type)
            .map_err(|e| IntrospectError::signature(format!("property {}", name), e))?;

        let annotations = child_elements(element)
            .filter(|child| child.tag_name().name() == "annotation")
            .map(|child| self.parse_annotation(child))
            .collect::<IntrospectResult<Vec<_>>>()?;

        Ok(Property {
            name,
            type_,
            access,
            annotations,
        })
    }

    fn parse_arg(
        &self,
        element: Node<'a, 'input>,
        member: &str,
        default_direction: Direction,
    ) -> IntrospectResult<Arg> {
        let name = element.attribute("name").map(str::to_string);
        let raw_type = self.required(element, "type")?;

        let direction = match element.attribute("direction") {
            None => default_direction,
            Some(literal) => Direction::from_literal(literal).ok_or_else(|| {
                IntrospectError::DirectionLiteral {
                    member: member.to_string(),
                    literal: literal.to_string(),
                }
            })?,
        };

        let context = match &name {
            Some(arg_name) => format!("argument {} of {}", arg_name, member),
            None => format!("an argument of {}", member),
        };
        let type_ = Signature::parse(raw_type).map_err(|e| IntrospectError::signature(context, e))?;

        let annotations = child_elements(element)
            .filter(|child| child.tag_name().name() == "annotation")
            .map(|child| self.parse_annotation(child))
            .collect::<IntrospectResult<Vec<_>>>()?;

        Ok(Arg {
            name,
            type_,
            direction,
            annotations,
        })
    }

    fn parse_annotation(&self, element: Node<'a, 'input>) -> IntrospectResult<Annotation> {
        Ok(Annotation {
            name: self.required(element, "name")?.to_string(),
            value: element.attribute("value").unwrap_or_default().to_string(),
        })
    }

    fn required(&self, element: Node<'a, 'input>, attribute: &str) -> IntrospectResult<&'a str> {
        element.attribute(attribute).ok_or_else(|| {
            let line = self.document.text_pos_at(element.range().start).row;
            IntrospectError::missing_attribute(element.tag_name().name(), attribute, line)
        })
    }
}

fn child_elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

#[cfg(test)]
mod tests {
    use super::*;
    use busgen_signature::PrimitiveCode;

    #[test]
    fn test_method_directions_default_to_in() {
        let xml = r#"
<node>
  <interface name="org.example.Echo">
    <method name="Echo">
      <arg name="text" type="s"/>
      <arg name="reply" type="s" direction="out"/>
    </method>
  </interface>
</node>
"#;
        let node = parse(xml).unwrap();
        let method = &node.interfaces[0].methods[0];
        assert_eq!(method.in_args.len(), 1);
        assert_eq!(method.out_args.len(), 1);
        assert_eq!(method.in_args[0].direction, Direction::In);
        assert_eq!(method.out_args[0].name.as_deref(), Some("reply"));
    }

    #[test]
    fn test_signal_args_default_to_out() {
        let xml = r#"
<node>
  <interface name="org.example.Clock">
    <signal name="Tick">
      <arg name="seconds" type="t"/>
    </signal>
  </interface>
</node>
"#;
        let node = parse(xml).unwrap();
        let signal = &node.interfaces[0].signals[0];
        assert_eq!(signal.args[0].direction, Direction::Out);
        assert_eq!(
            signal.args[0].type_,
            Signature::Primitive(PrimitiveCode::UInt64)
        );
    }

    #[test]
    fn test_signal_in_arg_rejected() {
        let xml = r#"
<node>
  <interface name="org.example.Clock">
    <signal name="Tick"><arg name="seconds" type="t" direction="in"/></signal>
  </interface>
</node>
"#;
        assert!(matches!(
            parse(xml),
            Err(IntrospectError::DirectionLiteral { .. })
        ));
    }

    #[test]
    fn test_bad_direction_literal() {
        let xml = r#"
<node>
  <interface name="org.example.Echo">
    <method name="Echo"><arg name="text" type="s" direction="sideways"/></method>
  </interface>
</node>
"#;
        match parse(xml) {
            Err(IntrospectError::DirectionLiteral { member, literal }) => {
                assert_eq!(member, "Echo");
                assert_eq!(literal, "sideways");
            }
            other => panic!("expected direction error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_direction_literal() {
        let xml = r#"
<node>
  <interface name="org.example.Echo">
    <method name="Echo"><arg name="text" type="s" direction=""/></method>
  </interface>
</node>
"#;
        match parse(xml) {
            Err(IntrospectError::DirectionLiteral { member, literal }) => {
                assert_eq!(member, "Echo");
                assert_eq!(literal, "");
            }
            other => panic!("expected direction error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_access_literal() {
        let xml = r#"
<node>
  <interface name="org.example.Thing">
    <property name="Size" type="u" access="readonly"/>
  </interface>
</node>
"#;
        assert!(matches!(
            parse(xml),
            Err(IntrospectError::AccessLiteral { .. })
        ));
    }

    #[test]
    fn test_bad_signature_is_fatal() {
        let xml = r#"
<node>
  <interface name="org.example.Thing">
    <method name="Frob"><arg name="x" type="(ii"/></method>
  </interface>
</node>
"#;
        assert!(matches!(parse(xml), Err(IntrospectError::Signature { .. })));
    }

    #[test]
    fn test_missing_interface_name() {
        let xml = "<node>\n  <interface>\n  </interface>\n</node>";
        match parse(xml) {
            Err(IntrospectError::MissingAttribute {
                element,
                attribute,
                line,
            }) => {
                assert_eq!(element, "interface");
                assert_eq!(attribute, "name");
                assert_eq!(line, 2);
            }
            other => panic!("expected missing attribute, got {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_root() {
        assert!(matches!(
            parse("<interface name=\"a.b\"/>"),
            Err(IntrospectError::UnexpectedRoot(_))
        ));
    }

    #[test]
    fn test_malformed_xml() {
        assert!(matches!(parse("<node>"), Err(IntrospectError::Xml(_))));
    }
}
