use busgen_signature::Signature;
use serde::{Deserialize, Serialize};

/// One `<node>` of the introspection tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionNode {
    /// Path segment, empty for an unnamed root
    pub name: String,
    pub interfaces: Vec<Interface>,
    pub children: Vec<IntrospectionNode>,
}

impl IntrospectionNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interfaces: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Interfaces of this node and every descendant, depth-first in document order
    pub fn all_interfaces(&self) -> Vec<&Interface> {
        let mut out = Vec::new();
        self.collect_interfaces(&mut out);
        out
    }

    fn collect_interfaces<'a>(&'a self, out: &mut Vec<&'a Interface>) {
        out.extend(self.interfaces.iter());
        for child in &self.children {
            child.collect_interfaces(out);
        }
    }
}

/// Interface declaration (`org.freedesktop.portal.Secret`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    pub methods: Vec<Method>,
    pub signals: Vec<Signal>,
    pub properties: Vec<Property>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
            signals: Vec::new(),
            properties: Vec::new(),
            annotations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub in_args: Vec<Arg>,
    pub out_args: Vec<Arg>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

/// Signal declaration; every arg travels from the remote object to us
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    pub args: Vec<Arg>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: Signature,
    pub access: Access,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    /// Parse the literal used by the `access` attribute
    pub fn from_literal(literal: &str) -> Option<Self> {
        match literal {
            "read" => Some(Access::Read),
            "write" => Some(Access::Write),
            "readwrite" => Some(Access::ReadWrite),
            _ => None,
        }
    }

    pub fn is_readable(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    pub fn is_writable(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arg {
    /// Optional in the XML; stubs fall back to a positional name
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_: Signature,
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl Arg {
    pub fn new(name: impl Into<String>, type_: Signature, direction: Direction) -> Self {
        Self {
            name: Some(name.into()),
            type_,
            direction,
            annotations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn from_literal(literal: &str) -> Option<Self> {
        match literal {
            "in" => Some(Direction::In),
            "out" => Some(Direction::Out),
            _ => None,
        }
    }
}

/// `<annotation name=".." value=".."/>`, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    pub value: String,
}
