//! Purpose: Shared fixture types for integration tests.
//! Exports: `Type`, `EnumObject`, `Dummy`, `type_registry`.
//! Role: User-side `Pickle` implementations exercised through the public API only.
//! Invariants: `Dummy` keeps its name private and exposes it through `Attributes`.
#![allow(dead_code)]

use std::fmt;

use picklebox::api::{
    Attributes, EnumMember, Error, ErrorKind, Extract, Node, ObjectNode, Pickle, TypeRegistry,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Type {
    One,
    Two,
}

impl Type {
    pub const TAG: &'static str = "fixtures.Type";

    pub fn member(self) -> &'static str {
        match self {
            Type::One => "ONE",
            Type::Two => "TWO",
        }
    }

    pub fn to_node(self) -> Node {
        EnumMember::new(Self::TAG, self.member()).into()
    }

    pub fn from_node(node: &Node) -> Result<Self, Error> {
        let member = match node {
            Node::Member(member) if member.enum_tag() == Self::TAG => member.member(),
            other => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("expected a Type member, found {}", other.kind())));
            }
        };
        match member {
            "ONE" => Ok(Type::One),
            "TWO" => Ok(Type::Two),
            unknown => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unknown Type member {unknown}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumObject {
    pub num: i64,
    pub kind: Type,
}

impl EnumObject {
    pub fn new(num: i64, kind: Type) -> Self {
        Self { num, kind }
    }
}

impl fmt::Display for EnumObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EnumObject(num={}, objectType=Type.{})",
            self.num,
            self.kind.member()
        )
    }
}

fn expect_object<'a>(node: &'a Node, tag: &str) -> Result<&'a ObjectNode, Error> {
    let object = node.as_object().ok_or_else(|| {
        Error::new(ErrorKind::Usage).with_message(format!("expected an object, found {}", node.kind()))
    })?;
    object.expect_tag(tag)?;
    Ok(object)
}

impl Pickle for EnumObject {
    const TYPE_TAG: &'static str = "fixtures.EnumObject";

    fn to_node(&self) -> Node {
        ObjectNode::new(Self::TYPE_TAG)
            .with_field("num", self.num)
            .with_field("type", self.kind.to_node())
            .into()
    }

    fn from_node(node: &Node) -> Result<Self, Error> {
        let object = expect_object(node, Self::TYPE_TAG)?;
        Ok(Self {
            num: i64::extract(object.require("num")?)?,
            kind: Type::from_node(object.require("type")?)?,
        })
    }
}

/// Name lives in a private field; `name` is the public accessor.
#[derive(Clone, Debug, PartialEq)]
pub struct Dummy {
    name: String,
    attrs: Vec<(String, Node)>,
}

impl Dummy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn change_name_to_dummy(&mut self) {
        self.set_name("Dummy");
    }

    /// Chainable `set_attr` for building fixtures.
    pub fn with_attr(mut self, name: &str, value: impl Into<Node>) -> Self {
        self.set_extra(name, value.into());
        self
    }

    fn set_extra(&mut self, name: &str, value: Node) {
        match self.attrs.iter_mut().find(|(attr, _)| attr == name) {
            Some(entry) => entry.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }
}

impl fmt::Display for Dummy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dummy(name='{}')", self.name)
    }
}

impl Attributes for Dummy {
    fn get_attr(&self, name: &str) -> Option<Node> {
        if name == "name" {
            return Some(Node::from(self.name.as_str()));
        }
        self.attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.clone())
    }

    fn set_attr(&mut self, name: &str, value: Node) -> Result<(), Error> {
        if name == "name" {
            self.set_name(String::extract(&value)?);
            return Ok(());
        }
        self.set_extra(name, value);
        Ok(())
    }
}

impl Pickle for Dummy {
    const TYPE_TAG: &'static str = "fixtures.Dummy";

    fn to_node(&self) -> Node {
        let mut object = ObjectNode::new(Self::TYPE_TAG).with_field("_name", self.name.as_str());
        for (name, value) in &self.attrs {
            object.set_field(name.clone(), value.clone());
        }
        object.into()
    }

    fn from_node(node: &Node) -> Result<Self, Error> {
        let object = expect_object(node, Self::TYPE_TAG)?;
        let mut dummy = Dummy::new(String::extract(object.require("_name")?)?);
        for (name, value) in object.fields() {
            if name != "_name" {
                dummy.set_extra(name, value.clone());
            }
        }
        Ok(dummy)
    }
}

pub fn type_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register::<Dummy, _>(|args| {
            let name = match args.first() {
                Some(node) => String::extract(node)?,
                None => "Dummy".to_string(),
            };
            Ok(Dummy::new(name))
        })
        .expect("register Dummy");
    registry
        .register::<EnumObject, _>(|args| {
            let num = picklebox::api::extract_arg::<i64>(args.first(), "num")?;
            let kind = match args.get(1) {
                Some(node) => Type::from_node(node)?,
                None => {
                    return Err(Error::new(ErrorKind::Usage).with_message("missing argument \"type\""));
                }
            };
            Ok(EnumObject::new(num, kind))
        })
        .expect("register EnumObject");
    registry
}
