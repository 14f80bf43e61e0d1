//! Purpose: Define the in-memory value model that the codec encodes and decodes.
//! Exports: `Node`, `ObjectNode`, `EnumMember`, `NamedTupleNode`, `TypeRef`, `FunctionRef`,
//! `Extract`, `extract_arg`.
//! Role: Common currency between user types (`Pickle`), the codec, and the harness.
//! Invariants: Field and dict order is insertion order and survives a round-trip.
//! Invariants: `Display` renders a stable repr-like form; harness checks compare it.
//! Notes: `Shared` is the only variant with interior mutability and makes `Node` `!Send`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Node>),
    Tuple(Vec<Node>),
    Dict(Vec<(String, Node)>),
    Shared(Rc<RefCell<Node>>),
    Object(ObjectNode),
    Member(EnumMember),
    NamedTuple(NamedTupleNode),
    Type(TypeRef),
    Function(FunctionRef),
}

/// Instance of a tagged type: the tag plus its fields in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectNode {
    tag: String,
    fields: Vec<(String, Node)>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnumMember {
    enum_tag: String,
    member: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NamedTupleNode {
    name: String,
    fields: Vec<(String, Node)>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TypeRef {
    tag: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FunctionRef {
    qualname: String,
    source: Option<String>,
}

/// Last path segment of a `::`- or `.`-separated name.
pub(crate) fn short_name(path: &str) -> &str {
    path.rsplit(['.', ':']).next().unwrap_or(path)
}

impl Node {
    pub fn list(items: impl IntoIterator<Item = Node>) -> Self {
        Node::List(items.into_iter().collect())
    }

    pub fn tuple(items: impl IntoIterator<Item = Node>) -> Self {
        Node::Tuple(items.into_iter().collect())
    }

    /// Dict from entries; a repeated key keeps its first position and its last value.
    pub fn dict<K: Into<String>>(entries: impl IntoIterator<Item = (K, Node)>) -> Self {
        let mut dict = Vec::new();
        for (key, value) in entries {
            set_entry(&mut dict, key.into(), value);
        }
        Node::Dict(dict)
    }

    pub fn shared(inner: Node) -> Self {
        Node::Shared(Rc::new(RefCell::new(inner)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Str(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(items) | Node::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            Node::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Node::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeRef> {
        match self {
            Node::Type(type_ref) => Some(type_ref),
            _ => None,
        }
    }

    /// Dict lookup; sees through `Shared`.
    pub fn get_item(&self, key: &str) -> Option<Node> {
        match self {
            Node::Dict(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.clone()),
            Node::Shared(cell) => cell.borrow().get_item(key),
            _ => None,
        }
    }

    /// Insert or replace a dict entry. Writes through `Shared` so every alias sees it.
    pub fn set_item(&mut self, key: impl Into<String>, value: Node) -> Result<(), Error> {
        match self {
            Node::Dict(entries) => {
                set_entry(entries, key.into(), value);
                Ok(())
            }
            Node::Shared(cell) => cell.borrow_mut().set_item(key, value),
            other => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("cannot set an item on {}", other.kind()))),
        }
    }

    /// Short shape name, independent of any user type tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "bool",
            Node::Int(_) => "int",
            Node::Float(_) => "float",
            Node::Str(_) => "str",
            Node::List(_) => "list",
            Node::Tuple(_) => "tuple",
            Node::Dict(_) => "dict",
            Node::Shared(_) => "shared",
            Node::Object(_) => "object",
            Node::Member(_) => "enum",
            Node::NamedTuple(_) => "namedtuple",
            Node::Type(_) => "type",
            Node::Function(_) => "function",
        }
    }

    /// Dynamic type name: the user tag for tagged shapes, the builtin name otherwise.
    pub fn type_name(&self) -> String {
        match self {
            Node::Null => "NoneType".to_string(),
            Node::Shared(cell) => cell.borrow().type_name(),
            Node::Object(object) => object.tag.clone(),
            Node::Member(member) => member.enum_tag.clone(),
            Node::NamedTuple(tuple) => tuple.name.clone(),
            other => other.kind().to_string(),
        }
    }

    /// Field names of an object, in order (the `vars()` view).
    pub fn field_names(&self) -> Vec<String> {
        match self {
            Node::Object(object) => object.fields.iter().map(|(name, _)| name.clone()).collect(),
            Node::Shared(cell) => cell.borrow().field_names(),
            _ => Vec::new(),
        }
    }

    /// Field names of an object whose value is `Null`.
    pub fn null_field_names(&self) -> Vec<String> {
        match self {
            Node::Object(object) => object
                .fields
                .iter()
                .filter(|(_, value)| value.is_null())
                .map(|(name, _)| name.clone())
                .collect(),
            Node::Shared(cell) => cell.borrow().null_field_names(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn contains(&self, predicate: &dyn Fn(&Node) -> bool) -> bool {
        if predicate(self) {
            return true;
        }
        match self {
            Node::List(items) | Node::Tuple(items) => {
                items.iter().any(|item| item.contains(predicate))
            }
            Node::Dict(entries) => entries.iter().any(|(_, value)| value.contains(predicate)),
            Node::Object(object) => object.fields.iter().any(|(_, value)| value.contains(predicate)),
            Node::NamedTuple(tuple) => tuple.fields.iter().any(|(_, value)| value.contains(predicate)),
            Node::Shared(cell) => cell.borrow().contains(predicate),
            _ => false,
        }
    }
}

fn set_entry(entries: &mut Vec<(String, Node)>, key: String, value: Node) {
    match entries.iter_mut().find(|(name, _)| *name == key) {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    }
}

impl ObjectNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Node>) -> Self {
        set_entry(&mut self.fields, name.into(), value.into());
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn fields(&self) -> &[(String, Node)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Node> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Field lookup that reports a missing field as a decode failure.
    pub fn require(&self, name: &str) -> Result<&Node, Error> {
        self.field(name).ok_or_else(|| {
            Error::new(ErrorKind::Corrupt)
                .with_message(format!("object is missing field {name:?}"))
                .with_tag(self.tag.clone())
        })
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: Node) {
        set_entry(&mut self.fields, name.into(), value);
    }

    /// Fails unless the object carries `tag`.
    pub fn expect_tag(&self, tag: &str) -> Result<(), Error> {
        if self.tag == tag {
            return Ok(());
        }
        Err(Error::new(ErrorKind::Usage)
            .with_message(format!("expected an object tagged {tag:?}"))
            .with_tag(self.tag.clone()))
    }
}

impl EnumMember {
    pub fn new(enum_tag: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            enum_tag: enum_tag.into(),
            member: member.into(),
        }
    }

    pub fn enum_tag(&self) -> &str {
        &self.enum_tag
    }

    pub fn member(&self) -> &str {
        &self.member
    }
}

impl NamedTupleNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Node>) -> Self {
        set_entry(&mut self.fields, name.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[(String, Node)] {
        &self.fields
    }

    pub fn values(&self) -> impl Iterator<Item = &Node> {
        self.fields.iter().map(|(_, value)| value)
    }
}

impl TypeRef {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl FunctionRef {
    pub fn new(qualname: impl Into<String>) -> Self {
        Self {
            qualname: qualname.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn without_source(mut self) -> Self {
        self.source = None;
        self
    }

    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    pub fn name(&self) -> &str {
        short_name(&self.qualname)
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Int(value)
    }
}

impl From<i32> for Node {
    fn from(value: i32) -> Self {
        Node::Int(i64::from(value))
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Float(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Str(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Str(value)
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(value: Option<T>) -> Self {
        value.map_or(Node::Null, Into::into)
    }
}

impl<T: Into<Node>> From<Vec<T>> for Node {
    fn from(value: Vec<T>) -> Self {
        Node::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<ObjectNode> for Node {
    fn from(value: ObjectNode) -> Self {
        Node::Object(value)
    }
}

impl From<EnumMember> for Node {
    fn from(value: EnumMember) -> Self {
        Node::Member(value)
    }
}

impl From<NamedTupleNode> for Node {
    fn from(value: NamedTupleNode) -> Self {
        Node::NamedTuple(value)
    }
}

impl From<TypeRef> for Node {
    fn from(value: TypeRef) -> Self {
        Node::Type(value)
    }
}

impl From<FunctionRef> for Node {
    fn from(value: FunctionRef) -> Self {
        Node::Function(value)
    }
}

/// Conversion from a decoded `Node` into a plain Rust value.
pub trait Extract: Sized {
    fn extract(node: &Node) -> Result<Self, Error>;
}

fn mismatch(expected: &str, node: &Node) -> Error {
    Error::new(ErrorKind::Usage).with_message(format!("expected {expected}, found {}", node.kind()))
}

impl Extract for Node {
    fn extract(node: &Node) -> Result<Self, Error> {
        Ok(node.clone())
    }
}

impl Extract for bool {
    fn extract(node: &Node) -> Result<Self, Error> {
        match node {
            Node::Bool(value) => Ok(*value),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl Extract for i64 {
    fn extract(node: &Node) -> Result<Self, Error> {
        match node {
            Node::Int(value) => Ok(*value),
            other => Err(mismatch("int", other)),
        }
    }
}

impl Extract for f64 {
    fn extract(node: &Node) -> Result<Self, Error> {
        match node {
            Node::Float(value) => Ok(*value),
            Node::Int(value) => Ok(*value as f64),
            other => Err(mismatch("float", other)),
        }
    }
}

impl Extract for String {
    fn extract(node: &Node) -> Result<Self, Error> {
        match node {
            Node::Str(value) => Ok(value.clone()),
            other => Err(mismatch("str", other)),
        }
    }
}

impl<T: Extract> Extract for Option<T> {
    fn extract(node: &Node) -> Result<Self, Error> {
        match node {
            Node::Null => Ok(None),
            other => T::extract(other).map(Some),
        }
    }
}

impl<T: Extract> Extract for Vec<T> {
    fn extract(node: &Node) -> Result<Self, Error> {
        match node {
            Node::List(items) | Node::Tuple(items) => items.iter().map(T::extract).collect(),
            other => Err(mismatch("list", other)),
        }
    }
}

/// Extract a positional argument, reporting a missing one by name.
pub fn extract_arg<T: Extract>(arg: Option<&Node>, name: &str) -> Result<T, Error> {
    let node = arg.ok_or_else(|| {
        Error::new(ErrorKind::Usage).with_message(format!("missing argument {name:?}"))
    })?;
    T::extract(node).map_err(|err| {
        let detail = err.message().unwrap_or("bad value").to_string();
        Error::new(ErrorKind::Usage).with_message(format!("argument {name:?}: {detail}"))
    })
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Null => f.write_str("None"),
            Node::Bool(true) => f.write_str("True"),
            Node::Bool(false) => f.write_str("False"),
            Node::Int(value) => write!(f, "{value}"),
            Node::Float(value) => write!(f, "{value:?}"),
            Node::Str(text) => write_quoted(f, text),
            Node::List(items) => {
                f.write_str("[")?;
                write_items(f, items)?;
                f.write_str("]")
            }
            Node::Tuple(items) => {
                f.write_str("(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Node::Dict(entries) => {
                f.write_str("{")?;
                for (idx, (key, value)) in entries.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write_quoted(f, key)?;
                    write!(f, ": {value}")?;
                }
                f.write_str("}")
            }
            Node::Shared(cell) => write!(f, "{}", cell.borrow()),
            Node::Object(object) => {
                write!(f, "{}(", short_name(&object.tag))?;
                write_fields(f, &object.fields)?;
                f.write_str(")")
            }
            Node::Member(member) => {
                write!(f, "{}.{}", short_name(&member.enum_tag), member.member)
            }
            Node::NamedTuple(tuple) => {
                write!(f, "{}(", tuple.name)?;
                write_fields(f, &tuple.fields)?;
                f.write_str(")")
            }
            Node::Type(type_ref) => write!(f, "<class '{}'>", type_ref.tag),
            Node::Function(function) => write!(f, "<function {}>", function.name()),
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_str("'")?;
    for ch in text.chars() {
        match ch {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            other => write!(f, "{other}")?,
        }
    }
    f.write_str("'")
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Node]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[(String, Node)]) -> fmt::Result {
    for (idx, (name, value)) in fields.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{name}={value}")?;
    }
    Ok(())
}
