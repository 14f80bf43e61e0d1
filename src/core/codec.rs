//! Purpose: Encode `Node` values to tagged JSON text and decode them back.
//! Exports: `EncodeOptions`, `DecodeOptions`, `encode`, `encode_with`, `decode`, `decode_with`,
//! `to_json`, `from_json`, `encode_pickle`, `decode_pickle`.
//! Role: The serialization library the round-trip harness characterizes.
//! Invariants: `encode(decode(encode(x))) == encode(x)` for every shape the encoder accepts.
//! Invariants: Named tuples lose their type name and field names; shared containers are
//! written by value at each reference and decode as independent copies.
//! Invariants: A shared container that reaches itself is rejected as `Unsupported`.
//! Invariants: Malformed payloads fail at decode with `ErrorKind::Corrupt`.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Number, Value};

use crate::core::error::{Error, ErrorKind};
use crate::core::format::{
    CODE_KEY, ENUM_KEY, FUNCTION_KEY, OBJECT_KEY, TUPLE_KEY, TYPE_KEY, is_reserved_key,
    reserved_key_error,
};
use crate::core::node::{EnumMember, FunctionRef, Node, ObjectNode, TypeRef};
use crate::core::registry::Pickle;
use crate::json::parse;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncodeOptions {
    /// Write object fields whose value is `Null`.
    pub include_null_fields: bool,
    /// Write a function's captured source next to its name.
    pub encode_function_itself: bool,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self {
            include_null_fields: true,
            encode_function_itself: false,
        }
    }

    pub fn include_null_fields(mut self, include: bool) -> Self {
        self.include_null_fields = include;
        self
    }

    pub fn encode_function_itself(mut self, enabled: bool) -> Self {
        self.encode_function_itself = enabled;
        self
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DecodeOptions {
    /// Keep `pb/code` source on decoded function references.
    pub encode_function_itself: bool,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode_function_itself(mut self, enabled: bool) -> Self {
        self.encode_function_itself = enabled;
        self
    }
}

pub fn encode(value: &Node) -> Result<String, Error> {
    encode_with(value, &EncodeOptions::new())
}

pub fn encode_with(value: &Node, options: &EncodeOptions) -> Result<String, Error> {
    let json = to_json(value, options)?;
    let text = serde_json::to_string(&json).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to serialize encoded value")
            .with_source(err)
    })?;
    tracing::debug!(kind = value.kind(), bytes = text.len(), "encoded value");
    Ok(text)
}

pub fn decode(text: &str) -> Result<Node, Error> {
    decode_with(text, &DecodeOptions::new())
}

pub fn decode_with(text: &str, options: &DecodeOptions) -> Result<Node, Error> {
    let json: Value = parse::from_str(text).map_err(|err| {
        let hint = parse::hint_for_error(&err, "codec.decode");
        Error::new(ErrorKind::Corrupt)
            .with_message("malformed payload")
            .with_hint(hint)
            .with_source(err)
    })?;
    let node = from_json(&json, options)?;
    tracing::debug!(kind = node.kind(), bytes = text.len(), "decoded value");
    Ok(node)
}

pub fn encode_pickle<T: Pickle>(value: &T, options: &EncodeOptions) -> Result<String, Error> {
    encode_with(&value.to_node(), options)
}

pub fn decode_pickle<T: Pickle>(text: &str) -> Result<T, Error> {
    T::from_node(&decode(text)?)
}

pub fn to_json(value: &Node, options: &EncodeOptions) -> Result<Value, Error> {
    value_json(value, options, &mut Vec::new())
}

/// Shared containers on the current encode path.
type Active = Vec<*const RefCell<Node>>;

fn value_json(value: &Node, options: &EncodeOptions, active: &mut Active) -> Result<Value, Error> {
    match value {
        Node::Null => Ok(Value::Null),
        Node::Bool(flag) => Ok(Value::Bool(*flag)),
        Node::Int(number) => Ok(Value::from(*number)),
        Node::Float(number) => Number::from_f64(*number).map(Value::Number).ok_or_else(|| {
            Error::new(ErrorKind::Unsupported)
                .with_message(format!("non-finite float {number} has no JSON form"))
        }),
        Node::Str(text) => Ok(Value::String(text.clone())),
        Node::List(items) => items_json(items, options, active).map(Value::Array),
        Node::Tuple(items) => tagged(TUPLE_KEY, Value::Array(items_json(items, options, active)?)),
        Node::NamedTuple(tuple) => {
            let values = tuple
                .values()
                .map(|item| value_json(item, options, active))
                .collect::<Result<Vec<_>, _>>()?;
            tagged(TUPLE_KEY, Value::Array(values))
        }
        Node::Dict(entries) => {
            let mut map = Map::new();
            for (key, item) in entries {
                if is_reserved_key(key) {
                    return Err(reserved_key_error(key));
                }
                map.insert(key.clone(), value_json(item, options, active)?);
            }
            Ok(Value::Object(map))
        }
        Node::Shared(cell) => {
            let ptr = Rc::as_ptr(cell);
            if active.contains(&ptr) {
                return Err(Error::new(ErrorKind::Unsupported)
                    .with_message("shared container contains itself")
                    .with_hint("Break the cycle before encoding; only acyclic sharing is supported."));
            }
            active.push(ptr);
            let result = value_json(&cell.borrow(), options, active);
            active.pop();
            result
        }
        Node::Object(object) => object_json(object, options, active),
        Node::Member(member) => {
            if member.enum_tag().is_empty() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("enum tag is empty")
                    .with_tag(member.member()));
            }
            if member.member().contains('.') || member.member().is_empty() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("invalid enum member name {:?}", member.member()))
                    .with_tag(member.enum_tag()));
            }
            tagged(
                ENUM_KEY,
                Value::String(format!("{}.{}", member.enum_tag(), member.member())),
            )
        }
        Node::Type(type_ref) => tagged(TYPE_KEY, Value::String(type_ref.tag().to_string())),
        Node::Function(function) => function_json(function, options),
    }
}

fn items_json(items: &[Node], options: &EncodeOptions, active: &mut Active) -> Result<Vec<Value>, Error> {
    items.iter().map(|item| value_json(item, options, active)).collect()
}

fn tagged(key: &str, value: Value) -> Result<Value, Error> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Ok(Value::Object(map))
}

fn object_json(
    object: &ObjectNode,
    options: &EncodeOptions,
    active: &mut Active,
) -> Result<Value, Error> {
    let mut map = Map::new();
    map.insert(OBJECT_KEY.to_string(), Value::String(object.tag().to_string()));
    for (name, item) in object.fields() {
        if is_reserved_key(name) {
            return Err(reserved_key_error(name).with_tag(object.tag()));
        }
        if item.is_null() && !options.include_null_fields {
            continue;
        }
        map.insert(name.clone(), value_json(item, options, active)?);
    }
    Ok(Value::Object(map))
}

fn function_json(function: &FunctionRef, options: &EncodeOptions) -> Result<Value, Error> {
    let mut map = Map::new();
    map.insert(
        FUNCTION_KEY.to_string(),
        Value::String(function.qualname().to_string()),
    );
    if options.encode_function_itself {
        let source = function.source().ok_or_else(|| {
            Error::new(ErrorKind::Unsupported)
                .with_message("function source was not captured")
                .with_tag(function.qualname())
                .with_hint("Define the function with `function_def!` so its source is recorded.")
        })?;
        map.insert(CODE_KEY.to_string(), Value::String(source.to_string()));
    }
    Ok(Value::Object(map))
}

pub fn from_json(value: &Value, options: &DecodeOptions) -> Result<Node, Error> {
    match value {
        Value::Null => Ok(Node::Null),
        Value::Bool(flag) => Ok(Node::Bool(*flag)),
        Value::Number(number) => number_node(number),
        Value::String(text) => Ok(Node::Str(text.clone())),
        Value::Array(items) => items
            .iter()
            .map(|item| from_json(item, options))
            .collect::<Result<Vec<_>, _>>()
            .map(Node::List),
        Value::Object(map) => object_node(map, options),
    }
}

fn number_node(number: &Number) -> Result<Node, Error> {
    if let Some(int) = number.as_i64() {
        return Ok(Node::Int(int));
    }
    if number.is_u64() {
        return Err(Error::new(ErrorKind::Unsupported)
            .with_message(format!("integer {number} exceeds the signed 64-bit range")));
    }
    number.as_f64().map(Node::Float).ok_or_else(|| {
        Error::new(ErrorKind::Corrupt).with_message(format!("unrepresentable number {number}"))
    })
}

fn corrupt(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Corrupt).with_message(message)
}

fn sole_tag<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a Value, Error> {
    if map.len() != 1 {
        return Err(corrupt(format!("{key} must be the only key of its object")));
    }
    map.get(key)
        .ok_or_else(|| corrupt(format!("missing {key} value")))
}

fn tag_string<'a>(value: &'a Value, key: &str) -> Result<&'a str, Error> {
    value
        .as_str()
        .ok_or_else(|| corrupt(format!("{key} value must be a string")))
}

fn object_node(map: &Map<String, Value>, options: &DecodeOptions) -> Result<Node, Error> {
    if let Some(tag) = map.get(OBJECT_KEY) {
        let tag = tag_string(tag, OBJECT_KEY)?;
        let mut object = ObjectNode::new(tag);
        for (name, item) in map {
            if name == OBJECT_KEY {
                continue;
            }
            if is_reserved_key(name) {
                return Err(corrupt(format!("unexpected tag {name:?} inside an object")).with_tag(tag));
            }
            object.set_field(name.clone(), from_json(item, options)?);
        }
        return Ok(Node::Object(object));
    }

    if map.contains_key(ENUM_KEY) {
        let path = tag_string(sole_tag(map, ENUM_KEY)?, ENUM_KEY)?;
        let (enum_tag, member) = path
            .rsplit_once('.')
            .filter(|(enum_tag, member)| !enum_tag.is_empty() && !member.is_empty())
            .ok_or_else(|| corrupt(format!("enum reference {path:?} is not `Enum.MEMBER`")))?;
        return Ok(Node::Member(EnumMember::new(enum_tag, member)));
    }

    if map.contains_key(TUPLE_KEY) {
        let items = sole_tag(map, TUPLE_KEY)?
            .as_array()
            .ok_or_else(|| corrupt(format!("{TUPLE_KEY} value must be an array")))?;
        let items = items
            .iter()
            .map(|item| from_json(item, options))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Node::Tuple(items));
    }

    if map.contains_key(TYPE_KEY) {
        let tag = tag_string(sole_tag(map, TYPE_KEY)?, TYPE_KEY)?;
        return Ok(Node::Type(TypeRef::new(tag)));
    }

    if let Some(qualname) = map.get(FUNCTION_KEY) {
        let qualname = tag_string(qualname, FUNCTION_KEY)?;
        if let Some(extra) = map.keys().find(|key| *key != FUNCTION_KEY && *key != CODE_KEY) {
            return Err(corrupt(format!("unexpected key {extra:?} in a function reference"))
                .with_tag(qualname));
        }
        let mut function = FunctionRef::new(qualname);
        if let Some(code) = map.get(CODE_KEY) {
            let code = tag_string(code, CODE_KEY)?;
            if options.encode_function_itself {
                function = function.with_source(code);
            }
        }
        return Ok(Node::Function(function));
    }

    let mut entries = Vec::with_capacity(map.len());
    for (key, item) in map {
        if is_reserved_key(key) {
            return Err(corrupt(format!("unknown tag {key:?}")));
        }
        entries.push((key.clone(), from_json(item, options)?));
    }
    Ok(Node::Dict(entries))
}

#[cfg(test)]
mod tests {
    use super::{DecodeOptions, EncodeOptions, decode, decode_with, encode, encode_with};
    use crate::core::error::ErrorKind;
    use crate::core::node::{EnumMember, FunctionRef, NamedTupleNode, Node, ObjectNode, TypeRef};

    #[test]
    fn object_tag_is_written_first() {
        let node = Node::from(ObjectNode::new("t.Point").with_field("x", 1).with_field("y", 2));
        let text = encode(&node).expect("encode");
        assert_eq!(text, r#"{"pb/object":"t.Point","x":1,"y":2}"#);
    }

    #[test]
    fn tagged_shapes_have_stable_spelling() {
        let member = Node::from(EnumMember::new("t.Type", "ONE"));
        assert_eq!(encode(&member).expect("enum"), r#"{"pb/enum":"t.Type.ONE"}"#);

        let type_ref = Node::from(TypeRef::new("t.Dummy"));
        assert_eq!(encode(&type_ref).expect("type"), r#"{"pb/type":"t.Dummy"}"#);

        let tuple = Node::tuple([Node::from(1), Node::from("a")]);
        assert_eq!(encode(&tuple).expect("tuple"), r#"{"pb/tuple":[1,"a"]}"#);
    }

    #[test]
    fn null_fields_are_dropped_at_depth_but_dict_nulls_stay() {
        let inner = ObjectNode::new("t.Inner").with_field("gone", Node::Null);
        let node = Node::from(
            ObjectNode::new("t.Outer")
                .with_field("inner", inner)
                .with_field("data", Node::dict([("kept", Node::Null)])),
        );
        let options = EncodeOptions::new().include_null_fields(false);
        let text = encode_with(&node, &options).expect("encode");
        assert!(!text.contains("gone"));
        assert!(text.contains(r#""kept":null"#));
    }

    #[test]
    fn function_source_requires_capture() {
        let bare = Node::from(FunctionRef::new("m::f"));
        let options = EncodeOptions::new().encode_function_itself(true);
        let err = encode_with(&bare, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(encode(&bare).expect("reference"), r#"{"pb/function":"m::f"}"#);
    }

    #[test]
    fn decode_drops_source_unless_requested() {
        let text = r#"{"pb/function":"m::f","pb/code":"fn f() {}"}"#;
        let plain = decode(text).expect("decode");
        assert_eq!(plain, Node::from(FunctionRef::new("m::f")));

        let options = DecodeOptions::new().encode_function_itself(true);
        let kept = decode_with(text, &options).expect("decode");
        assert_eq!(kept.as_function().and_then(|f| f.source()), Some("fn f() {}"));
    }

    #[test]
    fn named_tuple_decodes_as_anonymous_tuple() {
        let tuple = Node::from(
            NamedTupleNode::new("student")
                .with_field("name", "Sikiru")
                .with_field("age", 21),
        );
        let text = encode(&tuple).expect("encode");
        let decoded = decode(&text).expect("decode");
        assert_eq!(decoded, Node::tuple([Node::from("Sikiru"), Node::from(21)]));
        assert_eq!(encode(&decoded).expect("reencode"), text);
    }

    #[test]
    fn reserved_keys_in_user_data_are_rejected() {
        let dict = Node::dict([("pb/object", Node::from(1))]);
        assert_eq!(encode(&dict).unwrap_err().kind(), ErrorKind::Usage);

        let err = decode(r#"{"pb/bogus":1}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn malformed_tags_are_corrupt() {
        let cases = [
            r#"{"pb/enum":"NOPE"}"#,
            r#"{"pb/enum":"t.Type.ONE","x":1}"#,
            r#"{"pb/tuple":3}"#,
            r#"{"pb/type":1}"#,
            r#"{"pb/object":"t.A","pb/code":"x"}"#,
            r#"{"pb/function":"m::f","extra":1}"#,
            r#"{"a":"#,
        ];
        for case in cases {
            let err = decode(case).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Corrupt, "case {case}");
        }
    }

    #[test]
    fn enum_members_need_a_tag_and_a_plain_name() {
        for (tag, member) in [("", "ONE"), ("t.Type", ""), ("t.Type", "A.B")] {
            let err = encode(&Node::from(EnumMember::new(tag, member))).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Usage, "{tag:?}.{member:?}");
        }
    }

    #[test]
    fn self_referencing_shared_container_is_unsupported() {
        let shared = Node::shared(Node::dict::<String>([]));
        let mut handle = shared.clone();
        handle.set_item("me", shared.clone()).expect("set");
        let err = encode(&shared).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        if let Node::Shared(cell) = &shared {
            cell.borrow_mut().set_item("me", Node::Null).expect("break cycle");
        }
        assert_eq!(encode(&shared).expect("acyclic"), r#"{"me":null}"#);
    }

    #[test]
    fn repeated_sharing_without_a_cycle_encodes_by_value() {
        let shared = Node::shared(Node::dict([("k", Node::from(1))]));
        let node = Node::list([shared.clone(), Node::list([shared])]);
        assert_eq!(encode(&node).expect("encode"), r#"[{"k":1},[{"k":1}]]"#);
    }

    #[test]
    fn non_finite_and_oversized_numbers_are_unsupported() {
        let err = encode(&Node::Float(f64::NAN)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        let err = decode("18446744073709551615").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn malformed_payload_hint_names_the_category() {
        let err = decode("[1,").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert!(err.hint().unwrap_or_default().contains("parse category: eof"));
    }
}
