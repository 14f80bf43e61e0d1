//! Purpose: Round-trip harness that encodes, decodes, and re-encodes a value.
//! Exports: `round_trip`, `RoundTrip`, `Divergence`, `field_presence`, `FieldPresence`.
//! Role: Shared equivalence checks for tests and the CLI `decode` report.
//! Invariants: Re-encoding a decoded value reproduces the first encoding byte for byte.
//! Invariants: Known divergences are reported, never silently treated as equality.
#![allow(clippy::result_large_err)]

use crate::core::codec::{DecodeOptions, EncodeOptions, decode_with, encode_with};
use crate::core::error::{Error, ErrorKind};
use crate::core::node::Node;

/// Documented ways a decoded value may legitimately differ from its original.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Divergence {
    NamedTupleIdentity,
    SharedReferenceAliasing,
}

impl Divergence {
    pub fn reason(self) -> &'static str {
        match self {
            Divergence::NamedTupleIdentity => {
                "named tuples decode as anonymous tuples; the declared type is not restored"
            }
            Divergence::SharedReferenceAliasing => {
                "shared containers decode as independent copies; aliasing is not restored"
            }
        }
    }

    pub fn detect(value: &Node) -> Vec<Divergence> {
        let mut found = Vec::new();
        if value.contains(&|node| matches!(node, Node::NamedTuple(_))) {
            found.push(Divergence::NamedTupleIdentity);
        }
        if value.contains(&|node| matches!(node, Node::Shared(_))) {
            found.push(Divergence::SharedReferenceAliasing);
        }
        found
    }
}

#[derive(Clone, Debug)]
pub struct RoundTrip {
    pub original: Node,
    pub options: EncodeOptions,
    pub encoded: String,
    pub decoded: Node,
    pub reencoded: String,
}

impl RoundTrip {
    /// `encode(decode(encode(x))) == encode(x)`.
    pub fn is_stable(&self) -> bool {
        self.encoded == self.reencoded
    }

    pub fn divergences(&self) -> Vec<Divergence> {
        Divergence::detect(&self.original)
    }

    /// Whether the decoded value should equal the original exactly.
    pub fn is_lossless(&self) -> bool {
        let drops_source = !self.options.encode_function_itself
            && self.original.contains(&|node| {
                node.as_function()
                    .is_some_and(|function| function.source().is_some())
            });
        let drops_nulls = !self.options.include_null_fields
            && self.original.contains(&|node| {
                node.as_object()
                    .is_some_and(|object| object.fields().iter().any(|(_, value)| value.is_null()))
            });
        let merges_keys = self.original.contains(&|node| match node {
            Node::Dict(entries) => entries
                .iter()
                .enumerate()
                .any(|(idx, (key, _))| entries[..idx].iter().any(|(seen, _)| seen == key)),
            _ => false,
        });
        self.divergences().is_empty() && !drops_source && !drops_nulls && !merges_keys
    }

    pub fn verify(&self) -> Result<(), Error> {
        if !self.is_stable() {
            return Err(Error::new(ErrorKind::Internal)
                .with_message("re-encoding a decoded value changed the payload")
                .with_hint(format!("first: {}; second: {}", self.encoded, self.reencoded)));
        }
        if self.is_lossless() && self.decoded != self.original {
            return Err(Error::new(ErrorKind::Internal).with_message(format!(
                "decoded value {} differs from original {}",
                self.decoded, self.original
            )));
        }
        Ok(())
    }
}

pub fn round_trip(value: &Node, options: &EncodeOptions) -> Result<RoundTrip, Error> {
    let encoded = encode_with(value, options)?;
    let decode_options = DecodeOptions::new().encode_function_itself(options.encode_function_itself);
    let decoded = decode_with(&encoded, &decode_options)?;
    let reencoded = encode_with(&decoded, options)?;
    Ok(RoundTrip {
        original: value.clone(),
        options: options.clone(),
        encoded,
        decoded,
        reencoded,
    })
}

/// Which names occur as substrings of an encoded payload.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldPresence {
    pub present: Vec<String>,
    pub absent: Vec<String>,
}

impl FieldPresence {
    pub fn is_present(&self, name: &str) -> bool {
        self.present.iter().any(|present| present == name)
    }

    pub fn all_present(&self) -> bool {
        self.absent.is_empty()
    }
}

pub fn field_presence<'a>(encoded: &str, names: impl IntoIterator<Item = &'a str>) -> FieldPresence {
    let mut presence = FieldPresence::default();
    for name in names {
        if encoded.contains(name) {
            presence.present.push(name.to_string());
        } else {
            presence.absent.push(name.to_string());
        }
    }
    presence
}

#[cfg(test)]
mod tests {
    use super::{Divergence, field_presence, round_trip};
    use crate::core::codec::EncodeOptions;
    use crate::core::node::{NamedTupleNode, Node, ObjectNode};

    #[test]
    fn primitives_are_lossless_and_stable() {
        for value in [
            Node::from("hello"),
            Node::from(42),
            Node::from(-1.5),
            Node::Bool(false),
            Node::Null,
        ] {
            let trip = round_trip(&value, &EncodeOptions::new()).expect("round trip");
            assert!(trip.is_lossless());
            trip.verify().expect("verify");
            assert_eq!(trip.decoded, value);
        }
    }

    #[test]
    fn named_tuple_reports_divergence_but_stays_stable() {
        let value = Node::from(NamedTupleNode::new("student").with_field("age", 21));
        let trip = round_trip(&value, &EncodeOptions::new()).expect("round trip");
        assert_eq!(trip.divergences(), vec![Divergence::NamedTupleIdentity]);
        assert!(!trip.is_lossless());
        trip.verify().expect("verify");
        assert_ne!(trip.decoded.type_name(), value.type_name());
    }

    #[test]
    fn dropped_nulls_are_not_lossless() {
        let value = Node::from(ObjectNode::new("t.P").with_field("phone", Node::Null));
        let options = EncodeOptions::new().include_null_fields(false);
        let trip = round_trip(&value, &options).expect("round trip");
        assert!(!trip.is_lossless());
        trip.verify().expect("verify");
        assert!(trip.decoded.field_names().is_empty());
    }

    #[test]
    fn repeated_dict_keys_are_merged_or_reported() {
        let built = Node::dict([("a", Node::from(1)), ("b", Node::from(2)), ("a", Node::from(3))]);
        assert_eq!(built, Node::Dict(vec![("a".into(), Node::from(3)), ("b".into(), Node::from(2))]));
        let trip = round_trip(&built, &EncodeOptions::new()).expect("round trip");
        assert!(trip.is_lossless());
        trip.verify().expect("verify");

        let raw = Node::Dict(vec![("a".into(), Node::from(1)), ("a".into(), Node::from(2))]);
        let trip = round_trip(&raw, &EncodeOptions::new()).expect("round trip");
        assert!(!trip.is_lossless());
        trip.verify().expect("verify");
        assert_eq!(trip.decoded.get_item("a"), Some(Node::from(2)));
    }

    #[test]
    fn presence_splits_names() {
        let presence = field_presence(r#"{"a":1,"bb":null}"#, ["a", "bb", "c"]);
        assert_eq!(presence.present, vec!["a", "bb"]);
        assert_eq!(presence.absent, vec!["c"]);
        assert!(presence.is_present("bb"));
        assert!(!presence.all_present());
    }

    #[test]
    fn divergence_reasons_are_distinct() {
        assert_ne!(
            Divergence::NamedTupleIdentity.reason(),
            Divergence::SharedReferenceAliasing.reason()
        );
    }
}
