//! Purpose: Define the public Rust API boundary for picklebox.
//! Exports: Value model, codec entrypoints, registries, harness, and fixture helpers.
//! Role: Public, additive-only surface; hides internal module layout.
//! Invariants: This module is the only public path to core types.
//! Invariants: Internal modules remain private and are not directly exposed.

pub mod fixture;
pub mod harness;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::codec::{
    DecodeOptions, EncodeOptions, decode, decode_pickle, decode_with, encode, encode_pickle,
    encode_with, from_json, to_json,
};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::format;
pub use crate::core::functions::{FunctionDef, FunctionRegistry, source_digest};
pub use crate::core::node::{
    EnumMember, Extract, FunctionRef, NamedTupleNode, Node, ObjectNode, TypeRef, extract_arg,
};
pub use crate::core::registry::{Attributes, Factory, Pickle, TypeRegistry};
pub use fixture::{FixtureFile, FunctionFixture, ensure_fixture};
pub use harness::{Divergence, FieldPresence, RoundTrip, field_presence, round_trip};
