//! Purpose: Centralize the reserved keys of the encoded representation.
//! Exports: Tag key constants, `is_reserved_key`, `reserved_key_error`.
//! Role: Shared policy for the encoder and decoder so both agree on tag spelling.
//! Invariants: Tag keys are additive; renaming one breaks every stored payload.
//! Invariants: User data (dict keys, object field names) never uses the `pb/` prefix.

use crate::core::error::{Error, ErrorKind};

pub const TAG_PREFIX: &str = "pb/";
pub const OBJECT_KEY: &str = "pb/object";
pub const ENUM_KEY: &str = "pb/enum";
pub const TUPLE_KEY: &str = "pb/tuple";
pub const TYPE_KEY: &str = "pb/type";
pub const FUNCTION_KEY: &str = "pb/function";
pub const CODE_KEY: &str = "pb/code";

pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(TAG_PREFIX)
}

pub fn reserved_key_error(key: &str) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message(format!("key {key:?} uses the reserved {TAG_PREFIX} prefix"))
        .with_hint("Rename the field or dict key; `pb/` keys are reserved for type tags.")
}
