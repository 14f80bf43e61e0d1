//! Purpose: Pre-compiled function definitions with captured source, and their registry.
//! Exports: `FunctionDef`, `FunctionRegistry`, `source_digest`, `function_def!`.
//! Role: Plugin-style materialization of decoded function references.
//! Invariants: No code is synthesized at runtime; a decoded reference resolves to a
//! callable that was compiled into the program and registered by name.
//! Invariants: When a reference carries source, its digest must match the registered one.
//! Notes: Digests ignore whitespace; `stringify!` spacing is not part of a definition.
#![allow(clippy::result_large_err)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::core::error::{Error, ErrorKind};
use crate::core::node::{FunctionRef, Node, short_name};

type Callable = Arc<dyn Fn(&[Node]) -> Result<Node, Error> + Send + Sync>;

/// A callable plus the source text it was compiled from.
#[derive(Clone)]
pub struct FunctionDef {
    qualname: String,
    source: String,
    params: Vec<String>,
    call: Callable,
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("qualname", &self.qualname)
            .field("params", &self.params)
            .field("source", &self.source)
            .finish()
    }
}

impl FunctionDef {
    pub fn new<F>(
        qualname: impl Into<String>,
        source: impl Into<String>,
        params: &[&str],
        call: F,
    ) -> Self
    where
        F: Fn(&[Node]) -> Result<Node, Error> + Send + Sync + 'static,
    {
        Self {
            qualname: qualname.into(),
            source: source.into(),
            params: params.iter().map(|param| param.to_string()).collect(),
            call: Arc::new(call),
        }
    }

    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    pub fn name(&self) -> &str {
        short_name(&self.qualname)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn digest(&self) -> String {
        source_digest(&self.source)
    }

    /// Reference carrying the captured source; encoders decide whether to write it.
    pub fn reference(&self) -> FunctionRef {
        FunctionRef::new(self.qualname.clone()).with_source(self.source.clone())
    }

    pub fn call(&self, args: &[Node]) -> Result<Node, Error> {
        if args.len() != self.arity() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!(
                    "expected {} argument(s), got {}",
                    self.arity(),
                    args.len()
                ))
                .with_tag(self.qualname.clone()));
        }
        (self.call)(args).map_err(|err| {
            if err.tag().is_some() {
                err
            } else {
                err.with_tag(self.qualname.clone())
            }
        })
    }
}

/// Hex SHA-256 over the non-whitespace characters of `source`.
pub fn source_digest(source: &str) -> String {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 4];
    for ch in source.chars().filter(|ch| !ch.is_whitespace()) {
        hasher.update(ch.encode_utf8(&mut buf).as_bytes());
    }
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, FunctionDef>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, def: FunctionDef) -> Result<(), Error> {
        if self.functions.contains_key(def.qualname()) {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message("function already registered")
                .with_tag(def.qualname()));
        }
        tracing::debug!(function = def.qualname(), arity = def.arity(), "registered function");
        self.functions.insert(def.qualname().to_string(), def);
        Ok(())
    }

    pub fn get(&self, qualname: &str) -> Option<&FunctionDef> {
        self.functions.get(qualname)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionDef> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Find a definition by qualified name, falling back to a unique short name.
    pub fn resolve(&self, reference: &FunctionRef) -> Result<&FunctionDef, Error> {
        if let Some(def) = self.functions.get(reference.qualname()) {
            return Ok(def);
        }
        let mut candidates = self
            .functions
            .values()
            .filter(|def| def.name() == reference.name());
        match (candidates.next(), candidates.next()) {
            (Some(def), None) => Ok(def),
            (Some(_), Some(_)) => Err(Error::new(ErrorKind::Usage)
                .with_message("function name is ambiguous")
                .with_tag(reference.qualname())
                .with_hint("Use the fully qualified name in the payload.")),
            (None, _) => Err(Error::new(ErrorKind::NotFound)
                .with_message("no function registered under this name")
                .with_tag(reference.qualname())),
        }
    }

    /// Resolve a decoded reference and check its captured source, if any.
    pub fn materialize(&self, reference: &FunctionRef) -> Result<&FunctionDef, Error> {
        let def = self.resolve(reference)?;
        if let Some(source) = reference.source() {
            if source_digest(source) != def.digest() {
                tracing::warn!(
                    function = def.qualname(),
                    "captured source does not match registered definition"
                );
                return Err(Error::new(ErrorKind::Corrupt)
                    .with_message("function source does not match the registered definition")
                    .with_tag(def.qualname())
                    .with_hint("Rebuild the payload from the current definition."));
            }
        }
        tracing::debug!(function = def.qualname(), "materialized function");
        Ok(def)
    }

    pub fn materialize_node(&self, node: &Node) -> Result<&FunctionDef, Error> {
        let reference = node.as_function().ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("expected a function reference, found {}", node.kind()))
        })?;
        self.materialize(reference)
    }
}

/// Define a function or closure and capture its source text as a `FunctionDef`.
///
/// A `-> Result<T>` return type lets the body fail with `picklebox::api::Error`.
///
/// ```
/// use picklebox::api::Node;
///
/// let area = picklebox::function_def!(fn area(w: i64, h: i64) -> i64 { w * h });
/// assert_eq!(area.call(&[Node::from(2), Node::from(3)]).unwrap(), Node::from(6));
///
/// let inc = picklebox::function_def!(inc = |y: i64| y + 1);
/// assert_eq!(inc.call(&[Node::from(1)]).unwrap(), Node::from(2));
///
/// let half = picklebox::function_def!(fn half(n: i64) -> Result<i64> {
///     n.checked_div(2).ok_or_else(|| picklebox::api::Error::new(picklebox::api::ErrorKind::Usage))
/// });
/// assert_eq!(half.call(&[Node::from(9)]).unwrap(), Node::from(4));
/// ```
#[macro_export]
macro_rules! function_def {
    (fn $name:ident($($arg:ident: $ty:ty),* $(,)?) -> Result<$ret:ty> $body:block) => {{
        fn $name($($arg: $ty),*) -> ::std::result::Result<$ret, $crate::api::Error> $body
        $crate::api::FunctionDef::new(
            concat!(module_path!(), "::", stringify!($name)),
            stringify!(fn $name($($arg: $ty),*) -> Result<$ret> $body),
            &[$(stringify!($arg)),*],
            move |args: &[$crate::api::Node]| {
                #[allow(unused_mut, unused_variables)]
                let mut rest = args.iter();
                $(
                    let $arg: $ty = $crate::api::extract_arg(rest.next(), stringify!($arg))?;
                )*
                Ok($crate::api::Node::from($name($($arg),*)?))
            },
        )
    }};
    (fn $name:ident($($arg:ident: $ty:ty),* $(,)?) -> $ret:ty $body:block) => {{
        fn $name($($arg: $ty),*) -> $ret $body
        $crate::api::FunctionDef::new(
            concat!(module_path!(), "::", stringify!($name)),
            stringify!(fn $name($($arg: $ty),*) -> $ret $body),
            &[$(stringify!($arg)),*],
            move |args: &[$crate::api::Node]| {
                #[allow(unused_mut, unused_variables)]
                let mut rest = args.iter();
                $(
                    let $arg: $ty = $crate::api::extract_arg(rest.next(), stringify!($arg))?;
                )*
                Ok($crate::api::Node::from($name($($arg),*)))
            },
        )
    }};
    ($name:ident = |$($arg:ident: $ty:ty),* $(,)?| $body:expr) => {{
        $crate::api::FunctionDef::new(
            concat!(module_path!(), "::", stringify!($name)),
            stringify!(|$($arg: $ty),*| $body),
            &[$(stringify!($arg)),*],
            move |args: &[$crate::api::Node]| {
                let $name = |$($arg: $ty),*| $body;
                #[allow(unused_mut, unused_variables)]
                let mut rest = args.iter();
                $(
                    let $arg: $ty = $crate::api::extract_arg(rest.next(), stringify!($arg))?;
                )*
                Ok($crate::api::Node::from($name($($arg),*)))
            },
        )
    }};
}
