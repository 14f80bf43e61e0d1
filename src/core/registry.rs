//! Purpose: Resolve decoded class references to constructors supplied by the caller.
//! Exports: `Pickle`, `Attributes`, `TypeRegistry`, `Factory`.
//! Role: Stand-in for dynamic class loading; decode yields a tag, the registry yields a factory.
//! Invariants: A tag maps to exactly one constructor; re-registration is rejected.
//! Invariants: `Factory<T>` only exists for a tag registered as `T`.
#![allow(clippy::result_large_err)]

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::core::error::{Error, ErrorKind};
use crate::core::node::{Node, ObjectNode, TypeRef};

/// A Rust type with a stable tag and a `Node` form.
pub trait Pickle: Sized {
    const TYPE_TAG: &'static str;

    fn to_node(&self) -> Node;

    fn from_node(node: &Node) -> Result<Self, Error>;

    /// Class reference for this type.
    fn type_ref() -> TypeRef {
        TypeRef::new(Self::TYPE_TAG)
    }
}

/// Named attribute access, including accessors that front a private field.
pub trait Attributes {
    fn get_attr(&self, name: &str) -> Option<Node>;

    fn set_attr(&mut self, name: &str, value: Node) -> Result<(), Error>;
}

impl Attributes for ObjectNode {
    fn get_attr(&self, name: &str) -> Option<Node> {
        self.field(name).cloned()
    }

    fn set_attr(&mut self, name: &str, value: Node) -> Result<(), Error> {
        self.set_field(name, value);
        Ok(())
    }
}

type Constructor = Arc<dyn Fn(&[Node]) -> Result<Box<dyn Any>, Error> + Send + Sync>;

#[derive(Clone, Default)]
pub struct TypeRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("tags", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T, F>(&mut self, construct: F) -> Result<(), Error>
    where
        T: Pickle + 'static,
        F: Fn(&[Node]) -> Result<T, Error> + Send + Sync + 'static,
    {
        if self.constructors.contains_key(T::TYPE_TAG) {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message("type tag already registered")
                .with_tag(T::TYPE_TAG));
        }
        let erased: Constructor =
            Arc::new(move |args: &[Node]| construct(args).map(|value| Box::new(value) as Box<dyn Any>));
        self.constructors.insert(T::TYPE_TAG.to_string(), erased);
        tracing::debug!(tag = T::TYPE_TAG, "registered type");
        Ok(())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Resolve a decoded class reference to a typed factory.
    pub fn factory<T: Pickle + 'static>(&self, type_ref: &TypeRef) -> Result<Factory<T>, Error> {
        let construct = self.constructors.get(type_ref.tag()).ok_or_else(|| {
            Error::new(ErrorKind::NotFound)
                .with_message("no constructor registered for type")
                .with_tag(type_ref.tag())
                .with_hint("Register the type with `TypeRegistry::register` before decoding.")
        })?;
        if type_ref.tag() != T::TYPE_TAG {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("class reference is not {}", T::TYPE_TAG))
                .with_tag(type_ref.tag()));
        }
        Ok(Factory {
            tag: type_ref.tag().to_string(),
            construct: Arc::clone(construct),
            marker: PhantomData,
        })
    }

    /// Resolve a decoded node that must be a class reference.
    pub fn factory_for_node<T: Pickle + 'static>(&self, node: &Node) -> Result<Factory<T>, Error> {
        let type_ref = node.as_type().ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("expected a class reference, found {}", node.kind()))
        })?;
        self.factory(type_ref)
    }
}

/// Constructor for `T` obtained from a decoded class reference.
pub struct Factory<T> {
    tag: String,
    construct: Constructor,
    marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Factory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory").field("tag", &self.tag).finish()
    }
}

impl<T: Pickle + 'static> Factory<T> {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn call(&self, args: &[Node]) -> Result<T, Error> {
        let value = (self.construct)(args)?;
        value.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
            Error::new(ErrorKind::Internal)
                .with_message("constructor produced a value of another type")
                .with_tag(self.tag.clone())
        })
    }
}
