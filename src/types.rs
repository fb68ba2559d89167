//! Canonical wire-type descriptors.
//!
//! A [`TypeDescriptor`] is an immutable tree: either a primitive kind or a
//! named object type with ordered members. Object types are shared behind an
//! `Arc` so that every operation slot referring to the same native type points
//! at one [`ObjectType`].

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Primitive wire kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    String,
    Number,
    Boolean,
}

impl Kind {
    /// Parse a kind name. Unknown names fall back to `String`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            _ => Self::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    /// XSD built-in type name for this kind.
    pub fn xsd_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "int",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire type of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Primitive(Kind),
    Object(Arc<ObjectType>),
}

impl TypeDescriptor {
    pub const STRING: TypeDescriptor = TypeDescriptor::Primitive(Kind::String);
    pub const NUMBER: TypeDescriptor = TypeDescriptor::Primitive(Kind::Number);
    pub const BOOLEAN: TypeDescriptor = TypeDescriptor::Primitive(Kind::Boolean);

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    pub fn as_object(&self) -> Option<&Arc<ObjectType>> {
        match self {
            Self::Object(object) => Some(object),
            Self::Primitive(_) => None,
        }
    }

    /// Name used in type references: the object type name or the kind name.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Primitive(kind) => kind.as_str(),
            Self::Object(object) => &object.type_name,
        }
    }

    /// Name used in schema references (`xsd:` for primitives, `tns:` for objects).
    pub fn schema_name(&self) -> &str {
        match self {
            Self::Primitive(kind) => kind.xsd_name(),
            Self::Object(object) => &object.type_name,
        }
    }

    /// Namespace prefix used when referencing this type from a WSDL part.
    pub fn schema_prefix(&self) -> &'static str {
        if self.is_object() {
            "tns"
        } else {
            "xsd"
        }
    }
}

impl Default for TypeDescriptor {
    fn default() -> Self {
        Self::STRING
    }
}

/// A named object type with ordered members.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    /// Schema-unique type name
    pub type_name: String,
    /// Builds a fresh instance carrying member defaults
    pub factory: Factory,
    /// Members in declaration order
    pub members: Vec<Member>,
}

impl ObjectType {
    pub fn member(&self, name: &str) -> Option<&TypeDescriptor> {
        self.members
            .iter()
            .find(|m| m.name == name)
            .map(|m| &m.descriptor)
    }

    /// Instantiate via the factory.
    pub fn instantiate(&self) -> Map<String, Value> {
        self.factory.instantiate()
    }
}

/// A named member of an object type.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub descriptor: TypeDescriptor,
}

impl Member {
    pub fn new(name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
        }
    }
}

/// Default value of a member slot.
#[derive(Debug, Clone)]
pub enum Prototype {
    /// No default; described as a string member
    Null,
    /// Scalar default; its runtime type gives the member kind
    Scalar(Value),
    /// Nested object type
    Object(Factory),
}

impl From<&str> for Prototype {
    fn from(value: &str) -> Self {
        Self::Scalar(Value::String(value.to_string()))
    }
}

impl From<String> for Prototype {
    fn from(value: String) -> Self {
        Self::Scalar(Value::String(value))
    }
}

impl From<i64> for Prototype {
    fn from(value: i64) -> Self {
        Self::Scalar(Value::from(value))
    }
}

impl From<i32> for Prototype {
    fn from(value: i32) -> Self {
        Self::Scalar(Value::from(value))
    }
}

impl From<f64> for Prototype {
    fn from(value: f64) -> Self {
        Self::Scalar(Value::from(value))
    }
}

impl From<bool> for Prototype {
    fn from(value: bool) -> Self {
        Self::Scalar(Value::Bool(value))
    }
}

impl From<Factory> for Prototype {
    fn from(value: Factory) -> Self {
        Self::Object(value)
    }
}

/// A member slot as exposed by a [`Describe`] implementation.
#[derive(Debug, Clone)]
pub struct Slot {
    pub name: &'static str,
    pub prototype: Prototype,
}

impl Slot {
    pub fn new(name: &'static str, prototype: impl Into<Prototype>) -> Self {
        Self {
            name,
            prototype: prototype.into(),
        }
    }

    /// A slot without a default value.
    pub fn null(name: &'static str) -> Self {
        Self {
            name,
            prototype: Prototype::Null,
        }
    }

    /// A slot holding a nested object type.
    pub fn object<T: Describe>(name: &'static str) -> Self {
        Self {
            name,
            prototype: Prototype::Object(Factory::of::<T>()),
        }
    }
}

/// Schema contract implemented by every marshaled domain type.
///
/// ```ignore
/// struct MyObject;
///
/// impl Describe for MyObject {
///     fn type_name() -> &'static str {
///         "MyObject"
///     }
///
///     fn slots() -> Vec<Slot> {
///         vec![Slot::new("concated", ""), Slot::new("incremented", 0)]
///     }
/// }
/// ```
pub trait Describe {
    /// Schema-unique name of the type.
    fn type_name() -> &'static str;

    /// Member slots in declaration order.
    fn slots() -> Vec<Slot>;
}

/// Constructor reference for an object type.
///
/// Identity is the type name: two factories with the same name describe the
/// same schema type.
#[derive(Clone, Copy)]
pub struct Factory {
    name: &'static str,
    slots: fn() -> Vec<Slot>,
}

impl Factory {
    pub fn of<T: Describe>() -> Self {
        Self {
            name: T::type_name(),
            slots: T::slots,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn slots(&self) -> Vec<Slot> {
        (self.slots)()
    }

    /// Build an instance populated with every slot's default.
    pub fn instantiate(&self) -> Map<String, Value> {
        self.slots()
            .into_iter()
            .map(|slot| {
                let value = match slot.prototype {
                    Prototype::Null => Value::Null,
                    Prototype::Scalar(value) => value,
                    Prototype::Object(factory) => Value::Object(factory.instantiate()),
                };
                (slot.name.to_string(), value)
            })
            .collect()
    }
}

impl PartialEq for Factory {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Factory").field(&self.name).finish()
    }
}
