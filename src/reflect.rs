//! Type and signature reflection.
//!
//! Turns type hints into [`TypeDescriptor`] trees and derives default operation
//! inputs from a declared parameter list.

use crate::types::{Describe, Factory, Kind, Member, ObjectType, Prototype, TypeDescriptor};
use serde_json::Value;
use std::sync::Arc;

/// Anything a descriptor can be derived from.
#[derive(Debug, Clone, Default)]
pub enum TypeHint {
    /// No hint: string
    #[default]
    Default,
    /// A primitive kind name such as `"number"`
    Kind(String),
    /// An explicit descriptor, used as is
    Descriptor(TypeDescriptor),
    /// A structural factory, walked member by member
    Factory(Factory),
}

impl TypeHint {
    pub fn of<T: Describe>() -> Self {
        Self::Factory(Factory::of::<T>())
    }
}

impl From<&str> for TypeHint {
    fn from(name: &str) -> Self {
        Self::Kind(name.to_string())
    }
}

impl From<Option<&str>> for TypeHint {
    fn from(name: Option<&str>) -> Self {
        name.map(TypeHint::from).unwrap_or_default()
    }
}

impl From<Kind> for TypeHint {
    fn from(kind: Kind) -> Self {
        Self::Descriptor(TypeDescriptor::Primitive(kind))
    }
}

impl From<TypeDescriptor> for TypeHint {
    fn from(descriptor: TypeDescriptor) -> Self {
        Self::Descriptor(descriptor)
    }
}

impl From<Factory> for TypeHint {
    fn from(factory: Factory) -> Self {
        Self::Factory(factory)
    }
}

/// Resolve a hint into a descriptor. Never fails: unknown kinds become strings.
pub fn describe_type(hint: impl Into<TypeHint>) -> TypeDescriptor {
    match hint.into() {
        TypeHint::Default => TypeDescriptor::STRING,
        TypeHint::Kind(name) => TypeDescriptor::Primitive(Kind::from_name(&name)),
        TypeHint::Descriptor(descriptor) => descriptor,
        TypeHint::Factory(factory) => TypeDescriptor::Object(Arc::new(describe_factory(factory))),
    }
}

fn describe_factory(factory: Factory) -> ObjectType {
    let members = factory
        .slots()
        .into_iter()
        .map(|slot| {
            let descriptor = match slot.prototype {
                Prototype::Object(nested) => TypeDescriptor::Object(Arc::new(describe_factory(nested))),
                Prototype::Scalar(value) => TypeDescriptor::Primitive(kind_of(&value)),
                Prototype::Null => TypeDescriptor::STRING,
            };
            Member::new(slot.name, descriptor)
        })
        .collect();

    ObjectType {
        type_name: factory.name().to_string(),
        factory,
        members,
    }
}

/// Infer a kind from a default value's runtime type.
fn kind_of(value: &Value) -> Kind {
    match value {
        Value::Number(_) => Kind::Number,
        Value::Bool(_) => Kind::Boolean,
        _ => Kind::String,
    }
}

/// Derive default inputs from a declared signature text.
///
/// Takes the parameter list of the first parenthesis pair, splits it on
/// top-level commas and gives every parameter the string descriptor.
/// `name: Type` annotations and a leading `mut` are dropped, so
/// `stringify!(fn add(a: f64, m: HashMap<String, i64>))` yields `a` and `m`.
pub fn derive_inputs(signature: &str) -> Vec<(String, TypeDescriptor)> {
    let Some(open) = signature.find('(') else {
        return Vec::new();
    };
    let Some(params) = split_parameters(&signature[open + 1..]) else {
        return Vec::new();
    };

    params
        .iter()
        .filter_map(|param| {
            let name = param.split(':').next().unwrap_or("").trim();
            let name = name.strip_prefix("mut ").unwrap_or(name).trim();
            if name.is_empty() {
                None
            } else {
                Some((name.to_string(), TypeDescriptor::STRING))
            }
        })
        .collect()
}

/// Split a parameter list up to its closing parenthesis. `None` if unclosed.
fn split_parameters(list: &str) -> Option<Vec<String>> {
    let mut params = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut prev = '\0';

    for c in list.chars() {
        match c {
            '(' | '<' | '[' => depth += 1,
            // `->` in a nested fn type
            '>' if prev == '-' => {}
            ')' | '>' | ']' if depth > 0 => depth -= 1,
            ')' => {
                params.push(current);
                return Some(params);
            }
            ',' if depth == 0 => {
                params.push(std::mem::take(&mut current));
                prev = c;
                continue;
            }
            _ => {}
        }
        current.push(c);
        prev = c;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Slot;

    struct Inner;

    impl Describe for Inner {
        fn type_name() -> &'static str {
            "Inner"
        }

        fn slots() -> Vec<Slot> {
            vec![Slot::new("flag", false)]
        }
    }

    struct Outer;

    impl Describe for Outer {
        fn type_name() -> &'static str {
            "Outer"
        }

        fn slots() -> Vec<Slot> {
            vec![
                Slot::new("name", ""),
                Slot::new("count", 0),
                Slot::null("comment"),
                Slot::object::<Inner>("inner"),
            ]
        }
    }

    #[test]
    fn test_default_hint_is_string() {
        assert_eq!(describe_type(TypeHint::Default), TypeDescriptor::STRING);
        assert_eq!(describe_type(None::<&str>), TypeDescriptor::STRING);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(describe_type("number"), TypeDescriptor::NUMBER);
        assert_eq!(describe_type("boolean"), TypeDescriptor::BOOLEAN);
        assert_eq!(describe_type("decimal"), TypeDescriptor::STRING);
    }

    #[test]
    fn test_explicit_descriptor_passes_through() {
        assert_eq!(describe_type(TypeDescriptor::NUMBER), TypeDescriptor::NUMBER);
        assert_eq!(describe_type(Kind::Boolean), TypeDescriptor::BOOLEAN);
    }

    #[test]
    fn test_factory_walks_members() {
        let descriptor = describe_type(TypeHint::of::<Outer>());
        let object = descriptor.as_object().unwrap();
        assert_eq!(object.type_name, "Outer");

        let kinds: Vec<(&str, &str)> = object
            .members
            .iter()
            .map(|m| (m.name.as_str(), m.descriptor.type_name()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("name", "string"),
                ("count", "number"),
                ("comment", "string"),
                ("inner", "Inner"),
            ]
        );

        let inner = object.member("inner").and_then(|d| d.as_object()).unwrap();
        assert_eq!(inner.member("flag"), Some(&TypeDescriptor::BOOLEAN));
    }

    #[test]
    fn test_derive_inputs_plain_names() {
        let inputs = derive_inputs("function (myArg1, myArg2)");
        let names: Vec<&str> = inputs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["myArg1", "myArg2"]);
        assert!(inputs.iter().all(|(_, d)| *d == TypeDescriptor::STRING));
    }

    #[test]
    fn test_derive_inputs_rust_signature() {
        let inputs = derive_inputs(stringify!(fn add(mut a: f64, b: f64) -> f64));
        let names: Vec<&str> = inputs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_derive_inputs_generic_parameter_types() {
        let inputs = derive_inputs(stringify!(
            fn merge(m: HashMap<String, i64>, pair: (i64, i64), f: Box<dyn Fn(i64, i64) -> i64>, tail: [u8; 4])
        ));
        let names: Vec<&str> = inputs.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["m", "pair", "f", "tail"]);
    }

    #[test]
    fn test_derive_inputs_without_parameters() {
        assert!(derive_inputs("fn test5()").is_empty());
        assert!(derive_inputs("no parens here").is_empty());
    }
}
