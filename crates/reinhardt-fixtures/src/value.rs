//! Field values shared by raw definitions and built instances.

use std::fmt;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::instance::FixtureInstance;

/// Ordered mapping of field names to values.
pub type Fields = IndexMap<String, FieldValue>;

/// Reference to another fixture, written `!rel key` or `!rel key.attr`.
///
/// Only one level of attribute access is supported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationshipRef {
	/// Key of the referenced fixture.
	pub key: String,

	/// Attribute of the referenced instance, if any.
	pub attr: Option<String>,
}

impl RelationshipRef {
	/// Creates a reference to a whole fixture instance.
	pub fn new(key: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			attr: None,
		}
	}

	/// Creates a reference to one attribute of a fixture instance.
	pub fn with_attr(key: impl Into<String>, attr: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			attr: Some(attr.into()),
		}
	}

	/// Parses `key` or `key.attr`.
	///
	/// # Example
	///
	/// ```
	/// # use reinhardt_fixtures::RelationshipRef;
	/// let reference = RelationshipRef::parse("toaster.color");
	/// assert_eq!(reference.key, "toaster");
	/// assert_eq!(reference.attr.as_deref(), Some("color"));
	/// ```
	pub fn parse(reference: &str) -> Self {
		match reference.split_once('.') {
			Some((key, attr)) => Self::with_attr(key, attr),
			None => Self::new(reference),
		}
	}
}

impl fmt::Display for RelationshipRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.attr {
			Some(attr) => write!(f, "{}.{}", self.key, attr),
			None => f.write_str(&self.key),
		}
	}
}

/// A fixture field value.
///
/// `Relationship` only appears in definitions; building a fixture replaces it
/// with `Instance` (or with the referenced attribute's value).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
	/// Explicit null.
	Null,
	/// Boolean.
	Bool(bool),
	/// Integer that fits in an `i64`.
	Integer(i64),
	/// Any other number.
	Float(f64),
	/// String.
	String(String),
	/// Ordered list.
	List(Vec<FieldValue>),
	/// Nested mapping.
	Map(Fields),
	/// Unresolved reference to another fixture.
	Relationship(RelationshipRef),
	/// Built fixture instance.
	Instance(FixtureInstance),
}

impl FieldValue {
	/// Returns true for `Null`.
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	/// Returns the boolean, if this is one.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(value) => Some(*value),
			_ => None,
		}
	}

	/// Returns the integer, if this is one.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::Integer(value) => Some(*value),
			_ => None,
		}
	}

	/// Returns the number as a float. Integers are widened.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Self::Float(value) => Some(*value),
			Self::Integer(value) => Some(*value as f64),
			_ => None,
		}
	}

	/// Returns the string slice, if this is a string.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(value) => Some(value),
			_ => None,
		}
	}

	/// Returns the list items, if this is a list.
	pub fn as_list(&self) -> Option<&[FieldValue]> {
		match self {
			Self::List(items) => Some(items),
			_ => None,
		}
	}

	/// Returns the nested mapping, if this is one.
	pub fn as_map(&self) -> Option<&Fields> {
		match self {
			Self::Map(map) => Some(map),
			_ => None,
		}
	}

	/// Returns the built instance, if this is one.
	pub fn as_instance(&self) -> Option<&FixtureInstance> {
		match self {
			Self::Instance(instance) => Some(instance),
			_ => None,
		}
	}

	/// Returns the unresolved reference, if this is one.
	pub fn as_relationship(&self) -> Option<&RelationshipRef> {
		match self {
			Self::Relationship(reference) => Some(reference),
			_ => None,
		}
	}

	/// Returns true if a relationship appears anywhere inside this value.
	pub fn contains_relationship(&self) -> bool {
		match self {
			Self::Relationship(_) => true,
			Self::List(items) => items.iter().any(Self::contains_relationship),
			Self::Map(map) => map.values().any(Self::contains_relationship),
			_ => false,
		}
	}
}

impl Serialize for FieldValue {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			Self::Null => serializer.serialize_unit(),
			Self::Bool(value) => serializer.serialize_bool(*value),
			Self::Integer(value) => serializer.serialize_i64(*value),
			Self::Float(value) => serializer.serialize_f64(*value),
			Self::String(value) => serializer.serialize_str(value),
			Self::List(items) => {
				let mut seq = serializer.serialize_seq(Some(items.len()))?;
				for item in items {
					seq.serialize_element(item)?;
				}
				seq.end()
			}
			Self::Map(fields) => {
				let mut map = serializer.serialize_map(Some(fields.len()))?;
				for (name, value) in fields {
					map.serialize_entry(name, value)?;
				}
				map.end()
			}
			Self::Relationship(reference) => serializer.collect_str(reference),
			Self::Instance(instance) => instance.serialize(serializer),
		}
	}
}

impl From<bool> for FieldValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<i64> for FieldValue {
	fn from(value: i64) -> Self {
		Self::Integer(value)
	}
}

impl From<i32> for FieldValue {
	fn from(value: i32) -> Self {
		Self::Integer(i64::from(value))
	}
}

impl From<f64> for FieldValue {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<&str> for FieldValue {
	fn from(value: &str) -> Self {
		Self::String(value.to_string())
	}
}

impl From<String> for FieldValue {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}

impl From<Vec<FieldValue>> for FieldValue {
	fn from(items: Vec<FieldValue>) -> Self {
		Self::List(items)
	}
}

impl From<Fields> for FieldValue {
	fn from(fields: Fields) -> Self {
		Self::Map(fields)
	}
}

impl From<RelationshipRef> for FieldValue {
	fn from(reference: RelationshipRef) -> Self {
		Self::Relationship(reference)
	}
}

impl From<FixtureInstance> for FieldValue {
	fn from(instance: FixtureInstance) -> Self {
		Self::Instance(instance)
	}
}
