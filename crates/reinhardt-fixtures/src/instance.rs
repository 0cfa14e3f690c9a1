//! Built fixture instances.
//!
//! A [`FixtureInstance`] is a shared handle: the cache, relationship fields
//! of other instances and the test code all hold the same instance, and
//! equality is identity.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::value::{FieldValue, Fields};

/// Model data produced by a model factory.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstance {
	/// Resolved model path (e.g. "app.models.toaster:Toaster").
	pub model: String,

	/// Attribute values.
	pub fields: Fields,
}

impl ModelInstance {
	/// Creates a model instance.
	pub fn new(model: impl Into<String>, fields: Fields) -> Self {
		Self {
			model: model.into(),
			fields,
		}
	}

	/// Returns an attribute value.
	pub fn get(&self, name: &str) -> Option<&FieldValue> {
		self.fields.get(name)
	}

	/// Sets an attribute value, replacing any previous one.
	pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
		self.fields.insert(name.into(), value.into());
	}
}

/// Shared handle to a built fixture instance.
#[derive(Clone)]
pub struct FixtureInstance(Rc<RefCell<ModelInstance>>);

impl FixtureInstance {
	/// Wraps a model instance in a new shared handle.
	pub fn new(instance: ModelInstance) -> Self {
		Self(Rc::new(RefCell::new(instance)))
	}

	/// Returns the model path.
	pub fn model(&self) -> String {
		self.0.borrow().model.clone()
	}

	/// Returns a copy of an attribute value.
	pub fn get(&self, name: &str) -> Option<FieldValue> {
		self.0.borrow().get(name).cloned()
	}

	/// Sets an attribute value.
	pub fn set(&self, name: impl Into<String>, value: impl Into<FieldValue>) {
		self.0.borrow_mut().set(name, value);
	}

	/// Returns a copy of all attribute values.
	pub fn fields(&self) -> Fields {
		self.0.borrow().fields.clone()
	}

	/// Borrows the underlying model instance.
	///
	/// # Panics
	///
	/// Panics if the instance is currently mutably borrowed.
	pub fn borrow(&self) -> Ref<'_, ModelInstance> {
		self.0.borrow()
	}

	/// Mutably borrows the underlying model instance.
	///
	/// # Panics
	///
	/// Panics if the instance is currently borrowed.
	pub fn borrow_mut(&self) -> RefMut<'_, ModelInstance> {
		self.0.borrow_mut()
	}

	/// Returns true if both handles point to the same instance.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Renders the attribute values as JSON. Related instances are inlined.
	pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
		serde_json::to_value(self)
	}
}

impl From<ModelInstance> for FixtureInstance {
	fn from(instance: ModelInstance) -> Self {
		Self::new(instance)
	}
}

impl PartialEq for FixtureInstance {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl Eq for FixtureInstance {}

impl fmt::Debug for FixtureInstance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// Related instances are listed by field name only to keep output finite.
		match self.0.try_borrow() {
			Ok(inner) => f
				.debug_struct("FixtureInstance")
				.field("model", &inner.model)
				.field("fields", &inner.fields.keys().collect::<Vec<_>>())
				.finish(),
			Err(_) => f.write_str("FixtureInstance(<borrowed>)"),
		}
	}
}

impl Serialize for FixtureInstance {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let inner = self.0.borrow();
		let mut map = serializer.serialize_map(Some(inner.fields.len()))?;
		for (name, value) in &inner.fields {
			map.serialize_entry(name, value)?;
		}
		map.end()
	}
}
