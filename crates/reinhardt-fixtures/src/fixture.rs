//! Compiled fixture records.
//!
//! A [`FixtureRecord`] is the validated form of one fixture definition. It is
//! created from a [`FixtureSpec`] once inheritance has been applied, and it
//! knows how to build its instance through the manager so that relationship
//! references share the manager's cache.

use crate::error::{FixtureError, FixtureResult};
use crate::instance::FixtureInstance;
use crate::manager::FixturesManager;
use crate::value::{FieldValue, Fields};

/// Uncompiled fixture attributes, as gathered by the resolver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureSpec {
	/// Fixture key.
	pub key: String,

	/// Model name, possibly inherited later.
	pub model: Option<String>,

	/// Field values.
	pub fields: Fields,

	/// Primary key of an existing row (the `id` attribute of the definition).
	pub database_id: Option<FieldValue>,

	/// Assignments applied after the instance is built.
	pub post_creation: Fields,

	/// Key of the fixture to inherit from.
	pub inherit_from: Option<String>,

	/// Merge nested mappings when inheriting fields.
	pub deep_inherit: bool,

	/// Fixtures to install before this one.
	pub depend_on: Vec<String>,
}

impl FixtureSpec {
	/// Creates a spec with only a key and a model.
	pub fn new(key: impl Into<String>, model: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			model: Some(model.into()),
			..Self::default()
		}
	}

	/// Fills in what this spec does not define from `parent`.
	///
	/// The model and `depend_on` are taken only when missing. Fields and
	/// `post_creation` are merged on top of the parent's, recursively into
	/// nested mappings when `deep_inherit` is set. The database id is never
	/// inherited.
	pub fn inherit(&mut self, parent: &FixtureSpec) {
		if self.model.is_none() {
			self.model = parent.model.clone();
		}
		if self.depend_on.is_empty() {
			self.depend_on = parent.depend_on.clone();
		}
		self.fields = merge(&parent.fields, std::mem::take(&mut self.fields), self.deep_inherit);
		self.post_creation = merge(
			&parent.post_creation,
			std::mem::take(&mut self.post_creation),
			self.deep_inherit,
		);
	}
}

fn merge(parent: &Fields, child: Fields, deep: bool) -> Fields {
	let mut merged = parent.clone();
	if deep {
		deep_update(&mut merged, child);
	} else {
		merged.extend(child);
	}
	merged
}

fn deep_update(target: &mut Fields, source: Fields) {
	for (name, value) in source {
		match (target.get_mut(&name), value) {
			(Some(FieldValue::Map(existing)), FieldValue::Map(nested)) => {
				deep_update(existing, nested);
			}
			(_, value) => {
				target.insert(name, value);
			}
		}
	}
}

/// A resolved, addressable fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureRecord {
	key: String,
	model: String,
	fields: Fields,
	database_id: Option<FieldValue>,
	post_creation: Fields,
	depend_on: Vec<String>,
}

impl FixtureRecord {
	/// Validates a spec and compiles it into a record.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::MissingModel`] if no model was given or
	/// inherited, and [`FixtureError::ConflictingId`] if both a database id
	/// and fields are present.
	pub fn new(spec: FixtureSpec) -> FixtureResult<Self> {
		let model = spec
			.model
			.ok_or_else(|| FixtureError::MissingModel(spec.key.clone()))?;
		if spec.database_id.is_some() && !spec.fields.is_empty() {
			return Err(FixtureError::ConflictingId(spec.key));
		}

		Ok(Self {
			key: spec.key,
			model,
			fields: spec.fields,
			database_id: spec.database_id,
			post_creation: spec.post_creation,
			depend_on: spec.depend_on,
		})
	}

	/// Returns the fixture key.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Returns the model name as written in the definition.
	pub fn model(&self) -> &str {
		&self.model
	}

	/// Returns the unresolved field values.
	pub fn fields(&self) -> &Fields {
		&self.fields
	}

	/// Returns the primary key of the existing row this fixture points to.
	pub fn database_id(&self) -> Option<&FieldValue> {
		self.database_id.as_ref()
	}

	/// Returns the assignments applied after construction.
	pub fn post_creation(&self) -> &Fields {
		&self.post_creation
	}

	/// Returns the keys that must be installed before this fixture.
	pub fn depend_on(&self) -> &[String] {
		&self.depend_on
	}

	/// Builds the instance for this fixture.
	///
	/// Relationship references are resolved through
	/// [`FixturesManager::get_fixture`], so they come from (and populate) the
	/// same cache. With `include_relationships` unset, every field holding a
	/// relationship is left out.
	pub(crate) fn build(
		&self,
		manager: &mut FixturesManager,
		include_relationships: bool,
	) -> FixtureResult<FixtureInstance> {
		let (path, factory) = manager.namespace().resolve(&self.model)?;

		let instance = match &self.database_id {
			Some(id) => manager
				.fetch(&path, id)?
				.ok_or_else(|| FixtureError::InstanceNotFound {
					key: self.key.clone(),
					model: path.clone(),
				})?,
			None => {
				let fields = resolve_fields(manager, &self.fields, include_relationships)?;
				FixtureInstance::new(factory.build(&path, fields)?)
			}
		};

		let assignments = resolve_fields(manager, &self.post_creation, include_relationships)?;
		for (attr, value) in assignments {
			instance.set(attr, value);
		}

		Ok(instance)
	}
}

fn resolve_fields(
	manager: &mut FixturesManager,
	fields: &Fields,
	include_relationships: bool,
) -> FixtureResult<Fields> {
	let mut resolved = Fields::with_capacity(fields.len());
	for (name, value) in fields {
		if !include_relationships && value.contains_relationship() {
			continue;
		}
		resolved.insert(name.clone(), resolve_value(manager, value)?);
	}
	Ok(resolved)
}

fn resolve_value(manager: &mut FixturesManager, value: &FieldValue) -> FixtureResult<FieldValue> {
	match value {
		FieldValue::Relationship(reference) => manager.resolve_relationship(reference),
		FieldValue::List(items) => items
			.iter()
			.map(|item| resolve_value(manager, item))
			.collect::<FixtureResult<Vec<_>>>()
			.map(FieldValue::List),
		FieldValue::Map(nested) => {
			let mut resolved = Fields::with_capacity(nested.len());
			for (name, item) in nested {
				resolved.insert(name.clone(), resolve_value(manager, item)?);
			}
			Ok(FieldValue::Map(resolved))
		}
		other => Ok(other.clone()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn fields(pairs: &[(&str, FieldValue)]) -> Fields {
		pairs
			.iter()
			.map(|(name, value)| (name.to_string(), value.clone()))
			.collect()
	}

	#[rstest]
	fn test_record_requires_model() {
		let spec = FixtureSpec {
			key: "toaster".to_string(),
			..FixtureSpec::default()
		};

		let result = FixtureRecord::new(spec);

		assert!(matches!(result, Err(FixtureError::MissingModel(ref k)) if k == "toaster"));
	}

	#[rstest]
	fn test_record_rejects_id_with_fields() {
		let mut spec = FixtureSpec::new("toaster", "Toaster");
		spec.database_id = Some(FieldValue::Integer(1));
		spec.fields = fields(&[("color", "red".into())]);

		let result = FixtureRecord::new(spec);

		assert!(matches!(result, Err(FixtureError::ConflictingId(ref k)) if k == "toaster"));
	}

	#[rstest]
	fn test_record_accessors() {
		let mut spec = FixtureSpec::new("toaster", "Toaster");
		spec.fields = fields(&[("color", "red".into())]);
		spec.depend_on = vec!["kitchen".to_string()];

		let record = FixtureRecord::new(spec).unwrap();

		assert_eq!(record.key(), "toaster");
		assert_eq!(record.model(), "Toaster");
		assert_eq!(record.fields()["color"], FieldValue::from("red"));
		assert_eq!(record.depend_on(), ["kitchen".to_string()]);
		assert!(record.database_id().is_none());
	}

	#[rstest]
	fn test_inherit_shallow_replaces_nested_maps() {
		// Arrange
		let mut parent = FixtureSpec::new("parent", "Toaster");
		parent.fields = fields(&[
			("color", "red".into()),
			("specs", FieldValue::Map(fields(&[("slots", 2.into()), ("watts", 800.into())]))),
		]);
		let mut child = FixtureSpec {
			key: "child".to_string(),
			inherit_from: Some("parent".to_string()),
			fields: fields(&[("specs", FieldValue::Map(fields(&[("slots", 4.into())])))]),
			..FixtureSpec::default()
		};

		// Act
		child.inherit(&parent);

		// Assert
		assert_eq!(child.model.as_deref(), Some("Toaster"));
		assert_eq!(child.fields["color"], FieldValue::from("red"));
		assert_eq!(
			child.fields["specs"],
			FieldValue::Map(fields(&[("slots", 4.into())]))
		);
	}

	#[rstest]
	fn test_inherit_deep_merges_nested_maps() {
		let mut parent = FixtureSpec::new("parent", "Toaster");
		parent.fields = fields(&[(
			"specs",
			FieldValue::Map(fields(&[("slots", 2.into()), ("watts", 800.into())])),
		)]);
		let mut child = FixtureSpec {
			key: "child".to_string(),
			deep_inherit: true,
			fields: fields(&[("specs", FieldValue::Map(fields(&[("slots", 4.into())])))]),
			..FixtureSpec::default()
		};

		child.inherit(&parent);

		assert_eq!(
			child.fields["specs"],
			FieldValue::Map(fields(&[("slots", 4.into()), ("watts", 800.into())]))
		);
	}

	#[rstest]
	fn test_inherit_keeps_own_model_and_dependencies() {
		let mut parent = FixtureSpec::new("parent", "Toaster");
		parent.depend_on = vec!["kitchen".to_string()];
		parent.database_id = Some(FieldValue::Integer(3));
		let mut child = FixtureSpec::new("child", "Kettle");
		child.depend_on = vec!["counter".to_string()];

		child.inherit(&parent);

		assert_eq!(child.model.as_deref(), Some("Kettle"));
		assert_eq!(child.depend_on, vec!["counter".to_string()]);
		assert!(child.database_id.is_none());
	}
}
