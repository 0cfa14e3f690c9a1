//! Turns raw definitions into fixture records.
//!
//! Two definition shapes are accepted. A named definition describes one
//! fixture:
//!
//! ```yaml
//! toaster:
//!   model: Toaster
//!   color: red
//! ```
//!
//! A batch definition expands into one fixture per element of `objects`,
//! keyed `<name>_<index>`:
//!
//! ```yaml
//! toasters:
//!   model: Toaster
//!   objects:
//!     - {color: red}
//!     - {color: blue}
//! ```

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::{FixtureError, FixtureResult};
use crate::fixture::{FixtureRecord, FixtureSpec};
use crate::loader::{RawDefinition, RawDefinitions};
use crate::value::{FieldValue, Fields};

const MODEL: &str = "model";
const ID: &str = "id";
const FIELDS: &str = "fields";
const OBJECTS: &str = "objects";
const POST_CREATION: &str = "post_creation";
const INHERIT_FROM: &str = "inherit_from";
const DEEP_INHERIT: &str = "deep_inherit";
const DEPEND_ON: &str = "depend_on";

const RESERVED: [&str; 7] = [
	MODEL,
	ID,
	FIELDS,
	POST_CREATION,
	INHERIT_FROM,
	DEEP_INHERIT,
	DEPEND_ON,
];

/// Resolves every raw definition into fixture records, in file order.
///
/// Resolution is all or nothing: the first invalid definition aborts it.
///
/// # Errors
///
/// - [`FixtureError::MissingModel`] if a fixture has no model, even after
///   inheritance
/// - [`FixtureError::ConflictingId`] if a fixture has both an `id` and fields
/// - [`FixtureError::UnknownFixture`] if `inherit_from` or `depend_on` names a
///   fixture that does not exist
/// - [`FixtureError::CircularReference`] if inheritance or dependencies loop
/// - [`FixtureError::InvalidDefinition`] if a reserved key has the wrong shape
pub fn resolve(definitions: RawDefinitions) -> FixtureResult<IndexMap<String, FixtureRecord>> {
	let mut specs: IndexMap<String, FixtureSpec> = IndexMap::with_capacity(definitions.len());
	for (name, definition) in definitions {
		if definition.contains_key(OBJECTS) {
			for spec in expand_batch(&name, definition)? {
				specs.insert(spec.key.clone(), spec);
			}
		} else {
			let spec = compile_named(name, definition)?;
			specs.insert(spec.key.clone(), spec);
		}
	}

	apply_inheritance(&mut specs)?;

	let mut records = IndexMap::with_capacity(specs.len());
	for (key, spec) in specs {
		records.insert(key, FixtureRecord::new(spec)?);
	}

	check_dependencies(&records)?;
	Ok(records)
}

fn invalid(key: &str, message: impl Into<String>) -> FixtureError {
	FixtureError::InvalidDefinition {
		key: key.to_string(),
		message: message.into(),
	}
}

fn model_of(name: &str, definition: &RawDefinition) -> FixtureResult<Option<String>> {
	match definition.get(MODEL) {
		None | Some(FieldValue::Null) => Ok(None),
		Some(FieldValue::String(model)) => Ok(Some(model.clone())),
		Some(_) => Err(invalid(name, "'model' must be a string")),
	}
}

fn expand_batch(name: &str, mut definition: RawDefinition) -> FixtureResult<Vec<FixtureSpec>> {
	let model =
		model_of(name, &definition)?.ok_or_else(|| FixtureError::MissingModel(name.to_string()))?;

	let objects = match definition.shift_remove(OBJECTS) {
		Some(FieldValue::List(objects)) => objects,
		_ => return Err(invalid(name, "'objects' must be a list of mappings")),
	};

	objects
		.into_iter()
		.enumerate()
		.map(|(index, object)| match object {
			FieldValue::Map(fields) => Ok(FixtureSpec {
				key: format!("{}_{}", name, index),
				model: Some(model.clone()),
				fields,
				..FixtureSpec::default()
			}),
			_ => Err(invalid(name, "'objects' must be a list of mappings")),
		})
		.collect()
}

fn compile_named(name: String, mut definition: RawDefinition) -> FixtureResult<FixtureSpec> {
	let model = model_of(&name, &definition)?;

	let database_id = match definition.shift_remove(ID) {
		None | Some(FieldValue::Null) => None,
		Some(id) => Some(id),
	};

	let mut fields = match definition.shift_remove(FIELDS) {
		None | Some(FieldValue::Null) => Fields::new(),
		Some(FieldValue::Map(fields)) => fields,
		Some(_) => return Err(invalid(&name, "'fields' must be a mapping")),
	};

	let post_creation = match definition.shift_remove(POST_CREATION) {
		None | Some(FieldValue::Null) => Fields::new(),
		Some(FieldValue::Map(assignments)) => assignments,
		Some(_) => return Err(invalid(&name, "'post_creation' must be a mapping")),
	};

	let inherit_from = match definition.shift_remove(INHERIT_FROM) {
		None | Some(FieldValue::Null) => None,
		Some(FieldValue::String(parent)) => Some(parent),
		Some(_) => return Err(invalid(&name, "'inherit_from' must be a fixture name")),
	};

	let deep_inherit = match definition.shift_remove(DEEP_INHERIT) {
		None | Some(FieldValue::Null) => false,
		Some(FieldValue::Bool(deep)) => deep,
		Some(_) => return Err(invalid(&name, "'deep_inherit' must be a boolean")),
	};

	let depend_on = match definition.shift_remove(DEPEND_ON) {
		None | Some(FieldValue::Null) => Vec::new(),
		Some(FieldValue::String(key)) => vec![key],
		Some(FieldValue::List(keys)) => keys
			.into_iter()
			.map(|key| match key {
				FieldValue::String(key) => Ok(key),
				_ => Err(invalid(&name, "'depend_on' must list fixture names")),
			})
			.collect::<FixtureResult<Vec<_>>>()?,
		Some(_) => return Err(invalid(&name, "'depend_on' must list fixture names")),
	};

	fields.extend(
		definition
			.into_iter()
			.filter(|(attr, _)| !RESERVED.contains(&attr.as_str())),
	);

	if database_id.is_some() && !fields.is_empty() {
		return Err(FixtureError::ConflictingId(name));
	}
	if model.is_none() && inherit_from.is_none() {
		return Err(FixtureError::MissingModel(name));
	}

	Ok(FixtureSpec {
		key: name,
		model,
		fields,
		database_id,
		post_creation,
		inherit_from,
		deep_inherit,
		depend_on,
	})
}

fn apply_inheritance(specs: &mut IndexMap<String, FixtureSpec>) -> FixtureResult<()> {
	let keys: Vec<String> = specs.keys().cloned().collect();
	let mut done = HashSet::new();
	for key in keys {
		inherit(&key, specs, &mut done, &mut Vec::new())?;
	}
	Ok(())
}

fn inherit(
	key: &str,
	specs: &mut IndexMap<String, FixtureSpec>,
	done: &mut HashSet<String>,
	chain: &mut Vec<String>,
) -> FixtureResult<()> {
	if done.contains(key) {
		return Ok(());
	}
	if chain.iter().any(|k| k == key) {
		return Err(FixtureError::CircularReference(key.to_string()));
	}

	let parent_key = match specs.get(key).and_then(|spec| spec.inherit_from.clone()) {
		Some(parent_key) => parent_key,
		None => {
			done.insert(key.to_string());
			return Ok(());
		}
	};
	if !specs.contains_key(&parent_key) {
		return Err(FixtureError::UnknownFixture(parent_key));
	}

	chain.push(key.to_string());
	inherit(&parent_key, specs, done, chain)?;
	chain.pop();

	let parent = specs[&parent_key].clone();
	if let Some(spec) = specs.get_mut(key) {
		spec.inherit(&parent);
	}
	done.insert(key.to_string());
	Ok(())
}

fn check_dependencies(records: &IndexMap<String, FixtureRecord>) -> FixtureResult<()> {
	let mut visited = HashSet::new();
	for key in records.keys() {
		visit(key, records, &mut visited, &mut Vec::new())?;
	}
	Ok(())
}

fn visit<'a>(
	key: &'a str,
	records: &'a IndexMap<String, FixtureRecord>,
	visited: &mut HashSet<&'a str>,
	path: &mut Vec<&'a str>,
) -> FixtureResult<()> {
	if visited.contains(key) {
		return Ok(());
	}
	if path.contains(&key) {
		return Err(FixtureError::CircularReference(key.to_string()));
	}

	let record = records
		.get(key)
		.ok_or_else(|| FixtureError::UnknownFixture(key.to_string()))?;
	path.push(key);
	for dependency in record.depend_on() {
		visit(dependency, records, visited, path)?;
	}
	path.pop();
	visited.insert(key);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::loader::{DefinitionParser, YamlParser};
	use rstest::rstest;

	fn resolve_yaml(content: &str) -> FixtureResult<IndexMap<String, FixtureRecord>> {
		resolve(YamlParser::new().parse(content)?)
	}

	#[rstest]
	fn test_named_and_batch_keys() {
		// Arrange
		let content = r#"
simple:
  model: M
  field1: lolin
  field2: 2
group:
  model: M
  objects:
    - {a: 1}
    - {a: 2}
"#;

		// Act
		let records = resolve_yaml(content).unwrap();

		// Assert
		let keys: Vec<&str> = records.keys().map(String::as_str).collect();
		assert_eq!(keys, vec!["simple", "group_0", "group_1"]);
		assert!(!records.contains_key("group"));
		assert_eq!(records["group_1"].fields()["a"], FieldValue::Integer(2));
		assert_eq!(records["group_1"].model(), "M");
	}

	#[rstest]
	fn test_empty_batch_produces_no_keys() {
		let records = resolve_yaml("group:\n  model: M\n  objects: []\n").unwrap();
		assert!(records.is_empty());
	}

	#[rstest]
	#[case("simple:\n  field1: lolin\n", "simple")]
	#[case("group:\n  objects:\n    - {a: 1}\n", "group")]
	fn test_missing_model(#[case] content: &str, #[case] expected: &str) {
		let result = resolve_yaml(content);
		assert!(matches!(result, Err(FixtureError::MissingModel(ref k)) if k == expected));
	}

	#[rstest]
	fn test_missing_model_aborts_whole_file() {
		let content = "good:\n  model: M\nbad:\n  field: 1\n";

		let result = resolve_yaml(content);

		assert!(matches!(result, Err(FixtureError::MissingModel(ref k)) if k == "bad"));
	}

	#[rstest]
	fn test_fields_mapping_and_extra_keys_merge() {
		let content = r#"
toaster:
  model: Toaster
  fields:
    color: red
  slots: 2
  post_creation:
    serial: X1
"#;

		let records = resolve_yaml(content).unwrap();
		let toaster = &records["toaster"];

		let names: Vec<&str> = toaster.fields().keys().map(String::as_str).collect();
		assert_eq!(names, vec!["color", "slots"]);
		assert_eq!(toaster.post_creation()["serial"], FieldValue::from("X1"));
	}

	#[rstest]
	fn test_id_becomes_database_id() {
		let records = resolve_yaml("existing:\n  model: Toaster\n  id: 7\n").unwrap();
		let existing = &records["existing"];

		assert_eq!(existing.database_id(), Some(&FieldValue::Integer(7)));
		assert!(existing.fields().is_empty());
	}

	#[rstest]
	fn test_id_with_fields_conflicts() {
		let result = resolve_yaml("existing:\n  model: Toaster\n  id: 7\n  color: red\n");
		assert!(matches!(result, Err(FixtureError::ConflictingId(ref k)) if k == "existing"));
	}

	#[rstest]
	fn test_inherit_from_supplies_model_and_fields() {
		// Arrange
		let content = r#"
red_toaster:
  inherit_from: toaster
  color: red
toaster:
  model: Toaster
  color: white
  slots: 2
"#;

		// Act
		let records = resolve_yaml(content).unwrap();

		// Assert
		let red = &records["red_toaster"];
		assert_eq!(red.model(), "Toaster");
		assert_eq!(red.fields()["color"], FieldValue::from("red"));
		assert_eq!(red.fields()["slots"], FieldValue::Integer(2));
	}

	#[rstest]
	fn test_inheritance_chain() {
		let content = r#"
base:
  model: Toaster
  slots: 2
middle:
  inherit_from: base
  color: red
leaf:
  inherit_from: middle
  brand: acme
"#;

		let records = resolve_yaml(content).unwrap();
		let leaf = records["leaf"].fields();

		assert_eq!(leaf["slots"], FieldValue::Integer(2));
		assert_eq!(leaf["color"], FieldValue::from("red"));
		assert_eq!(leaf["brand"], FieldValue::from("acme"));
	}

	#[rstest]
	fn test_inherit_from_unknown() {
		let result = resolve_yaml("child:\n  inherit_from: ghost\n");
		assert!(matches!(result, Err(FixtureError::UnknownFixture(ref k)) if k == "ghost"));
	}

	#[rstest]
	fn test_inheritance_cycle() {
		let content = "a:\n  inherit_from: b\nb:\n  inherit_from: a\n";

		let result = resolve_yaml(content);

		assert!(matches!(result, Err(FixtureError::CircularReference(_))));
	}

	#[rstest]
	fn test_depend_on_accepts_string_or_list() {
		let content = r#"
kitchen:
  model: Kitchen
counter:
  model: Counter
  depend_on: kitchen
toaster:
  model: Toaster
  depend_on: [kitchen, counter]
"#;

		let records = resolve_yaml(content).unwrap();

		assert_eq!(records["counter"].depend_on(), ["kitchen".to_string()]);
		assert_eq!(
			records["toaster"].depend_on(),
			["kitchen".to_string(), "counter".to_string()]
		);
	}

	#[rstest]
	fn test_depend_on_unknown() {
		let result = resolve_yaml("toaster:\n  model: Toaster\n  depend_on: kitchen\n");
		assert!(matches!(result, Err(FixtureError::UnknownFixture(ref k)) if k == "kitchen"));
	}

	#[rstest]
	fn test_depend_on_cycle() {
		let content = r#"
a:
  model: M
  depend_on: b
b:
  model: M
  depend_on: a
"#;

		let result = resolve_yaml(content);

		assert!(matches!(result, Err(FixtureError::CircularReference(_))));
	}

	#[rstest]
	#[case("toaster:\n  model: [Toaster]\n")]
	#[case("toaster:\n  model: Toaster\n  fields: [1, 2]\n")]
	#[case("toaster:\n  model: Toaster\n  deep_inherit: yes please\n")]
	#[case("group:\n  model: M\n  objects: {a: 1}\n")]
	#[case("group:\n  model: M\n  objects: [1, 2]\n")]
	fn test_malformed_reserved_keys(#[case] content: &str) {
		let result = resolve_yaml(content);
		assert!(matches!(result, Err(FixtureError::InvalidDefinition { .. })));
	}
}
