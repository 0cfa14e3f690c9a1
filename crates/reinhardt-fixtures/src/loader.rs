//! Fixture file loading.
//!
//! The loader picks a format from the file name and hands the text to a
//! [`DefinitionParser`]. The YAML parser understands one custom tag, `!rel`,
//! which marks a reference to another fixture:
//!
//! ```yaml
//! toaster:
//!   model: Toaster
//!   color: red
//! kitchen:
//!   model: Kitchen
//!   appliances:
//!     - !rel toaster
//!   accent: !rel toaster.color
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde_yaml::value::TaggedValue;
use tracing::trace;

use crate::error::{FixtureError, FixtureResult};
use crate::value::{FieldValue, Fields, RelationshipRef};

/// Raw definition of one top-level fixture entry.
pub type RawDefinition = Fields;

/// Raw definitions keyed by fixture name, in file order.
pub type RawDefinitions = IndexMap<String, RawDefinition>;

const RELATIONSHIP_TAG: &str = "rel";

/// Supported fixture file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum FixtureFormat {
	/// YAML, recognized by the `.yaml` suffix.
	#[default]
	Yaml,
}

impl FixtureFormat {
	/// Determines the format from a file path.
	///
	/// Only the exact `.yaml` suffix of the file name is recognized, so a
	/// file named just `.yaml` is accepted too.
	///
	/// # Example
	///
	/// ```
	/// # use reinhardt_fixtures::FixtureFormat;
	/// # use std::path::Path;
	/// assert_eq!(FixtureFormat::from_path(Path::new("data.yaml")), Some(FixtureFormat::Yaml));
	/// assert_eq!(FixtureFormat::from_path(Path::new("data.yml")), None);
	/// assert_eq!(FixtureFormat::from_path(Path::new("data.json")), None);
	/// assert_eq!(FixtureFormat::from_path(Path::new("fixtures/.yaml")), Some(FixtureFormat::Yaml));
	/// ```
	pub fn from_path(path: &Path) -> Option<Self> {
		match path.to_str() {
			Some(name) if name.ends_with(".yaml") => Some(Self::Yaml),
			_ => None,
		}
	}

	/// Returns the file extension for this format.
	pub fn extension(&self) -> &'static str {
		match self {
			Self::Yaml => "yaml",
		}
	}
}

impl std::fmt::Display for FixtureFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Yaml => write!(f, "YAML"),
		}
	}
}

/// Deserializes fixture file content into raw definitions.
pub trait DefinitionParser {
	/// Parses the whole document.
	fn parse(&self, content: &str) -> FixtureResult<RawDefinitions>;
}

/// YAML definition parser with support for the `!rel` tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlParser;

impl YamlParser {
	/// Creates a new YAML parser.
	pub fn new() -> Self {
		Self
	}
}

impl DefinitionParser for YamlParser {
	fn parse(&self, content: &str) -> FixtureResult<RawDefinitions> {
		if content.trim().is_empty() {
			return Ok(RawDefinitions::new());
		}

		let document: serde_yaml::Value = serde_yaml::from_str(content)?;
		let entries = match document {
			serde_yaml::Value::Null => return Ok(RawDefinitions::new()),
			serde_yaml::Value::Mapping(entries) => entries,
			_ => {
				return Err(FixtureError::InvalidDefinition {
					key: "<document>".to_string(),
					message: "expected a mapping of fixture names to definitions".to_string(),
				});
			}
		};

		let mut definitions = RawDefinitions::with_capacity(entries.len());
		for (name, definition) in entries {
			let name = scalar_key(&name).ok_or_else(|| FixtureError::InvalidDefinition {
				key: "<document>".to_string(),
				message: "fixture names must be scalars".to_string(),
			})?;
			match convert(&name, definition)? {
				FieldValue::Map(fields) => {
					definitions.insert(name, fields);
				}
				_ => {
					return Err(FixtureError::InvalidDefinition {
						key: name,
						message: "expected a mapping".to_string(),
					});
				}
			}
		}
		Ok(definitions)
	}
}

fn scalar_key(value: &serde_yaml::Value) -> Option<String> {
	match value {
		serde_yaml::Value::String(s) => Some(s.clone()),
		serde_yaml::Value::Number(n) => Some(n.to_string()),
		serde_yaml::Value::Bool(b) => Some(b.to_string()),
		_ => None,
	}
}

fn convert(key: &str, value: serde_yaml::Value) -> FixtureResult<FieldValue> {
	let invalid = |message: String| FixtureError::InvalidDefinition {
		key: key.to_string(),
		message,
	};

	Ok(match value {
		serde_yaml::Value::Null => FieldValue::Null,
		serde_yaml::Value::Bool(b) => FieldValue::Bool(b),
		serde_yaml::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
			(Some(i), _) => FieldValue::Integer(i),
			(None, Some(f)) => FieldValue::Float(f),
			(None, None) => return Err(invalid(format!("unrepresentable number {}", n))),
		},
		serde_yaml::Value::String(s) => FieldValue::String(s),
		serde_yaml::Value::Sequence(items) => FieldValue::List(
			items
				.into_iter()
				.map(|item| convert(key, item))
				.collect::<FixtureResult<Vec<_>>>()?,
		),
		serde_yaml::Value::Mapping(entries) => {
			let mut fields = Fields::with_capacity(entries.len());
			for (name, value) in entries {
				let name = scalar_key(&name)
					.ok_or_else(|| invalid("mapping keys must be scalars".to_string()))?;
				fields.insert(name, convert(key, value)?);
			}
			FieldValue::Map(fields)
		}
		serde_yaml::Value::Tagged(tagged) => {
			let TaggedValue { tag, value } = *tagged;
			let tag = tag.to_string();
			let tag = tag.trim_start_matches('!');
			if tag != RELATIONSHIP_TAG {
				return Err(invalid(format!("unsupported tag !{}", tag)));
			}
			match value {
				serde_yaml::Value::String(reference) => {
					FieldValue::Relationship(RelationshipRef::parse(reference.trim()))
				}
				_ => return Err(invalid("!rel expects a fixture name".to_string())),
			}
		}
	})
}

/// Reads and parses a fixture file.
///
/// # Errors
///
/// Returns an error if:
/// - The file name does not end in `.yaml` (checked before any I/O)
/// - The file cannot be read
/// - The content cannot be parsed
pub fn load_file(path: &Path, parser: &dyn DefinitionParser) -> FixtureResult<RawDefinitions> {
	let format = FixtureFormat::from_path(path)
		.ok_or_else(|| FixtureError::UnsupportedFormat(path.display().to_string()))?;

	let content = std::fs::read_to_string(path).map_err(|e| {
		if e.kind() == std::io::ErrorKind::NotFound {
			FixtureError::FileNotFound(path.display().to_string())
		} else {
			FixtureError::Io(e)
		}
	})?;

	trace!(file = %path.display(), %format, bytes = content.len(), "parsing fixture file");
	parser.parse(&content)
}
