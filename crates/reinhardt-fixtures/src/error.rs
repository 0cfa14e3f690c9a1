//! Error types for the fixtures module.
//!
//! This module defines the error types used throughout the reinhardt-fixtures crate.

use thiserror::Error;

use crate::hooks::HookName;

/// Boxed error raised by external collaborators (hooks, sessions, model factories).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while loading, building or installing fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
	/// The fixture file extension is not recognized by the loader.
	#[error("Unsupported file format: '{0}'")]
	UnsupportedFormat(String),

	/// A fixture definition does not name a model.
	#[error("Model is not defined for fixture '{0}'")]
	MissingModel(String),

	/// The fixture key is not part of the resolved set.
	#[error("No such fixture: '{0}'")]
	UnknownFixture(String),

	/// The hook name is not one of the lifecycle hooks.
	#[error("'{0}' is not an allowed hook")]
	InvalidHook(String),

	/// Fixture file not found.
	#[error("Fixture file not found: {0}")]
	FileNotFound(String),

	/// I/O operation failed.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// YAML deserialization error.
	#[error("YAML error: {0}")]
	Yaml(#[from] serde_yaml::Error),

	/// A definition has the wrong shape.
	#[error("Invalid definition for '{key}': {message}")]
	InvalidDefinition {
		/// Fixture name the definition belongs to.
		key: String,
		/// What is wrong with it.
		message: String,
	},

	/// A fixture gives both a database id and fields.
	#[error("Fixture '{0}' cannot provide both an id and fields")]
	ConflictingId(String),

	/// No factory is registered for the model.
	#[error("Model not found: {0}")]
	ModelNotFound(String),

	/// A fixture referencing an existing row by id found no such row.
	#[error("No '{model}' row matches the id of fixture '{key}'")]
	InstanceNotFound {
		/// Fixture key.
		key: String,
		/// Resolved model path.
		model: String,
	},

	/// A relationship points at an attribute the target instance lacks.
	#[error("Fixture '{key}' has no attribute '{attr}'")]
	UnknownAttribute {
		/// Referenced fixture key.
		key: String,
		/// Missing attribute.
		attr: String,
	},

	/// Inheritance, dependency or relationship chain loops back on itself.
	#[error("Circular reference involving fixture '{0}'")]
	CircularReference(String),

	/// An operation needed the session before any file was loaded.
	#[error("Fixtures have not been loaded")]
	NotLoaded,

	/// A lifecycle hook returned an error.
	#[error("Hook '{hook}' failed: {source}")]
	Hook {
		/// Hook that failed.
		hook: HookName,
		/// Error returned by the hook.
		#[source]
		source: BoxError,
	},

	/// The persistence session returned an error.
	#[error("Session error: {0}")]
	Session(#[source] BoxError),
}

/// Result type alias for fixture operations.
pub type FixtureResult<T> = Result<T, FixtureError>;
