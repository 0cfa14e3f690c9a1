//! Model namespace and model factories.
//!
//! A fixture names its model as a string. The [`ModelNamespace`] turns that
//! string into a registered [`ModelFactory`], interpreting it relative to the
//! namespace's package:
//!
//! - `".toaster:Toaster"`: relative path, prefixed with the package
//! - `"kitchen.toaster:Toaster"`: absolute path, used as is
//! - `"Toaster"`: tried as `"<package>.toaster:Toaster"`, then
//!   `"<package>:Toaster"`, then the bare name.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{FixtureError, FixtureResult};
use crate::instance::ModelInstance;
use crate::value::Fields;

/// Builds model instances from resolved fixture fields.
///
/// Closures with the matching signature implement this trait.
///
/// # Example
///
/// ```
/// # use reinhardt_fixtures::{Fields, FixtureResult, ModelInstance, ModelNamespace};
/// let namespace = ModelNamespace::new("kitchen").with_model(
///     "kitchen.toaster:Toaster",
///     |model: &str, mut fields: Fields| -> FixtureResult<ModelInstance> {
///         fields.entry("slots".to_string()).or_insert(2.into());
///         Ok(ModelInstance::new(model, fields))
///     },
/// );
/// assert!(namespace.contains("kitchen.toaster:Toaster"));
/// ```
pub trait ModelFactory {
	/// Builds an instance of `model` from `fields`.
	///
	/// Relationship fields have already been replaced by instances.
	fn build(&self, model: &str, fields: Fields) -> FixtureResult<ModelInstance>;
}

impl<F> ModelFactory for F
where
	F: Fn(&str, Fields) -> FixtureResult<ModelInstance>,
{
	fn build(&self, model: &str, fields: Fields) -> FixtureResult<ModelInstance> {
		self(model, fields)
	}
}

/// Factory that stores the fields unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordFactory;

impl ModelFactory for RecordFactory {
	fn build(&self, model: &str, fields: Fields) -> FixtureResult<ModelInstance> {
		Ok(ModelInstance::new(model, fields))
	}
}

/// Registry of model factories, scoped to a models package.
#[derive(Clone, Default)]
pub struct ModelNamespace {
	package: String,
	factories: HashMap<String, Rc<dyn ModelFactory>>,
	fallback: Option<Rc<dyn ModelFactory>>,
}

impl ModelNamespace {
	/// Creates an empty namespace for a models package.
	pub fn new(package: impl Into<String>) -> Self {
		Self {
			package: package.into(),
			factories: HashMap::new(),
			fallback: None,
		}
	}

	/// Returns the models package.
	pub fn package(&self) -> &str {
		&self.package
	}

	/// Registers a factory under a model path.
	pub fn register<F: ModelFactory + 'static>(&mut self, path: impl Into<String>, factory: F) {
		self.factories.insert(path.into(), Rc::new(factory));
	}

	/// Registers a factory under a model path, builder style.
	pub fn with_model<F: ModelFactory + 'static>(
		mut self,
		path: impl Into<String>,
		factory: F,
	) -> Self {
		self.register(path, factory);
		self
	}

	/// Sets the factory used for models with no registered factory.
	pub fn with_fallback<F: ModelFactory + 'static>(mut self, factory: F) -> Self {
		self.fallback = Some(Rc::new(factory));
		self
	}

	/// Returns true if a factory is registered under exactly this path.
	pub fn contains(&self, path: &str) -> bool {
		self.factories.contains_key(path)
	}

	/// Returns the paths tried for a model name, in order.
	pub fn candidates(&self, model: &str) -> Vec<String> {
		if model.contains(':') {
			if model.starts_with('.') {
				return vec![format!("{}{}", self.package, model)];
			}
			return vec![model.to_string()];
		}

		let module = model.to_lowercase();
		if self.package.is_empty() {
			vec![format!("{}:{}", module, model), model.to_string()]
		} else {
			vec![
				format!("{}.{}:{}", self.package, module, model),
				format!("{}:{}", self.package, model),
				model.to_string(),
			]
		}
	}

	/// Resolves a model name to its path and factory.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::ModelNotFound`] if no candidate path is
	/// registered and there is no fallback factory.
	pub fn resolve(&self, model: &str) -> FixtureResult<(String, Rc<dyn ModelFactory>)> {
		for path in self.candidates(model) {
			if let Some(factory) = self.factories.get(&path) {
				return Ok((path, Rc::clone(factory)));
			}
		}

		self.fallback
			.as_ref()
			.map(|factory| (model.to_string(), Rc::clone(factory)))
			.ok_or_else(|| FixtureError::ModelNotFound(model.to_string()))
	}
}

impl fmt::Debug for ModelNamespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut models: Vec<&String> = self.factories.keys().collect();
		models.sort();
		f.debug_struct("ModelNamespace")
			.field("package", &self.package)
			.field("models", &models)
			.field("fallback", &self.fallback.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::value::FieldValue;
	use rstest::rstest;

	#[rstest]
	#[case(".toaster:Toaster", vec!["kitchen.toaster:Toaster"])]
	#[case("home.toaster:Toaster", vec!["home.toaster:Toaster"])]
	#[case(
		"Toaster",
		vec!["kitchen.toaster:Toaster", "kitchen:Toaster", "Toaster"]
	)]
	fn test_candidates(#[case] model: &str, #[case] expected: Vec<&str>) {
		let namespace = ModelNamespace::new("kitchen");
		assert_eq!(namespace.candidates(model), expected);
	}

	#[rstest]
	fn test_candidates_without_package() {
		let namespace = ModelNamespace::new("");
		assert_eq!(namespace.candidates("Toaster"), vec!["toaster:Toaster", "Toaster"]);
	}

	#[rstest]
	fn test_resolve_prefers_module_path() {
		let namespace = ModelNamespace::new("kitchen")
			.with_model("kitchen:Toaster", RecordFactory)
			.with_model("kitchen.toaster:Toaster", RecordFactory);

		let (path, _) = namespace.resolve("Toaster").unwrap();

		assert_eq!(path, "kitchen.toaster:Toaster");
	}

	#[rstest]
	fn test_resolve_falls_back_to_package_path() {
		let namespace = ModelNamespace::new("kitchen").with_model("kitchen:Toaster", RecordFactory);

		let (path, _) = namespace.resolve("Toaster").unwrap();

		assert_eq!(path, "kitchen:Toaster");
	}

	#[rstest]
	fn test_resolve_unknown_model() {
		let namespace = ModelNamespace::new("kitchen");

		let result = namespace.resolve("Toaster");

		assert!(matches!(result, Err(FixtureError::ModelNotFound(ref m)) if m == "Toaster"));
	}

	#[rstest]
	fn test_resolve_uses_fallback_with_declared_name() {
		let namespace = ModelNamespace::new("kitchen").with_fallback(RecordFactory);

		let (path, factory) = namespace.resolve("Toaster").unwrap();
		let instance = factory.build(&path, Fields::new()).unwrap();

		assert_eq!(path, "Toaster");
		assert_eq!(instance.model, "Toaster");
	}

	#[rstest]
	fn test_closure_factory() {
		let namespace = ModelNamespace::new("").with_model(
			"Toaster",
			|model: &str, mut fields: Fields| -> FixtureResult<ModelInstance> {
				fields.insert("slots".to_string(), FieldValue::Integer(4));
				Ok(ModelInstance::new(model, fields))
			},
		);

		let (path, factory) = namespace.resolve("Toaster").unwrap();
		let instance = factory.build(&path, Fields::new()).unwrap();

		assert_eq!(instance.get("slots"), Some(&FieldValue::Integer(4)));
	}
}
