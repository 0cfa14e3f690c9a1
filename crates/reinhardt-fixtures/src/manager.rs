//! Fixture manager: load, cache and install.
//!
//! ```ignore
//! use reinhardt_fixtures::prelude::*;
//!
//! let session = MemorySession::shared();
//! let mut manager = FixturesManager::new();
//! manager.load(
//!     "tests/data/kitchen.yaml",
//!     session.clone(),
//!     ModelNamespace::new("kitchen").with_fallback(RecordFactory),
//! )?;
//!
//! manager.set_hook("before_install", |toaster: &FixtureInstance| {
//!     toaster.set("inspected", true);
//!     Ok(())
//! })?;
//!
//! let toaster = manager.install_fixture("toaster", InstallOptions::default())?;
//! assert!(session.borrow().is_committed(&toaster));
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::{FixtureError, FixtureResult};
use crate::fixture::FixtureRecord;
use crate::hooks::{Hook, HookName, HookResult, HookTable};
use crate::instance::FixtureInstance;
use crate::loader::{self, DefinitionParser, YamlParser};
use crate::models::ModelNamespace;
use crate::resolver;
use crate::session::SessionHandle;
use crate::value::{FieldValue, RelationshipRef};

/// Options for the install operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
	/// Build and cache the instance without hooks or persistence.
	pub do_not_save: bool,

	/// Resolve relationship fields; when unset they are left out.
	pub include_relationships: bool,
}

impl InstallOptions {
	/// Creates the default options: save, with relationships.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets `do_not_save`.
	pub fn with_do_not_save(mut self, do_not_save: bool) -> Self {
		self.do_not_save = do_not_save;
		self
	}

	/// Sets `include_relationships`.
	pub fn with_relationships(mut self, include_relationships: bool) -> Self {
		self.include_relationships = include_relationships;
		self
	}
}

impl Default for InstallOptions {
	fn default() -> Self {
		Self {
			do_not_save: false,
			include_relationships: true,
		}
	}
}

/// One fixture key or an ordered sequence of keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureKeys {
	/// A single key.
	Single(String),
	/// Several keys, processed in order.
	Many(Vec<String>),
}

impl FixtureKeys {
	/// Returns the keys as an ordered list.
	pub fn into_vec(self) -> Vec<String> {
		match self {
			Self::Single(key) => vec![key],
			Self::Many(keys) => keys,
		}
	}
}

impl From<&str> for FixtureKeys {
	fn from(key: &str) -> Self {
		Self::Single(key.to_string())
	}
}

impl From<String> for FixtureKeys {
	fn from(key: String) -> Self {
		Self::Single(key)
	}
}

impl From<&String> for FixtureKeys {
	fn from(key: &String) -> Self {
		Self::Single(key.clone())
	}
}

impl From<Vec<String>> for FixtureKeys {
	fn from(keys: Vec<String>) -> Self {
		Self::Many(keys)
	}
}

impl From<Vec<&str>> for FixtureKeys {
	fn from(keys: Vec<&str>) -> Self {
		Self::Many(keys.into_iter().map(str::to_string).collect())
	}
}

impl From<&[&str]> for FixtureKeys {
	fn from(keys: &[&str]) -> Self {
		Self::Many(keys.iter().map(|key| key.to_string()).collect())
	}
}

impl From<&[String]> for FixtureKeys {
	fn from(keys: &[String]) -> Self {
		Self::Many(keys.to_vec())
	}
}

impl<const N: usize> From<[&str; N]> for FixtureKeys {
	fn from(keys: [&str; N]) -> Self {
		Self::Many(keys.iter().map(|key| key.to_string()).collect())
	}
}

/// Loads fixture files, caches built instances and installs them.
///
/// The manager owns one load cycle at a time. Instances are built lazily on
/// first access and cached by fixture key until [`clean_cache`] is called.
///
/// [`clean_cache`]: FixturesManager::clean_cache
pub struct FixturesManager {
	filename: Option<PathBuf>,
	namespace: ModelNamespace,
	session: Option<SessionHandle>,
	parser: Box<dyn DefinitionParser>,
	fixtures: IndexMap<String, FixtureRecord>,
	cache: HashMap<String, FixtureInstance>,
	installed: HashSet<String>,
	building: Vec<String>,
	hooks: HookTable,
}

impl FixturesManager {
	/// Creates an empty manager that parses YAML.
	pub fn new() -> Self {
		Self::with_parser(YamlParser::new())
	}

	/// Creates an empty manager with a custom definition parser.
	pub fn with_parser<P: DefinitionParser + 'static>(parser: P) -> Self {
		Self {
			filename: None,
			namespace: ModelNamespace::default(),
			session: None,
			parser: Box::new(parser),
			fixtures: IndexMap::new(),
			cache: HashMap::new(),
			installed: HashSet::new(),
			building: Vec::new(),
			hooks: HookTable::new(),
		}
	}

	/// Loads a fixture file, replacing any previously loaded fixtures.
	///
	/// The cache is emptied once the new fixtures are in place. If reading or
	/// resolving fails, the previously loaded fixtures are kept.
	///
	/// # Errors
	///
	/// Returns the first loader or resolver error, e.g.
	/// [`FixtureError::UnsupportedFormat`] or [`FixtureError::MissingModel`].
	pub fn load(
		&mut self,
		filename: impl AsRef<Path>,
		session: SessionHandle,
		namespace: ModelNamespace,
	) -> FixtureResult<()> {
		let filename = filename.as_ref();
		self.filename = Some(filename.to_path_buf());
		self.namespace = namespace;
		self.session = Some(session);

		let definitions = loader::load_file(filename, self.parser.as_ref())?;
		self.fixtures = resolver::resolve(definitions)?;
		self.clean_cache();

		debug!(
			file = %filename.display(),
			fixtures = self.fixtures.len(),
			"loaded fixtures"
		);
		Ok(())
	}

	/// Discards every cached instance.
	///
	/// Loaded fixtures are kept; the next access builds fresh instances.
	pub fn clean_cache(&mut self) {
		trace!(cached = self.cache.len(), "cleaning fixture cache");
		self.cache.clear();
		self.installed.clear();
	}

	/// Returns the instance for a fixture key, building it on first access.
	///
	/// A cached instance is returned as is, whatever `include_relationships`
	/// was when it was built.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::UnknownFixture`] if the key was not loaded, and
	/// any error raised while building the instance.
	pub fn get_fixture(
		&mut self,
		key: &str,
		include_relationships: bool,
	) -> FixtureResult<FixtureInstance> {
		if !self.fixtures.contains_key(key) {
			return Err(FixtureError::UnknownFixture(key.to_string()));
		}
		if let Some(instance) = self.cache.get(key) {
			trace!(fixture = key, "fixture cache hit");
			return Ok(instance.clone());
		}
		if self.building.iter().any(|k| k == key) {
			return Err(FixtureError::CircularReference(key.to_string()));
		}

		trace!(fixture = key, include_relationships, "fixture cache miss");
		let record = self
			.fixtures
			.get(key)
			.cloned()
			.ok_or_else(|| FixtureError::UnknownFixture(key.to_string()))?;
		self.building.push(key.to_string());
		let built = record.build(self, include_relationships);
		self.building.pop();

		let instance = built?;
		self.cache.insert(key.to_string(), instance.clone());
		Ok(instance)
	}

	/// Returns the instances for several keys, in order.
	pub fn get_fixtures(
		&mut self,
		keys: impl Into<FixtureKeys>,
		include_relationships: bool,
	) -> FixtureResult<Vec<FixtureInstance>> {
		let keys: FixtureKeys = keys.into();
		keys.into_vec()
			.iter()
			.map(|key| self.get_fixture(key, include_relationships))
			.collect()
	}

	/// Installs one fixture into the session.
	///
	/// Fixtures listed in `depend_on` that were not installed since the last
	/// [`clean_cache`](Self::clean_cache) are installed first. With
	/// `do_not_save`, the instance is only built and cached.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::UnknownFixture`] for an unloaded key,
	/// [`FixtureError::Hook`] if a hook fails and [`FixtureError::Session`] if
	/// the session fails. Nothing is rolled back.
	pub fn install_fixture(
		&mut self,
		key: &str,
		options: InstallOptions,
	) -> FixtureResult<FixtureInstance> {
		let instance = self.get_fixture(key, options.include_relationships)?;
		if options.do_not_save {
			return Ok(instance);
		}

		let dependencies = self
			.fixtures
			.get(key)
			.map(|record| record.depend_on().to_vec())
			.unwrap_or_default();
		for dependency in dependencies {
			if !self.installed.contains(&dependency) {
				self.install_fixture(&dependency, options)?;
			}
		}

		let session = self.session.clone().ok_or(FixtureError::NotLoaded)?;
		self.hooks.run(HookName::BeforeInstall, &instance)?;
		{
			let mut session = session.borrow_mut();
			session.add(&instance).map_err(FixtureError::Session)?;
			session.commit().map_err(FixtureError::Session)?;
		}
		self.hooks.run(HookName::AfterInstall, &instance)?;

		self.installed.insert(key.to_string());
		debug!(fixture = key, model = %instance.model(), "installed fixture");
		Ok(instance)
	}

	/// Installs several fixtures in order.
	///
	/// The first failure stops the sequence; fixtures already installed stay
	/// committed.
	pub fn install_fixtures(
		&mut self,
		keys: impl Into<FixtureKeys>,
		options: InstallOptions,
	) -> FixtureResult<Vec<FixtureInstance>> {
		let keys: FixtureKeys = keys.into();
		keys.into_vec()
			.iter()
			.map(|key| self.install_fixture(key, options))
			.collect()
	}

	/// Installs every loaded fixture, one instance per key.
	///
	/// Keys are taken in file order, moved as needed so that `depend_on`
	/// targets come first.
	pub fn install_all_fixtures(
		&mut self,
		options: InstallOptions,
	) -> FixtureResult<Vec<FixtureInstance>> {
		let order = self.install_order();
		self.install_fixtures(order, options)
	}

	/// Returns every loaded key in install order.
	///
	/// This is file order, except that each fixture is preceded by the
	/// fixtures it depends on.
	pub fn install_order(&self) -> Vec<String> {
		fn place(
			key: &str,
			fixtures: &IndexMap<String, FixtureRecord>,
			placed: &mut HashSet<String>,
			order: &mut Vec<String>,
		) {
			if !placed.insert(key.to_string()) {
				return;
			}
			if let Some(record) = fixtures.get(key) {
				for dependency in record.depend_on() {
					place(dependency, fixtures, placed, order);
				}
			}
			order.push(key.to_string());
		}

		let mut placed = HashSet::new();
		let mut order = Vec::with_capacity(self.fixtures.len());
		for key in self.fixtures.keys() {
			place(key, &self.fixtures, &mut placed, &mut order);
		}
		order
	}

	/// Registers a hook for one of the lifecycle events.
	///
	/// Allowed names are `before_save`, `after_save`, `before_install` and
	/// `after_install`. A new registration replaces the previous one.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::InvalidHook`] for any other name.
	pub fn set_hook<F>(&mut self, name: &str, hook: F) -> FixtureResult<()>
	where
		F: Fn(&FixtureInstance) -> HookResult + 'static,
	{
		let name: HookName = name.parse()?;
		self.hooks.set(name, Rc::new(hook));
		Ok(())
	}

	/// Returns the hook registered for a name, or the no-op.
	pub fn hook(&self, name: &str) -> FixtureResult<Hook> {
		Ok(self.hooks.get(name.parse()?))
	}

	/// Runs a hook.
	///
	/// Model factories that save instances themselves use this to fire
	/// `before_save` and `after_save`.
	pub fn run_hook(&self, name: HookName, instance: &FixtureInstance) -> FixtureResult<()> {
		self.hooks.run(name, instance)
	}

	/// Returns the loaded fixture keys, in file order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.fixtures.keys().map(String::as_str)
	}

	/// Returns true if a fixture with this key is loaded.
	pub fn contains(&self, key: &str) -> bool {
		self.fixtures.contains_key(key)
	}

	/// Returns the loaded record for a key.
	pub fn record(&self, key: &str) -> Option<&FixtureRecord> {
		self.fixtures.get(key)
	}

	/// Returns true if an instance for this key is cached.
	pub fn is_cached(&self, key: &str) -> bool {
		self.cache.contains_key(key)
	}

	/// Returns the session given to the last [`load`](Self::load).
	pub fn session(&self) -> Option<SessionHandle> {
		self.session.clone()
	}

	/// Returns the file given to the last [`load`](Self::load).
	pub fn filename(&self) -> Option<&Path> {
		self.filename.as_deref()
	}

	/// Returns the model namespace.
	pub fn namespace(&self) -> &ModelNamespace {
		&self.namespace
	}

	pub(crate) fn forget_installed(&mut self, key: &str) {
		self.installed.remove(key);
	}

	pub(crate) fn fetch(&self, model: &str, id: &FieldValue) -> FixtureResult<Option<FixtureInstance>> {
		let session = self.session.as_ref().ok_or(FixtureError::NotLoaded)?;
		session
			.borrow_mut()
			.get(model, id)
			.map_err(FixtureError::Session)
	}

	pub(crate) fn resolve_relationship(
		&mut self,
		reference: &RelationshipRef,
	) -> FixtureResult<FieldValue> {
		let instance = self.get_fixture(&reference.key, true)?;
		match &reference.attr {
			None => Ok(FieldValue::Instance(instance)),
			Some(attr) => instance
				.get(attr)
				.ok_or_else(|| FixtureError::UnknownAttribute {
					key: reference.key.clone(),
					attr: attr.clone(),
				}),
		}
	}
}

impl Default for FixturesManager {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for FixturesManager {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FixturesManager")
			.field("filename", &self.filename)
			.field("namespace", &self.namespace)
			.field("fixtures", &self.fixtures.keys().collect::<Vec<_>>())
			.field("cached", &self.cache.len())
			.field("hooks", &self.hooks)
			.finish()
	}
}
