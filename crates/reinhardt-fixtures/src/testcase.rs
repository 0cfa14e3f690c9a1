//! Test-case adapter around a shared fixtures manager.
//!
//! Each test builds its own [`FixturesTestCase`] over a manager that is
//! loaded once and shared. The test case remembers what it installed, so
//! teardown can remove exactly those rows again.
//!
//! # Example
//!
//! ```ignore
//! use reinhardt_fixtures::prelude::*;
//!
//! #[rstest]
//! fn test_toaster(manager: Rc<RefCell<FixturesManager>>) {
//!     let mut case = FixturesTestCase::new(manager);
//!     let toaster = case.install_fixture("toaster", InstallOptions::default()).unwrap();
//!     assert_eq!(toaster.get("color"), Some("red".into()));
//!     case.uninstall_all_fixtures().unwrap();
//! }
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{FixtureError, FixtureResult};
use crate::instance::FixtureInstance;
use crate::manager::{FixtureKeys, FixturesManager, InstallOptions};

#[derive(Debug, Clone)]
struct InstalledFixture {
	instance: FixtureInstance,
	saved: bool,
}

/// Per-test view over a shared [`FixturesManager`].
#[derive(Debug)]
pub struct FixturesTestCase {
	manager: Rc<RefCell<FixturesManager>>,
	fixtures: IndexMap<String, InstalledFixture>,
}

impl FixturesTestCase {
	/// Creates a test case over a loaded manager.
	pub fn new(manager: Rc<RefCell<FixturesManager>>) -> Self {
		Self {
			manager,
			fixtures: IndexMap::new(),
		}
	}

	/// Returns the shared manager.
	pub fn manager(&self) -> Rc<RefCell<FixturesManager>> {
		Rc::clone(&self.manager)
	}

	/// Returns a fixture instance without installing it.
	pub fn get_fixture(
		&self,
		key: &str,
		include_relationships: bool,
	) -> FixtureResult<FixtureInstance> {
		self.manager.borrow_mut().get_fixture(key, include_relationships)
	}

	/// Returns several fixture instances without installing them.
	pub fn get_fixtures(
		&self,
		keys: impl Into<FixtureKeys>,
		include_relationships: bool,
	) -> FixtureResult<Vec<FixtureInstance>> {
		self.manager.borrow_mut().get_fixtures(keys, include_relationships)
	}

	/// Installs a fixture and remembers it for uninstalling.
	pub fn install_fixture(
		&mut self,
		key: &str,
		options: InstallOptions,
	) -> FixtureResult<FixtureInstance> {
		let instance = self.manager.borrow_mut().install_fixture(key, options)?;
		self.fixtures.insert(
			key.to_string(),
			InstalledFixture {
				instance: instance.clone(),
				saved: !options.do_not_save,
			},
		);
		Ok(instance)
	}

	/// Installs several fixtures in order.
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

	/// Installs every fixture of the loaded file.
	pub fn install_all_fixtures(
		&mut self,
		options: InstallOptions,
	) -> FixtureResult<Vec<FixtureInstance>> {
		let order = self.manager.borrow().install_order();
		self.install_fixtures(order, options)
	}

	/// Returns a fixture installed by this test case.
	pub fn fixture(&self, key: &str) -> Option<FixtureInstance> {
		self.fixtures.get(key).map(|entry| entry.instance.clone())
	}

	/// Returns the keys installed by this test case, in install order.
	pub fn installed_keys(&self) -> Vec<&str> {
		self.fixtures.keys().map(String::as_str).collect()
	}

	/// Deletes an installed fixture from the session.
	///
	/// Keys this test case did not install are ignored, so uninstalling twice
	/// is harmless.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::NotLoaded`] if the manager has no session, and
	/// [`FixtureError::Session`] if the delete or commit fails.
	pub fn uninstall_fixture(&mut self, key: &str) -> FixtureResult<()> {
		let Some(entry) = self.fixtures.shift_remove(key) else {
			return Ok(());
		};
		if !entry.saved {
			return Ok(());
		}
		// Installed keys must keep matching committed rows.
		self.manager.borrow_mut().forget_installed(key);

		let session = self
			.manager
			.borrow()
			.session()
			.ok_or(FixtureError::NotLoaded)?;
		let mut session = session.borrow_mut();
		session.delete(&entry.instance).map_err(FixtureError::Session)?;
		session.commit().map_err(FixtureError::Session)?;

		debug!(fixture = key, "uninstalled fixture");
		Ok(())
	}

	/// Uninstalls several fixtures in order.
	pub fn uninstall_fixtures(&mut self, keys: impl Into<FixtureKeys>) -> FixtureResult<()> {
		let keys: FixtureKeys = keys.into();
		for key in keys.into_vec() {
			self.uninstall_fixture(&key)?;
		}
		Ok(())
	}

	/// Uninstalls everything this test case installed, most recent first.
	pub fn uninstall_all_fixtures(&mut self) -> FixtureResult<()> {
		let keys: Vec<String> = self.fixtures.keys().rev().cloned().collect();
		self.uninstall_fixtures(keys)
	}

	/// Empties the manager's instance cache.
	pub fn clean_fixtures_cache(&self) {
		self.manager.borrow_mut().clean_cache();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::{ModelNamespace, RecordFactory};
	use crate::session::{MemorySession, SessionEvent};
	use crate::value::FieldValue;
	use rstest::{fixture, rstest};
	use std::io::Write;
	use tempfile::NamedTempFile;

	const CONTENT: &str = r#"
simple_dict:
  model: Dict
  field1: lolin
  field2: 2
dict_with_nest:
  model: Dict
  field1: asdlkf
  field2: 4
  nested: !rel simple_dict
"#;

	struct Harness {
		case: FixturesTestCase,
		session: Rc<RefCell<MemorySession>>,
		_file: NamedTempFile,
	}

	#[fixture]
	fn harness() -> Harness {
		let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
		write!(file, "{}", CONTENT).unwrap();
		let session = MemorySession::shared();
		let mut manager = FixturesManager::new();
		manager
			.load(
				file.path(),
				session.clone(),
				ModelNamespace::new("").with_fallback(RecordFactory),
			)
			.unwrap();

		Harness {
			case: FixturesTestCase::new(Rc::new(RefCell::new(manager))),
			session,
			_file: file,
		}
	}

	#[rstest]
	fn test_install_fixture_is_tracked(harness: Harness) {
		let Harness {
			mut case, session, ..
		} = harness;

		let simple = case
			.install_fixture("simple_dict", InstallOptions::default())
			.unwrap();

		assert_eq!(simple.get("field1"), Some(FieldValue::from("lolin")));
		assert_eq!(simple.get("field2"), Some(FieldValue::Integer(2)));
		assert_eq!(case.installed_keys(), vec!["simple_dict"]);
		assert_eq!(case.fixture("simple_dict"), Some(simple.clone()));
		assert!(session.borrow().is_committed(&simple));
	}

	#[rstest]
	fn test_install_all_and_get(harness: Harness) {
		let Harness { mut case, .. } = harness;

		let installed = case.install_all_fixtures(InstallOptions::default()).unwrap();
		let fixtures = case.get_fixtures(["simple_dict", "dict_with_nest"], true).unwrap();

		assert_eq!(installed.len(), 2);
		assert_eq!(fixtures, installed);
		assert_eq!(
			fixtures[1].get("nested"),
			Some(FieldValue::Instance(fixtures[0].clone()))
		);
	}

	#[rstest]
	fn test_uninstall_all_in_reverse_order(harness: Harness) {
		// Arrange
		let Harness {
			mut case, session, ..
		} = harness;
		case.install_fixtures(["simple_dict", "dict_with_nest"], InstallOptions::default())
			.unwrap();

		// Act
		case.uninstall_all_fixtures().unwrap();

		// Assert
		assert!(case.installed_keys().is_empty());
		assert!(session.borrow().committed().is_empty());
		let deletes: Vec<SessionEvent> = session
			.borrow()
			.events()
			.iter()
			.filter(|event| matches!(event, SessionEvent::Delete(_)))
			.cloned()
			.collect();
		assert_eq!(deletes.len(), 2);
	}

	#[rstest]
	fn test_uninstall_twice_is_harmless(harness: Harness) {
		let Harness { mut case, .. } = harness;
		case.install_fixture("simple_dict", InstallOptions::default())
			.unwrap();

		case.uninstall_fixtures(["simple_dict", "dict_with_nest"]).unwrap();
		case.uninstall_fixtures(["simple_dict", "dict_with_nest"]).unwrap();

		assert!(case.fixture("simple_dict").is_none());
	}

	#[rstest]
	fn test_unsaved_fixture_is_not_deleted(harness: Harness) {
		let Harness {
			mut case, session, ..
		} = harness;
		case.install_fixture(
			"simple_dict",
			InstallOptions::new().with_do_not_save(true),
		)
		.unwrap();

		case.uninstall_fixture("simple_dict").unwrap();

		assert!(session.borrow().events().is_empty());
	}

	#[rstest]
	fn test_clean_fixtures_cache(harness: Harness) {
		let Harness { case, .. } = harness;
		let first = case.get_fixture("simple_dict", true).unwrap();

		case.clean_fixtures_cache();
		let second = case.get_fixture("simple_dict", true).unwrap();

		assert!(!first.ptr_eq(&second));
		assert!(case.manager().borrow().is_cached("simple_dict"));
	}

	#[rstest]
	fn test_reinstall_dependent_after_uninstall() {
		// Arrange
		let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
		write!(
			file,
			"kitchen:\n  model: Kitchen\ntoaster:\n  model: Toaster\n  depend_on: kitchen\n"
		)
		.unwrap();
		let session = MemorySession::shared();
		let mut manager = FixturesManager::new();
		manager
			.load(
				file.path(),
				session.clone(),
				ModelNamespace::new("").with_fallback(RecordFactory),
			)
			.unwrap();
		let mut case = FixturesTestCase::new(Rc::new(RefCell::new(manager)));
		case.install_fixtures(["kitchen", "toaster"], InstallOptions::default())
			.unwrap();
		case.uninstall_all_fixtures().unwrap();

		// Act
		let toaster = case
			.install_fixture("toaster", InstallOptions::default())
			.unwrap();

		// Assert
		let kitchen = case.get_fixture("kitchen", true).unwrap();
		assert!(session.borrow().is_committed(&toaster));
		assert!(session.borrow().is_committed(&kitchen));
	}
}
