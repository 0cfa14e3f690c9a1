//! Test data loader helper.
//!
//! Provides convenient methods for locating and loading fixture files.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use reinhardt_fixtures::{FixturesManager, MemorySession, ModelNamespace};

/// Test data loader for fixture files.
///
/// Resolves names against the tests/data directory of this crate.
pub struct TestDataLoader {
	base_path: PathBuf,
}

impl TestDataLoader {
	/// Create a new test data loader.
	///
	/// Uses the default test data directory.
	pub fn new() -> Self {
		Self {
			base_path: Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data"),
		}
	}

	/// Returns the path of a YAML data file.
	///
	/// # Arguments
	///
	/// * `name` - Name of the test data file (without .yaml extension)
	pub fn yaml_path(&self, name: &str) -> PathBuf {
		self.base_path.join(format!("{}.yaml", name))
	}

	/// Load a data file into a fresh manager.
	///
	/// # Panics
	///
	/// Panics if the file cannot be loaded.
	pub fn load(
		&self,
		name: &str,
		namespace: ModelNamespace,
	) -> (FixturesManager, Rc<RefCell<MemorySession>>) {
		let session = MemorySession::shared();
		let mut manager = FixturesManager::new();
		let path = self.yaml_path(name);
		manager
			.load(&path, session.clone(), namespace)
			.unwrap_or_else(|e| panic!("Failed to load test data {:?}: {}", path, e));
		(manager, session)
	}
}

impl Default for TestDataLoader {
	fn default() -> Self {
		Self::new()
	}
}
