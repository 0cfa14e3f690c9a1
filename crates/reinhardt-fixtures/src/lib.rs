//! Declarative test fixtures for the Reinhardt framework.
//!
//! This crate loads test data described in YAML, builds instances lazily and
//! installs them into a persistence session:
//!
//! - **Definitions**: named fixtures and batches of fixtures in one file
//! - **Relationships**: `!rel` references that share the referenced instance
//! - **Cache**: one instance per fixture key until the cache is cleaned
//! - **Hooks**: callbacks around install and save
//!
//! # Quick Start
//!
//! Create a fixture file (`tests/data/kitchen.yaml`):
//!
//! ```yaml
//! kitchen:
//!   model: Kitchen
//!   name: main
//! toaster:
//!   model: Toaster
//!   color: red
//!   kitchen: !rel kitchen
//! toasters:
//!   model: Toaster
//!   objects:
//!     - {color: blue}
//!     - {color: green}
//! ```
//!
//! Load it and install what a test needs:
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
//! let toaster = manager.install_fixture("toaster", InstallOptions::default())?;
//! let batch = manager.get_fixtures(["toasters_0", "toasters_1"], true)?;
//! ```
//!
//! # Architecture
//!
//! - [`load_file`] reads a file and hands it to a [`DefinitionParser`]
//! - [`resolver::resolve`] turns raw definitions into [`FixtureRecord`]s
//! - [`FixturesManager`] caches built instances and runs the install pipeline
//! - [`ModelNamespace`] maps model names to [`ModelFactory`] implementations
//! - [`Session`] is where installed instances are persisted
//! - [`FixturesTestCase`] tracks what a single test installed

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod fixture;
pub mod hooks;
pub mod instance;
pub mod loader;
pub mod manager;
pub mod models;
pub mod prelude;
pub mod resolver;
pub mod session;
pub mod testcase;
pub mod value;

// Re-export commonly used types at crate root
pub use error::{BoxError, FixtureError, FixtureResult};
pub use fixture::{FixtureRecord, FixtureSpec};
pub use hooks::{Hook, HookName, HookResult, HookTable};
pub use instance::{FixtureInstance, ModelInstance};
pub use loader::{
	DefinitionParser, FixtureFormat, RawDefinition, RawDefinitions, YamlParser, load_file,
};
pub use manager::{FixtureKeys, FixturesManager, InstallOptions};
pub use models::{ModelFactory, ModelNamespace, RecordFactory};
pub use session::{MemorySession, Session, SessionEvent, SessionHandle};
pub use testcase::FixturesTestCase;
pub use value::{FieldValue, Fields, RelationshipRef};
