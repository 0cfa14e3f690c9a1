//! Convenience re-exports for common usage.
//!
//! # Example
//!
//! ```ignore
//! use reinhardt_fixtures::prelude::*;
//!
//! // Now you have access to:
//! // - The manager and its options
//! // - Instance and value types
//! // - Model and session traits
//! // - Error types
//! ```

// Error types
pub use crate::error::{BoxError, FixtureError, FixtureResult};

// Manager types
pub use crate::manager::{FixtureKeys, FixturesManager, InstallOptions};
pub use crate::testcase::FixturesTestCase;

// Instance and value types
pub use crate::instance::{FixtureInstance, ModelInstance};
pub use crate::value::{FieldValue, Fields, RelationshipRef};

// Collaborators
pub use crate::hooks::{HookName, HookResult};
pub use crate::loader::{DefinitionParser, YamlParser};
pub use crate::models::{ModelFactory, ModelNamespace, RecordFactory};
pub use crate::session::{MemorySession, Session, SessionHandle};
