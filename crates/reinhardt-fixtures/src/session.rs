//! Persistence session interface.
//!
//! The install pipeline only needs to add and commit instances. Deleting and
//! fetching are used by the test-case adapter and by fixtures that point at
//! an existing row through `id`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::BoxError;
use crate::instance::FixtureInstance;
use crate::value::FieldValue;

/// Shared handle to a session, as stored by the manager.
pub type SessionHandle = Rc<RefCell<dyn Session>>;

/// Persistence session the fixtures are installed into.
pub trait Session {
	/// Registers an instance to be persisted on the next commit.
	fn add(&mut self, instance: &FixtureInstance) -> Result<(), BoxError>;

	/// Persists every pending instance.
	fn commit(&mut self) -> Result<(), BoxError>;

	/// Marks an instance for deletion on the next commit.
	fn delete(&mut self, instance: &FixtureInstance) -> Result<(), BoxError>;

	/// Fetches an existing row of `model` by primary key.
	///
	/// The default implementation finds nothing.
	fn get(&mut self, model: &str, id: &FieldValue) -> Result<Option<FixtureInstance>, BoxError> {
		let _ = (model, id);
		Ok(None)
	}

	/// Discards pending changes.
	fn rollback(&mut self) -> Result<(), BoxError> {
		Ok(())
	}
}

/// Operation recorded by [`MemorySession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
	/// An instance of the named model was added.
	Add(String),
	/// The session was committed.
	Commit,
	/// An instance of the named model was deleted.
	Delete(String),
	/// Pending changes were discarded.
	Rollback,
}

/// In-memory session, for tests and examples.
///
/// Rows are looked up by their `id` field.
#[derive(Debug, Default)]
pub struct MemorySession {
	pending: Vec<FixtureInstance>,
	deleted: Vec<FixtureInstance>,
	committed: Vec<FixtureInstance>,
	events: Vec<SessionEvent>,
}

impl MemorySession {
	/// Creates an empty session.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates an empty session behind a shared handle.
	///
	/// Cloning the handle into [`FixturesManager::load`](crate::FixturesManager::load)
	/// keeps it inspectable from the test.
	pub fn shared() -> Rc<RefCell<Self>> {
		Rc::new(RefCell::new(Self::new()))
	}

	/// Stores an already persisted row.
	pub fn insert(&mut self, instance: FixtureInstance) {
		if !contains(&self.committed, &instance) {
			self.committed.push(instance);
		}
	}

	/// Returns the committed rows, in commit order.
	pub fn committed(&self) -> &[FixtureInstance] {
		&self.committed
	}

	/// Returns the instances waiting for a commit.
	pub fn pending(&self) -> &[FixtureInstance] {
		&self.pending
	}

	/// Returns true if the instance is committed.
	pub fn is_committed(&self, instance: &FixtureInstance) -> bool {
		contains(&self.committed, instance)
	}

	/// Returns the recorded operations, oldest first.
	pub fn events(&self) -> &[SessionEvent] {
		&self.events
	}
}

fn contains(instances: &[FixtureInstance], instance: &FixtureInstance) -> bool {
	instances.iter().any(|candidate| candidate.ptr_eq(instance))
}

impl Session for MemorySession {
	fn add(&mut self, instance: &FixtureInstance) -> Result<(), BoxError> {
		if !contains(&self.pending, instance) {
			self.pending.push(instance.clone());
		}
		self.events.push(SessionEvent::Add(instance.model()));
		Ok(())
	}

	fn commit(&mut self) -> Result<(), BoxError> {
		for instance in self.deleted.drain(..) {
			self.committed.retain(|row| !row.ptr_eq(&instance));
		}
		for instance in std::mem::take(&mut self.pending) {
			if !contains(&self.committed, &instance) {
				self.committed.push(instance);
			}
		}
		self.events.push(SessionEvent::Commit);
		Ok(())
	}

	fn delete(&mut self, instance: &FixtureInstance) -> Result<(), BoxError> {
		self.pending.retain(|row| !row.ptr_eq(instance));
		if !contains(&self.deleted, instance) {
			self.deleted.push(instance.clone());
		}
		self.events.push(SessionEvent::Delete(instance.model()));
		Ok(())
	}

	fn get(&mut self, model: &str, id: &FieldValue) -> Result<Option<FixtureInstance>, BoxError> {
		Ok(self
			.committed
			.iter()
			.find(|row| row.model() == model && row.get("id").as_ref() == Some(id))
			.cloned())
	}

	fn rollback(&mut self) -> Result<(), BoxError> {
		self.pending.clear();
		self.deleted.clear();
		self.events.push(SessionEvent::Rollback);
		Ok(())
	}
}
