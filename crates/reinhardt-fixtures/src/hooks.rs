//! Lifecycle hooks.
//!
//! Each lifecycle event has exactly one slot. Empty slots hold a no-op, so
//! dispatch never has to check whether a hook was registered.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use tracing::trace;

use crate::error::{BoxError, FixtureError, FixtureResult};
use crate::instance::FixtureInstance;

/// Return type of a hook callable.
pub type HookResult = Result<(), BoxError>;

/// A registered hook callable.
pub type Hook = Rc<dyn Fn(&FixtureInstance) -> HookResult>;

/// Lifecycle events a hook can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
	/// Before a record-construction collaborator saves an instance.
	BeforeSave,
	/// After a record-construction collaborator saves an instance.
	AfterSave,
	/// Before the install pipeline adds an instance to the session.
	BeforeInstall,
	/// After the install pipeline commits an instance.
	AfterInstall,
}

impl HookName {
	/// All hook names, in slot order.
	pub const ALL: [HookName; 4] = [
		Self::BeforeSave,
		Self::AfterSave,
		Self::BeforeInstall,
		Self::AfterInstall,
	];

	/// Returns the name used to register the hook.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::BeforeSave => "before_save",
			Self::AfterSave => "after_save",
			Self::BeforeInstall => "before_install",
			Self::AfterInstall => "after_install",
		}
	}

	fn slot(self) -> usize {
		match self {
			Self::BeforeSave => 0,
			Self::AfterSave => 1,
			Self::BeforeInstall => 2,
			Self::AfterInstall => 3,
		}
	}
}

impl FromStr for HookName {
	type Err = FixtureError;

	fn from_str(name: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|hook| hook.as_str() == name)
			.ok_or_else(|| FixtureError::InvalidHook(name.to_string()))
	}
}

impl fmt::Display for HookName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

fn noop(_instance: &FixtureInstance) -> HookResult {
	Ok(())
}

/// One hook slot per lifecycle event.
pub struct HookTable {
	slots: [Hook; 4],
	registered: [bool; 4],
}

impl HookTable {
	/// Creates a table where every slot holds the no-op hook.
	pub fn new() -> Self {
		let default: Hook = Rc::new(noop);
		Self {
			slots: [
				Rc::clone(&default),
				Rc::clone(&default),
				Rc::clone(&default),
				default,
			],
			registered: [false; 4],
		}
	}

	/// Registers a hook, replacing any previous registration for that event.
	pub fn set(&mut self, name: HookName, hook: Hook) {
		self.slots[name.slot()] = hook;
		self.registered[name.slot()] = true;
	}

	/// Returns the hook for an event; the no-op if none was registered.
	pub fn get(&self, name: HookName) -> Hook {
		Rc::clone(&self.slots[name.slot()])
	}

	/// Returns true if a hook other than the no-op is registered.
	pub fn is_registered(&self, name: HookName) -> bool {
		self.registered[name.slot()]
	}

	/// Invokes the hook for an event with the given instance.
	pub fn run(&self, name: HookName, instance: &FixtureInstance) -> FixtureResult<()> {
		trace!(hook = %name, registered = self.is_registered(name), "running hook");
		let hook = self.get(name);
		hook(instance).map_err(|source| FixtureError::Hook { hook: name, source })
	}
}

impl Default for HookTable {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for HookTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let registered: Vec<&str> = HookName::ALL
			.into_iter()
			.filter(|name| self.is_registered(*name))
			.map(|name| name.as_str())
			.collect();
		f.debug_struct("HookTable")
			.field("registered", &registered)
			.finish()
	}
}
