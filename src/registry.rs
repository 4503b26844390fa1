//! Process-wide lookup of live components.

use crate::{component::Component, error::RegistryError, node::ComponentId};
use core::fmt::{self, Display, Formatter};
use hashbrown::{hash_map::Entry, HashMap};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// Identifies the live root of one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RootId(String);
impl RootId {
	#[must_use]
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for RootId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
impl From<&str> for RootId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}
impl From<String> for RootId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

/// At most one component per `(root, id)` across all sessions.
///
/// Shared between sessions by [`Arc`]. One lock guards the whole map and is held only for the map operation itself,
/// so registry calls never block on component state.
#[derive(Default)]
pub struct LiveRegistry {
	entries: Mutex<HashMap<(RootId, ComponentId), Arc<Component>>>,
}

impl fmt::Debug for LiveRegistry {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("LiveRegistry").field("len", &self.len()).finish()
	}
}

impl LiveRegistry {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// # Errors
	///
	/// [`RegistryError::AlreadyInRegistry`] iff the slot is taken. The existing entry stays in place.
	#[instrument(skip_all, fields(root = %root, id = %component.id()))]
	pub fn register(&self, root: &RootId, component: Arc<Component>) -> Result<(), RegistryError> {
		match self.entries.lock().entry((root.clone(), component.id().clone())) {
			Entry::Occupied(occupied) => Err(RegistryError::AlreadyInRegistry {
				root: occupied.key().0.clone(),
				id: occupied.key().1.clone(),
			}),
			Entry::Vacant(vacant) => {
				vacant.insert(component);
				trace!("Registered.");
				Ok(())
			}
		}
	}

	#[must_use]
	pub fn lookup(&self, root: &RootId, id: &ComponentId) -> Option<Arc<Component>> {
		self.entries.lock().get(&(root.clone(), id.clone())).cloned()
	}

	/// Like [`lookup`](`LiveRegistry::lookup`), but falls back to `default`.
	#[must_use]
	pub fn lookup_or(&self, root: &RootId, id: &ComponentId, default: Arc<Component>) -> Arc<Component> {
		self.lookup(root, id).unwrap_or(default)
	}

	pub fn unregister(&self, root: &RootId, id: &ComponentId) -> Option<Arc<Component>> {
		let removed = self.entries.lock().remove(&(root.clone(), id.clone()));
		if removed.is_some() {
			trace!(%root, %id, "Unregistered.");
		}
		removed
	}

	/// Unregisters `component` only if its slot still holds that same instance.
	pub fn unregister_if_same(&self, root: &RootId, component: &Arc<Component>) -> bool {
		let mut entries = self.entries.lock();
		let key = (root.clone(), component.id().clone());
		match entries.get(&key) {
			Some(existing) if Arc::ptr_eq(existing, component) => {
				entries.remove(&key);
				true
			}
			_ => false,
		}
	}

	/// Removes all entries of `root` and returns how many there were.
	#[instrument(skip(self))]
	pub fn remove_root(&self, root: &RootId) -> usize {
		let mut entries = self.entries.lock();
		let before = entries.len();
		entries.retain(|(entry_root, _), _| entry_root != root);
		let removed = before - entries.len();
		debug!(removed, "Removed root.");
		removed
	}

	/// A copy of the components registered under `root`, in no particular order.
	#[must_use]
	pub fn components(&self, root: &RootId) -> Vec<Arc<Component>> {
		self.entries.lock().iter().filter(|((entry_root, _), _)| entry_root == root).map(|(_, component)| Arc::clone(component)).collect()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	pub fn clear(&self) {
		self.entries.lock().clear();
	}
}
