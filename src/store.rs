//! Observable property and style maps.

use crate::{error::StoreError, node::Attributes};
use core::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{instrument, trace};

/// Which map of a component a store represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
	Props,
	Style,
}

/// Receives exactly one call per non-silent change, after the change is visible in the store.
pub trait StoreObserver: Send + Sync {
	fn on_set_item(&self, kind: StoreKind, key: &str, value: &str);
	fn on_delete_item(&self, kind: StoreKind, key: &str);
}

/// An insertion-ordered string map that reports every change.
///
/// Each operation locks the map only for its own duration, and the observer is called after the lock is released,
/// so observers may read the store again.
/// Sequences of operations are not atomic; callers that need that must synchronise externally.
///
/// The `_silent` variants skip the observer. They exist for seeding initial state and for replaying changes
/// that were already recorded elsewhere, so that nothing is recorded twice.
pub struct ObservableMap {
	kind: StoreKind,
	entries: Mutex<Attributes>,
	version: AtomicU64,
	observer: Option<Arc<dyn StoreObserver>>,
}

pub type PropertyStore = ObservableMap;
pub type StyleStore = ObservableMap;

impl core::fmt::Debug for ObservableMap {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("ObservableMap")
			.field("kind", &self.kind)
			.field("len", &self.len())
			.field("version", &self.version())
			.field("observed", &self.observer.is_some())
			.finish()
	}
}

impl ObservableMap {
	#[must_use]
	pub fn new(kind: StoreKind, observer: Option<Arc<dyn StoreObserver>>) -> Self {
		Self {
			kind,
			entries: Mutex::new(Attributes::new()),
			version: AtomicU64::new(0),
			observer,
		}
	}

	#[must_use]
	pub fn kind(&self) -> StoreKind {
		self.kind
	}

	/// Monotonic change counter. Compare two readings to find out whether anything changed in between.
	#[must_use]
	pub fn version(&self) -> u64 {
		self.version.load(Ordering::Acquire)
	}

	#[instrument(skip_all, fields(kind = ?self.kind))]
	pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
		let (key, value) = (key.into(), value.into());
		self.store(key.clone(), value.clone());
		if let Some(observer) = &self.observer {
			observer.on_set_item(self.kind, &key, &value);
		}
	}

	pub fn set_silent(&self, key: impl Into<String>, value: impl Into<String>) {
		self.store(key.into(), value.into());
	}

	/// # Errors
	///
	/// [`StoreError::KeyNotFound`] iff `key` is absent, in which case nothing changes.
	#[instrument(skip(self), fields(kind = ?self.kind))]
	pub fn delete(&self, key: &str) -> Result<String, StoreError> {
		let removed = self.take(key)?;
		if let Some(observer) = &self.observer {
			observer.on_delete_item(self.kind, key);
		}
		Ok(removed)
	}

	/// # Errors
	///
	/// [`StoreError::KeyNotFound`] iff `key` is absent, in which case nothing changes.
	pub fn delete_silent(&self, key: &str) -> Result<String, StoreError> {
		self.take(key)
	}

	/// Stores all `entries` under one lock, then notifies in input order.
	pub fn update<K: Into<String>, V: Into<String>>(&self, entries: impl IntoIterator<Item = (K, V)>) {
		let entries: Vec<(String, String)> = entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
		{
			let mut map = self.entries.lock();
			for (key, value) in &entries {
				map.insert(key.clone(), value.clone());
				self.version.fetch_add(1, Ordering::AcqRel);
			}
		}
		trace!(kind = ?self.kind, count = entries.len(), "Updated store.");
		if let Some(observer) = &self.observer {
			for (key, value) in &entries {
				observer.on_set_item(self.kind, key, value);
			}
		}
	}

	/// Removes every entry, notifying one deletion per key in order.
	pub fn clear(&self) {
		let removed: Vec<String> = {
			let mut map = self.entries.lock();
			let removed: Vec<String> = map.drain(..).map(|(key, _)| key).collect();
			self.version.fetch_add(removed.len() as u64, Ordering::AcqRel);
			removed
		};
		if let Some(observer) = &self.observer {
			for key in &removed {
				observer.on_delete_item(self.kind, key);
			}
		}
	}

	#[must_use]
	pub fn get(&self, key: &str) -> Option<String> {
		self.entries.lock().get(key).cloned()
	}

	#[must_use]
	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.lock().contains_key(key)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	/// An ordered copy of the current entries.
	#[must_use]
	pub fn snapshot(&self) -> Attributes {
		self.entries.lock().clone()
	}

	fn store(&self, key: String, value: String) {
		let mut map = self.entries.lock();
		map.insert(key, value);
		self.version.fetch_add(1, Ordering::AcqRel);
	}

	fn take(&self, key: &str) -> Result<String, StoreError> {
		let mut map = self.entries.lock();
		let removed = map.shift_remove(key).ok_or_else(|| StoreError::KeyNotFound { key: key.to_owned() })?;
		self.version.fetch_add(1, Ordering::AcqRel);
		Ok(removed)
	}
}
