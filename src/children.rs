//! Ordered child components with parent and root bookkeeping.

use crate::{component::Component, error::TreeError};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{instrument, trace, trace_span};

/// Receives exactly one call per insertion or removal.
pub trait ChildrenObserver: Send + Sync {
	fn on_new_child(&self, index: usize, child: &Arc<Component>);
	fn on_delete_child(&self, index: usize, child: &Arc<Component>);
}

/// The children of one component.
///
/// Children are owned (strongly) by their parent's list. The reverse direction is non-owning:
/// a child knows its parent through a [`Weak`] and its root only by id.
pub struct ChildrenList {
	owner: Weak<Component>,
	items: Mutex<Vec<Arc<Component>>>,
	observer: Arc<dyn ChildrenObserver>,
}

impl core::fmt::Debug for ChildrenList {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_list().entries(self.items.lock().iter().map(|child| child.id())).finish()
	}
}

impl ChildrenList {
	pub(crate) fn new(owner: Weak<Component>, observer: Arc<dyn ChildrenObserver>) -> Self {
		Self {
			owner,
			items: Mutex::new(Vec::new()),
			observer,
		}
	}

	/// Attaches `child` at `index`.
	///
	/// # Errors
	///
	/// - [`TreeError::AlreadyAttached`] if `child` already has a parent (in this or another live tree),
	/// - [`TreeError::WouldCycle`] if `child` is the owner or one of its ancestors,
	/// - [`TreeError::IndexOutOfBounds`] if `index > len`.
	///
	/// Nothing changes on error.
	#[instrument(skip_all, fields(child = %child.id(), index = index))]
	pub fn insert(&self, index: usize, child: Arc<Component>) -> Result<(), TreeError> {
		let owner = self.owner.upgrade().ok_or(TreeError::OwnerDropped)?;
		let mut ancestor = Some(Arc::clone(&owner));
		while let Some(current) = ancestor {
			if Arc::ptr_eq(&current, &child) {
				return Err(TreeError::WouldCycle {
					child: child.id().clone(),
					parent: owner.id().clone(),
				});
			}
			ancestor = current.parent();
		}

		{
			let mut items = self.items.lock();
			if index > items.len() {
				return Err(TreeError::IndexOutOfBounds { index, len: items.len() });
			}
			child.claim_parent(&owner)?;
			items.insert(index, Arc::clone(&child));
		}
		propagate_root(&child, &owner.root_id());

		self.observer.on_new_child(index, &child);
		Ok(())
	}

	/// Appends `child`. See [`insert`](`ChildrenList::insert`).
	///
	/// # Errors
	///
	/// As [`insert`](`ChildrenList::insert`).
	pub fn push(&self, child: Arc<Component>) -> Result<(), TreeError> {
		let len = self.len();
		self.insert(len, child)
	}

	/// Detaches `child` and returns its former index.
	///
	/// Only `child`'s own parent and root are cleared. Its descendants keep theirs until it is attached again.
	///
	/// # Errors
	///
	/// [`TreeError::ChildNotFound`] iff `child` is not in this list.
	#[instrument(skip_all, fields(child = %child.id()))]
	pub fn remove(&self, child: &Arc<Component>) -> Result<usize, TreeError> {
		let index = {
			let mut items = self.items.lock();
			let index = items.iter().position(|item| Arc::ptr_eq(item, child)).ok_or_else(|| TreeError::ChildNotFound {
				child: child.id().clone(),
				parent: self.owner_id(),
			})?;
			items.remove(index);
			index
		};
		child.detach();
		self.observer.on_delete_child(index, child);
		Ok(index)
	}

	/// # Errors
	///
	/// [`TreeError::IndexOutOfBounds`] iff `index >= len`.
	pub fn remove_at(&self, index: usize) -> Result<Arc<Component>, TreeError> {
		let child = {
			let mut items = self.items.lock();
			if index >= items.len() {
				return Err(TreeError::IndexOutOfBounds { index, len: items.len() });
			}
			items.remove(index)
		};
		child.detach();
		self.observer.on_delete_child(index, &child);
		Ok(child)
	}

	#[must_use]
	pub fn get(&self, index: usize) -> Option<Arc<Component>> {
		self.items.lock().get(index).cloned()
	}

	#[must_use]
	pub fn index_of(&self, child: &Arc<Component>) -> Option<usize> {
		self.items.lock().iter().position(|item| Arc::ptr_eq(item, child))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.items.lock().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.items.lock().is_empty()
	}

	/// A copy of the current children. Later changes to the list are not reflected.
	#[must_use]
	pub fn to_vec(&self) -> Vec<Arc<Component>> {
		self.items.lock().clone()
	}

	fn owner_id(&self) -> crate::node::ComponentId {
		self.owner.upgrade().map_or_else(|| "<dropped>".into(), |owner| owner.id().clone())
	}
}

/// Rewrites the root of `subtree` and all its descendants.
///
/// Uses an explicit stack, since live trees can be hundreds of levels deep.
fn propagate_root(subtree: &Arc<Component>, root: &crate::node::ComponentId) {
	let span = trace_span!("Propagating root", %root);
	let _enter = span.enter();

	let mut count = 0_usize;
	let mut stack = vec![Arc::clone(subtree)];
	while let Some(component) = stack.pop() {
		component.set_root(Some(root.clone()));
		stack.extend(component.children().to_vec());
		count += 1;
	}
	trace!(count, "Propagated root.");
}
