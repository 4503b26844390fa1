//! Live components.

use crate::{
	behavior::{Behavior, Element},
	children::ChildrenList,
	error::TreeError,
	mutation::{MutationLog, MutationPayload},
	node::{Attributes, ComponentId, Key},
	store::{ObservableMap, PropertyStore, StoreKind, StoreObserver, StyleStore},
};
use core::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{instrument, trace};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> ComponentId {
	ComponentId::new(format!("c{}", NEXT_ID.fetch_add(1, Ordering::Relaxed)))
}

/// One stateful element of a live tree.
///
/// Shared between its parent's [`ChildrenList`] and the [`LiveRegistry`](`crate::registry::LiveRegistry`) through [`Arc`]s.
/// All state is behind per-field locks, so any number of execution contexts may read and mutate it.
/// Each single operation is consistent, but sequences of operations are not atomic.
pub struct Component {
	id: ComponentId,
	tag: String,
	key: Option<Key>,
	props: PropertyStore,
	style: StyleStore,
	text: Mutex<Option<String>>,
	children: ChildrenList,
	parent: Mutex<Weak<Component>>,
	/// `None` while this component is its own root.
	root: Mutex<Option<ComponentId>>,
	log: Arc<MutationLog>,
	behavior: Box<dyn Behavior>,
}

impl core::fmt::Debug for Component {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Component")
			.field("id", &self.id)
			.field("tag", &self.tag)
			.field("key", &self.key)
			.field("kind", &self.behavior.kind())
			.field("props", &self.props)
			.field("style", &self.style)
			.field("children", &self.children)
			.finish_non_exhaustive()
	}
}

impl Component {
	#[must_use]
	pub fn builder(tag: impl Into<String>) -> ComponentBuilder {
		ComponentBuilder {
			id: None,
			tag: tag.into(),
			key: None,
			props: Attributes::new(),
			style: Attributes::new(),
			text: None,
			children: Vec::new(),
			behavior: None,
		}
	}

	#[must_use]
	pub fn id(&self) -> &ComponentId {
		&self.id
	}

	#[must_use]
	pub fn tag(&self) -> &str {
		&self.tag
	}

	#[must_use]
	pub fn key(&self) -> Option<&Key> {
		self.key.as_ref()
	}

	#[must_use]
	pub fn props(&self) -> &PropertyStore {
		&self.props
	}

	#[must_use]
	pub fn style(&self) -> &StyleStore {
		&self.style
	}

	#[must_use]
	pub fn children(&self) -> &ChildrenList {
		&self.children
	}

	#[must_use]
	pub fn behavior(&self) -> &dyn Behavior {
		&*self.behavior
	}

	/// Pending mutations of this component only.
	#[must_use]
	pub fn log(&self) -> &MutationLog {
		&self.log
	}

	#[must_use]
	pub fn text(&self) -> Option<String> {
		self.text.lock().clone()
	}

	/// Replaces the inner text and records [`SetInnerHtml`](`crate::mutation::MutationCode::SetInnerHtml`).
	#[instrument(skip_all, fields(component = %self.id))]
	pub fn set_text(&self, text: Option<String>) {
		*self.text.lock() = text.clone();
		self.log.record(MutationPayload::SetInnerHtml { text });
	}

	/// Replaces the inner text without recording a mutation.
	pub fn set_text_silent(&self, text: Option<String>) {
		*self.text.lock() = text;
	}

	#[must_use]
	pub fn parent(&self) -> Option<Arc<Component>> {
		self.parent.lock().upgrade()
	}

	#[must_use]
	pub fn is_attached(&self) -> bool {
		self.parent().is_some()
	}

	/// Id of the top-most component of the live tree this component was last attached under.
	#[must_use]
	pub fn root_id(&self) -> ComponentId {
		self.root.lock().clone().unwrap_or_else(|| self.id.clone())
	}

	/// Records `owner` as parent, unless there already is one.
	pub(crate) fn claim_parent(&self, owner: &Arc<Component>) -> Result<(), TreeError> {
		let mut parent = self.parent.lock();
		if let Some(existing) = parent.upgrade() {
			return Err(TreeError::AlreadyAttached {
				child: self.id.clone(),
				parent: existing.id().clone(),
			});
		}
		*parent = Arc::downgrade(owner);
		Ok(())
	}

	pub(crate) fn set_root(&self, root: Option<ComponentId>) {
		*self.root.lock() = root;
	}

	pub(crate) fn detach(&self) {
		*self.parent.lock() = Weak::new();
		self.set_root(None);
		trace!(component = %self.id, "Detached.");
	}
}

/// Collects a component's initial state.
///
/// Initial state is not a change, so nothing built here shows up in the new component's [`MutationLog`].
#[must_use]
pub struct ComponentBuilder {
	id: Option<ComponentId>,
	tag: String,
	key: Option<Key>,
	props: Attributes,
	style: Attributes,
	text: Option<String>,
	children: Vec<Arc<Component>>,
	behavior: Option<Box<dyn Behavior>>,
}
impl ComponentBuilder {
	/// Defaults to a process-unique `c<n>`.
	pub fn id(mut self, id: impl Into<ComponentId>) -> Self {
		self.id = Some(id.into());
		self
	}

	pub fn key(mut self, key: impl Into<Key>) -> Self {
		self.key = Some(key.into());
		self
	}

	pub fn prop(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.props.insert(name.into(), value.into());
		self
	}

	pub fn style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.style.insert(name.into(), value.into());
		self
	}

	pub fn text(mut self, text: impl Into<String>) -> Self {
		self.text = Some(text.into());
		self
	}

	pub fn child(mut self, child: Arc<Component>) -> Self {
		self.children.push(child);
		self
	}

	pub fn children(mut self, children: impl IntoIterator<Item = Arc<Component>>) -> Self {
		self.children.extend(children);
		self
	}

	/// Defaults to [`Element`].
	pub fn behavior(mut self, behavior: impl Behavior + 'static) -> Self {
		self.behavior = Some(Box::new(behavior));
		self
	}

	/// # Errors
	///
	/// Iff a child can't be attached, see [`ChildrenList::insert`].
	pub fn build(self) -> Result<Arc<Component>, TreeError> {
		let id = self.id.unwrap_or_else(next_id);
		let log = Arc::new(MutationLog::new(id.clone()));
		let observer: Arc<dyn StoreObserver> = log.clone();
		let component = Arc::new_cyclic(|this| Component {
			props: ObservableMap::new(StoreKind::Props, Some(observer.clone())),
			style: ObservableMap::new(StoreKind::Style, Some(observer)),
			children: ChildrenList::new(this.clone(), log.clone()),
			text: Mutex::new(self.text),
			parent: Mutex::new(Weak::new()),
			root: Mutex::new(None),
			behavior: self.behavior.unwrap_or_else(|| Box::new(Element)),
			id,
			tag: self.tag,
			key: self.key,
			log,
		});
		for (name, value) in self.props {
			component.props.set_silent(name, value);
		}
		for (name, value) in self.style {
			component.style.set_silent(name, value);
		}
		for child in self.children {
			component.children.push(child)?;
		}
		drop(component.log.drain());
		Ok(component)
	}
}
