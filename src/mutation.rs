//! Recorded changes, pending the next flush.

use crate::{
	children::ChildrenObserver,
	component::Component,
	node::ComponentId,
	store::{StoreKind, StoreObserver},
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

/// Closed set of mutation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MutationCode {
	DeleteChild = 0,
	InsertChild = 1,
	DeleteProp = 2,
	SetProp = 3,
	DeleteStyle = 4,
	SetStyle = 5,
	SetInnerHtml = 6,
}
impl MutationCode {
	/// Whether this mutation changes the shape of the tree rather than the content of one node.
	#[must_use]
	pub fn is_structural(self) -> bool {
		matches!(self, Self::DeleteChild | Self::InsertChild)
	}
}

/// Payload of a [`Mutation`], by kind.
#[derive(Debug, Clone)]
pub enum MutationPayload {
	DeleteChild { index: usize, child: Arc<Component> },
	InsertChild { index: usize, child: Arc<Component> },
	DeleteProp { key: String },
	SetProp { key: String, value: String },
	DeleteStyle { key: String },
	SetStyle { key: String, value: String },
	SetInnerHtml { text: Option<String> },
}

/// One recorded change to a component. Never modified after creation.
#[derive(Debug, Clone)]
pub struct Mutation {
	target: ComponentId,
	payload: MutationPayload,
}
impl Mutation {
	#[must_use]
	pub fn new(target: ComponentId, payload: MutationPayload) -> Self {
		Self { target, payload }
	}

	#[must_use]
	pub fn target(&self) -> &ComponentId {
		&self.target
	}

	#[must_use]
	pub fn payload(&self) -> &MutationPayload {
		&self.payload
	}

	#[must_use]
	pub fn code(&self) -> MutationCode {
		match self.payload {
			MutationPayload::DeleteChild { .. } => MutationCode::DeleteChild,
			MutationPayload::InsertChild { .. } => MutationCode::InsertChild,
			MutationPayload::DeleteProp { .. } => MutationCode::DeleteProp,
			MutationPayload::SetProp { .. } => MutationCode::SetProp,
			MutationPayload::DeleteStyle { .. } => MutationCode::DeleteStyle,
			MutationPayload::SetStyle { .. } => MutationCode::SetStyle,
			MutationPayload::SetInnerHtml { .. } => MutationCode::SetInnerHtml,
		}
	}
}

/// Ordered mutations of one component since the last flush.
///
/// The log is the observer of its component's stores and children list.
#[derive(Debug)]
pub struct MutationLog {
	target: ComponentId,
	entries: Mutex<Vec<Mutation>>,
}
impl MutationLog {
	#[must_use]
	pub fn new(target: ComponentId) -> Self {
		Self {
			target,
			entries: Mutex::new(Vec::new()),
		}
	}

	pub fn record(&self, payload: MutationPayload) {
		let mutation = Mutation::new(self.target.clone(), payload);
		trace!(target_id = %self.target, code = ?mutation.code(), "Recorded mutation.");
		self.entries.lock().push(mutation);
	}

	/// Takes all pending mutations, in recording order.
	#[must_use]
	pub fn drain(&self) -> Vec<Mutation> {
		core::mem::take(&mut *self.entries.lock())
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	/// Copies of the pending codes, for inspection.
	#[must_use]
	pub fn codes(&self) -> Vec<MutationCode> {
		self.entries.lock().iter().map(Mutation::code).collect()
	}
}

impl StoreObserver for MutationLog {
	fn on_set_item(&self, kind: StoreKind, key: &str, value: &str) {
		let (key, value) = (key.to_owned(), value.to_owned());
		self.record(match kind {
			StoreKind::Props => MutationPayload::SetProp { key, value },
			StoreKind::Style => MutationPayload::SetStyle { key, value },
		});
	}

	fn on_delete_item(&self, kind: StoreKind, key: &str) {
		let key = key.to_owned();
		self.record(match kind {
			StoreKind::Props => MutationPayload::DeleteProp { key },
			StoreKind::Style => MutationPayload::DeleteStyle { key },
		});
	}
}

impl ChildrenObserver for MutationLog {
	fn on_new_child(&self, index: usize, child: &Arc<Component>) {
		self.record(MutationPayload::InsertChild { index, child: Arc::clone(child) });
	}

	fn on_delete_child(&self, index: usize, child: &Arc<Component>) {
		self.record(MutationPayload::DeleteChild { index, child: Arc::clone(child) });
	}
}
