//! Error types, one per concern.
//!
//! Data-model errors ([`StoreError`], [`TreeError`], [`RegistryError`]) are returned synchronously to the mutating caller
//! and leave existing state unchanged.
//! Protocol-level errors ([`ExecutionError`], [`NavigationError`]) are delivered through the same future that would carry a success.

use crate::{
	node::ComponentId,
	registry::RootId,
	wire::{CorrelationId, Opcode},
};
use core::time::Duration;

/// Returned by [`ObservableMap`](`crate::store::ObservableMap`) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
	#[error("key {key:?} not found")]
	KeyNotFound { key: String },
}

/// Returned by [`ChildrenList`](`crate::children::ChildrenList`) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
	#[error("component {child} is already attached under {parent}")]
	AlreadyAttached { child: ComponentId, parent: ComponentId },
	#[error("inserting {child} under {parent} would create a cycle")]
	WouldCycle { child: ComponentId, parent: ComponentId },
	#[error("index {index} is out of bounds for {len} children")]
	IndexOutOfBounds { index: usize, len: usize },
	#[error("component {child} is not a child of {parent}")]
	ChildNotFound { child: ComponentId, parent: ComponentId },
	#[error("the owning component was dropped")]
	OwnerDropped,
}

/// Returned by [`apply`](`crate::diff::apply`) when a patch doesn't fit the structure it is applied to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
	#[error("no node at path {0:?}")]
	InvalidPath(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
	#[error("{id} is already registered under root {root}")]
	AlreadyInRegistry { root: RootId, id: ComponentId },
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
	#[error("empty frame")]
	Empty,
	#[error("unknown opcode {0}")]
	UnknownOpcode(u8),
	#[error("unknown patch code {0}")]
	UnknownPatchCode(u8),
	#[error("malformed payload: {0}")]
	Payload(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
	#[error("transport closed")]
	Closed,
}

/// Outcome of a failed remote script execution.
///
/// [`ScriptFault`](`ExecutionError::ScriptFault`) means the remote side ran the script and it threw,
/// [`Timeout`](`ExecutionError::Timeout`) means no reply arrived in time. Only the latter is generally worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
	#[error("remote script error: {0}")]
	ScriptFault(String),
	#[error("no result for execution {correlation} after {after:?}")]
	Timeout { correlation: CorrelationId, after: Duration },
	#[error("the session was torn down before a result arrived")]
	Disconnected,
	#[error(transparent)]
	Transport(#[from] TransportError),
	#[error("{0:?} is not a valid JavaScript identifier")]
	InvalidVariable(String),
	#[error("could not encode the request: {0}")]
	Encoding(String),
}

impl ExecutionError {
	#[must_use]
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
	#[error("no navigation result after {0:?}")]
	Timeout(Duration),
	#[error("navigation was superseded or the session was torn down")]
	Disconnected,
	#[error(transparent)]
	Transport(#[from] TransportError),
	#[error("could not encode the request: {0}")]
	Encoding(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
	#[error(transparent)]
	Codec(#[from] CodecError),
	#[error(transparent)]
	Transport(#[from] TransportError),
	#[error(transparent)]
	Registry(#[from] RegistryError),
	#[error("unexpected {0:?} message from the client")]
	UnexpectedMessage(Opcode),
}
