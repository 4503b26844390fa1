//! Remote script execution, correlated by id and bounded by timeouts.

use crate::{
	error::{ExecutionError, TransportError},
	wire::{encode, CorrelationId, ExecutionOutcome, Message, ScriptType},
};
use core::{
	sync::atomic::{AtomicU64, Ordering},
	time::Duration,
};
use hashbrown::HashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::{
	sync::{mpsc::UnboundedSender, oneshot},
	time::{timeout, Instant},
};
use tracing::{debug, instrument, trace, warn};

/// Delivers frames to one client.
///
/// Sending must not block. Frames of one sender are delivered in order.
pub trait Transport: Send + Sync {
	/// # Errors
	///
	/// [`TransportError::Closed`] if the client can't be reached anymore.
	fn send(&self, frame: Vec<u8>) -> Result<(), TransportError>;
}

impl Transport for UnboundedSender<Vec<u8>> {
	fn send(&self, frame: Vec<u8>) -> Result<(), TransportError> {
		UnboundedSender::send(self, frame).map_err(|_| TransportError::Closed)
	}
}

/// Adapts a closure into a [`Transport`].
pub struct FnTransport<F>(pub F);
impl<F> Transport for FnTransport<F>
where
	F: Fn(Vec<u8>) -> Result<(), TransportError> + Send + Sync,
{
	fn send(&self, frame: Vec<u8>) -> Result<(), TransportError> {
		(self.0)(frame)
	}
}

struct PendingSlot {
	sender: oneshot::Sender<Result<Value, ExecutionError>>,
	deadline: Instant,
	after: Duration,
}

/// Tracks outstanding [`ExecuteJs`](`Message::ExecuteJs`) requests of one session.
///
/// Any number of requests may be outstanding at once and results may arrive in any order.
#[derive(Default)]
pub struct RemoteExecutor {
	next_id: AtomicU64,
	pending: Mutex<HashMap<CorrelationId, PendingSlot>>,
}

impl core::fmt::Debug for RemoteExecutor {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("RemoteExecutor").field("pending", &self.pending_count()).finish_non_exhaustive()
	}
}

/// Removes a slot when its waiter stops waiting, whether it got a result, timed out or was dropped.
struct SlotGuard<'a> {
	executor: &'a RemoteExecutor,
	id: CorrelationId,
}
impl Drop for SlotGuard<'_> {
	fn drop(&mut self) {
		self.executor.pending.lock().remove(&self.id);
	}
}

impl RemoteExecutor {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Sends `code` for execution and waits for its result.
	///
	/// No message is sent to the client when the wait times out. A result arriving afterwards is dropped.
	///
	/// # Errors
	///
	/// - [`ExecutionError::ScriptFault`] if the script threw on the client,
	/// - [`ExecutionError::Timeout`] if no result arrived within `after`,
	/// - [`ExecutionError::Disconnected`] if [`cancel_all`](`RemoteExecutor::cancel_all`) was called first,
	/// - [`ExecutionError::Transport`] if the request couldn't be sent.
	#[instrument(skip(self, transport, code))]
	pub async fn execute_js(&self, transport: &dyn Transport, code: &str, script_type: ScriptType, after: Duration) -> Result<Value, ExecutionError> {
		let id = CorrelationId(self.next_id.fetch_add(1, Ordering::Relaxed));
		let frame = encode(&Message::ExecuteJs {
			id,
			code: code.to_owned(),
			script_type,
		})
		.map_err(|error| ExecutionError::Encoding(error.to_string()))?;

		let (sender, receiver) = oneshot::channel();
		self.pending.lock().insert(
			id,
			PendingSlot {
				sender,
				deadline: Instant::now() + after,
				after,
			},
		);
		let _guard = SlotGuard { executor: self, id };

		transport.send(frame).map_err(|error| {
			warn!(%id, "Could not send script.");
			ExecutionError::from(error)
		})?;
		debug!(%id, "Sent script.");

		match timeout(after, receiver).await {
			Ok(Ok(result)) => result,
			Ok(Err(_)) => Err(ExecutionError::Disconnected),
			Err(_) => {
				debug!(%id, "Timed out.");
				Err(ExecutionError::Timeout { correlation: id, after })
			}
		}
	}

	/// Runs `code`, then retrieves the value of the JavaScript variable `variable`.
	///
	/// An `undefined` variable is reported as [`Value::Null`].
	///
	/// # Errors
	///
	/// [`ExecutionError::InvalidVariable`] if `variable` isn't an identifier, otherwise as [`execute_js`](`RemoteExecutor::execute_js`).
	pub async fn get_js_result(&self, transport: &dyn Transport, code: &str, variable: &str, after: Duration) -> Result<Value, ExecutionError> {
		if !is_identifier(variable) {
			return Err(ExecutionError::InvalidVariable(variable.to_owned()));
		}
		let code = format!("{}\nreturn (typeof {v} === 'undefined') ? null : {v};", code, v = variable);
		self.execute_js(transport, &code, ScriptType::Classic, after).await
	}

	/// Delivers a client-reported outcome to its waiter.
	///
	/// Returns whether a waiter received it. Results for unknown or expired ids are dropped.
	///
	/// A result past its deadline still times its waiter out, even if the waiter's timer hasn't fired yet.
	pub fn resolve(&self, id: CorrelationId, outcome: ExecutionOutcome) -> bool {
		let Some(slot) = self.pending.lock().remove(&id) else {
			debug!(%id, "Dropped result for an unknown or expired execution.");
			return false;
		};
		if Instant::now() > slot.deadline {
			debug!(%id, "Dropped late result.");
			drop(slot.sender.send(Err(ExecutionError::Timeout { correlation: id, after: slot.after })));
			return false;
		}
		let result = match outcome {
			ExecutionOutcome::Value(value) => Ok(value),
			ExecutionOutcome::Error(message) => Err(ExecutionError::ScriptFault(message)),
		};
		let delivered = slot.sender.send(result).is_ok();
		trace!(%id, delivered, "Resolved.");
		delivered
	}

	/// Fails every outstanding request with [`ExecutionError::Disconnected`] and returns how many there were.
	pub fn cancel_all(&self) -> usize {
		let drained: Vec<_> = self.pending.lock().drain().collect();
		let count = drained.len();
		for (_, slot) in drained {
			drop(slot.sender.send(Err(ExecutionError::Disconnected)));
		}
		if count > 0 {
			debug!(count, "Cancelled pending executions.");
		}
		count
	}

	#[must_use]
	pub fn pending_count(&self) -> usize {
		self.pending.lock().len()
	}
}

fn is_identifier(name: &str) -> bool {
	let mut chars = name.chars();
	chars.next().map_or(false, |first| first.is_alphabetic() || first == '_' || first == '$') && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
