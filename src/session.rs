//! One connected client: flushing, message routing and remote requests.

use crate::{
	component::Component,
	config::EngineConfig,
	diff::{apply_all, replay, LoggedChanges, Reconciler},
	error::{ExecutionError, NavigationError, SessionError},
	load::{load_component, LiveNode},
	node::{ComponentId, Node},
	registry::{LiveRegistry, RootId},
	remote::{RemoteExecutor, Transport},
	wire::{decode, encode, encode_patches, Message, ScriptType},
};
use core::{
	sync::atomic::{AtomicU64, Ordering},
	time::Duration,
};
use hashbrown::HashSet;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::Arc;
use tokio::{sync::oneshot, time::timeout};
use tracing::{debug, error, instrument, trace, warn};

/// What the client reported after a [`navigate_to`](`Session::navigate_to`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationResult {
	pub success: bool,
	/// Where the client ended up, after redirects.
	pub url: String,
}

struct PendingNavigation {
	generation: u64,
	sender: oneshot::Sender<NavigationResult>,
}

struct FlushState {
	reconciler: Reconciler,
	/// What the client's mount holds, as far as the server knows.
	acknowledged: Vec<Node>,
	/// Set whenever log replay can't be trusted to bring the client up to date.
	needs_diff: bool,
}

/// Drives one live root for one connected client.
///
/// All methods take `&self`. Flushes are serialized per session and never suspend.
pub struct Session {
	root_id: RootId,
	root: Arc<Component>,
	registry: Arc<LiveRegistry>,
	transport: RwLock<Arc<dyn Transport>>,
	config: EngineConfig,
	executor: RemoteExecutor,
	flush_state: Mutex<FlushState>,
	navigation: Mutex<Option<PendingNavigation>>,
	next_navigation: AtomicU64,
}

impl core::fmt::Debug for Session {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Session")
			.field("root_id", &self.root_id)
			.field("root", self.root.id())
			.field("executor", &self.executor)
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

impl Session {
	/// Nothing is sent or registered until the first [`flush`](`Session::flush`), which mounts `root` on the client.
	#[must_use]
	pub fn new(root_id: RootId, root: Arc<Component>, registry: Arc<LiveRegistry>, transport: Arc<dyn Transport>, config: EngineConfig) -> Self {
		debug!(%root_id, root = %root.id(), "Creating session.");
		Self {
			flush_state: Mutex::new(FlushState {
				reconciler: Reconciler::new(config.depth_limit),
				acknowledged: Vec::new(),
				needs_diff: true,
			}),
			root_id,
			root,
			registry,
			transport: RwLock::new(transport),
			config,
			executor: RemoteExecutor::new(),
			navigation: Mutex::new(None),
			next_navigation: AtomicU64::new(0),
		}
	}

	#[must_use]
	pub fn root_id(&self) -> &RootId {
		&self.root_id
	}

	#[must_use]
	pub fn root(&self) -> &Arc<Component> {
		&self.root
	}

	#[must_use]
	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	#[must_use]
	pub fn executor(&self) -> &RemoteExecutor {
		&self.executor
	}

	/// The root node the client is believed to hold, if anything is mounted.
	#[must_use]
	pub fn acknowledged(&self) -> Option<Node> {
		self.flush_state.lock().acknowledged.first().cloned()
	}

	/// Looks up an activated component of this session.
	#[must_use]
	pub fn lookup(&self, id: &ComponentId) -> Option<Arc<Component>> {
		self.registry.lookup(&self.root_id, id)
	}

	fn transport(&self) -> Arc<dyn Transport> {
		self.transport.read().clone()
	}

	fn send(&self, message: &Message) -> Result<(), SessionError> {
		let frame = encode(message)?;
		self.transport().send(frame)?;
		Ok(())
	}

	/// Brings the client up to date with the live tree and returns the number of patches sent.
	///
	/// Drains every mutation log below the root, activates components seen for the first time
	/// and unregisters components that are no longer attached below the root.
	/// If only content changed since the last flush, patches are replayed from the logs. Otherwise the live tree is diffed.
	///
	/// # Errors
	///
	/// If the patches can't be encoded or sent. The next flush then diffs the whole tree again.
	#[instrument(skip(self), fields(root = %self.root_id))]
	pub fn flush(&self) -> Result<usize, SessionError> {
		let mut state = self.flush_state.lock();

		let mut changes = Vec::new();
		let mut seen = HashSet::new();
		let mut opaque = false;
		let mut activated = 0_usize;
		let mut stack = vec![(Arc::clone(&self.root), vec![0])];
		while let Some((component, path)) = stack.pop() {
			seen.insert(Arc::as_ptr(&component));
			if self.activate(&component) {
				activated += 1;
			}
			opaque |= component.behavior().is_custom_render();

			let mutations = component.log().drain();
			for (i, child) in component.children().to_vec().into_iter().enumerate().rev() {
				let mut child_path = path.clone();
				child_path.push(i);
				stack.push((child, child_path));
			}
			if !mutations.is_empty() {
				changes.push(LoggedChanges { path, component, mutations });
			}
		}

		// Whatever the walk didn't reach is detached, however deep inside a removed subtree it was removed.
		let mut unregistered = 0_usize;
		for component in self.registry.components(&self.root_id) {
			if seen.contains(&Arc::as_ptr(&component)) {
				continue;
			}
			drop(component.log().drain());
			if self.registry.unregister_if_same(&self.root_id, &component) {
				unregistered += 1;
			}
		}

		let full = state.needs_diff || opaque || state.acknowledged.len() != 1;
		let replayed = if full { None } else { replay(&changes) };
		let patches = if let Some(patches) = replayed {
			patches
		} else {
			trace!(needs_diff = state.needs_diff, opaque, "Diffing the live tree.");
			let live = LiveNode::new(Arc::clone(&self.root));
			let FlushState { reconciler, acknowledged, .. } = &mut *state;
			reconciler.diff(acknowledged.first(), Some(&live))
		};

		if patches.is_empty() {
			state.needs_diff = false;
			trace!(activated, unregistered, "Nothing to flush.");
			return Ok(0);
		}

		state.needs_diff = true;
		let frame = encode_patches(&self.root_id, &patches)?;
		self.transport().send(frame).map_err(|error| {
			warn!(%error, "Could not send patches, the next flush will diff again.");
			error
		})?;

		if let Err(error) = apply_all(&mut state.acknowledged, &patches) {
			error!(%error, "Sent patches don't fit the acknowledged snapshot.");
			state.acknowledged = vec![load_component(&self.root)];
		}
		state.needs_diff = false;

		debug!(count = patches.len(), activated, unregistered, "Flushed.");
		Ok(patches.len())
	}

	/// Registers `component` and calls its [`on_create`](`crate::behavior::Behavior::on_create`) if it isn't active yet.
	fn activate(&self, component: &Arc<Component>) -> bool {
		match self.registry.lookup(&self.root_id, component.id()) {
			Some(existing) if Arc::ptr_eq(&existing, component) => false,
			Some(_) => {
				warn!(id = %component.id(), "Another component is registered under the same id, not activating.");
				false
			}
			None => match self.registry.register(&self.root_id, Arc::clone(component)) {
				Ok(()) => {
					component.behavior().on_create(component);
					trace!(id = %component.id(), kind = component.behavior().kind(), "Activated.");
					true
				}
				Err(error) => {
					warn!(%error, "Could not activate.");
					false
				}
			},
		}
	}

	/// Handles one frame from the client.
	///
	/// # Errors
	///
	/// - [`SessionError::Codec`] if the frame can't be decoded,
	/// - [`SessionError::UnexpectedMessage`] for server-to-client messages,
	/// - errors of the [`flush`](`Session::flush`) that follows a handled event, if [`auto_flush`](`EngineConfig::auto_flush`) is enabled,
	/// - [`SessionError::Transport`] if a `COMPONENT_UNKNOWN` reply can't be sent.
	#[instrument(skip_all, fields(root = %self.root_id))]
	pub fn on_receive(&self, frame: &[u8]) -> Result<(), SessionError> {
		match decode(frame)? {
			Message::DispatchComponentEvent { component: id, event } => match self.lookup(&id) {
				Some(component) => {
					trace!(%id, event = %event.name, "Dispatching event.");
					component.behavior().on_event(&component, &event);
					if self.config.auto_flush {
						self.flush()?;
					}
				}
				None => {
					debug!(%id, event = %event.name, "Event for an unknown component.");
					self.send(&Message::ComponentUnknown { component: id })?;
				}
			},
			Message::JsExecutionResult { id, outcome } => {
				self.executor.resolve(id, outcome);
			}
			Message::NavigationResult { success, url } => match self.navigation.lock().take() {
				Some(pending) => drop(pending.sender.send(NavigationResult { success, url })),
				None => debug!("Dropped an unexpected navigation result."),
			},
			message @ (Message::ApplyPatch { .. } | Message::ExecuteJs { .. } | Message::NavigateTo { .. } | Message::ComponentUnknown { .. }) => {
				return Err(SessionError::UnexpectedMessage(message.opcode()));
			}
		}
		Ok(())
	}

	/// Runs `code` on the client. `after` defaults to [`js_timeout_ms`](`EngineConfig::js_timeout_ms`).
	///
	/// # Errors
	///
	/// See [`RemoteExecutor::execute_js`].
	pub async fn execute_js(&self, code: &str, after: Option<Duration>) -> Result<Value, ExecutionError> {
		self.execute_script(code, ScriptType::Classic, after).await
	}

	/// # Errors
	///
	/// See [`RemoteExecutor::execute_js`].
	pub async fn execute_script(&self, code: &str, script_type: ScriptType, after: Option<Duration>) -> Result<Value, ExecutionError> {
		let transport = self.transport();
		let after = after.unwrap_or_else(|| self.config.js_timeout());
		self.executor.execute_js(&*transport, code, script_type, after).await
	}

	/// Runs `code` on the client, then retrieves the value of the variable `variable`.
	///
	/// # Errors
	///
	/// See [`RemoteExecutor::get_js_result`].
	pub async fn get_js_result(&self, code: &str, variable: &str, after: Option<Duration>) -> Result<Value, ExecutionError> {
		let transport = self.transport();
		let after = after.unwrap_or_else(|| self.config.js_timeout());
		self.executor.get_js_result(&*transport, code, variable, after).await
	}

	/// Asks the client to navigate to `url` and waits for the outcome.
	///
	/// Only one navigation is pending at a time. Starting another fails the previous one with [`NavigationError::Disconnected`].
	///
	/// # Errors
	///
	/// - [`NavigationError::Timeout`] if no result arrived in time (`after` defaults to [`navigation_timeout_ms`](`EngineConfig::navigation_timeout_ms`)),
	/// - [`NavigationError::Disconnected`] if superseded or torn down,
	/// - [`NavigationError::Transport`] if the request couldn't be sent.
	#[instrument(skip(self))]
	pub async fn navigate_to(&self, url: &str, after: Option<Duration>) -> Result<NavigationResult, NavigationError> {
		let after = after.unwrap_or_else(|| self.config.navigation_timeout());
		let frame = encode(&Message::NavigateTo { url: url.to_owned() }).map_err(|error| NavigationError::Encoding(error.to_string()))?;

		let generation = self.next_navigation.fetch_add(1, Ordering::Relaxed);
		let (sender, receiver) = oneshot::channel();
		if self.navigation.lock().replace(PendingNavigation { generation, sender }).is_some() {
			debug!("Superseded a pending navigation.");
		}

		if let Err(error) = self.transport().send(frame) {
			self.clear_navigation(generation);
			return Err(error.into());
		}

		match timeout(after, receiver).await {
			Ok(Ok(result)) => Ok(result),
			Ok(Err(_)) => Err(NavigationError::Disconnected),
			Err(_) => {
				self.clear_navigation(generation);
				debug!("Navigation timed out.");
				Err(NavigationError::Timeout(after))
			}
		}
	}

	fn clear_navigation(&self, generation: u64) {
		let mut pending = self.navigation.lock();
		if pending.as_ref().map_or(false, |pending| pending.generation == generation) {
			*pending = None;
		}
	}

	/// Continues the session over a new connection.
	///
	/// The next [`flush`](`Session::flush`) diffs the whole live tree against the acknowledged snapshot.
	#[instrument(skip_all, fields(root = %self.root_id))]
	pub fn resume(&self, transport: Arc<dyn Transport>) {
		*self.transport.write() = transport;
		self.flush_state.lock().needs_diff = true;
		debug!("Resumed.");
	}

	/// Replaces what the client is believed to hold, for example after it reported its state on reconnection.
	///
	/// `None` means an empty mount, so the next [`flush`](`Session::flush`) mounts the whole tree again.
	pub fn reset_client(&self, snapshot: Option<Node>) {
		let mut state = self.flush_state.lock();
		state.acknowledged = snapshot.into_iter().collect();
		state.needs_diff = true;
	}

	/// Unregisters all of this session's components and fails everything still pending.
	///
	/// Returns the number of registry entries removed.
	#[instrument(skip_all, fields(root = %self.root_id))]
	pub fn teardown(&self) -> usize {
		let removed = self.registry.remove_root(&self.root_id);
		let cancelled = self.executor.cancel_all();
		let navigation = self.navigation.lock().take().is_some();
		debug!(removed, cancelled, navigation, "Torn down.");
		removed
	}
}
