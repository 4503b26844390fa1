//! Engine settings.

use crate::diff::DEFAULT_DEPTH_LIMIT;
use core::time::Duration;
use serde::{Deserialize, Serialize};

/// Settings shared by all sessions of one engine.
///
/// Every field is optional when deserializing:
///
/// ```
/// let config = live_dom::EngineConfig::from_json(r#"{ "js_timeout_ms": 250 }"#).unwrap();
/// assert_eq!(config.js_timeout_ms, 250);
/// assert!(config.auto_flush);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
	/// Default timeout for remote script execution.
	pub js_timeout_ms: u64,
	/// Default timeout for client navigation.
	pub navigation_timeout_ms: u64,
	/// How many levels below a session's root node are diffed node by node.
	/// Deeper differences replace the whole remaining subtree.
	pub depth_limit: usize,
	/// Whether a handled client event is followed by a flush.
	pub auto_flush: bool,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			js_timeout_ms: 5000,
			navigation_timeout_ms: 10_000,
			depth_limit: DEFAULT_DEPTH_LIMIT,
			auto_flush: true,
		}
	}
}

impl EngineConfig {
	/// # Errors
	///
	/// Iff `json` isn't a valid configuration object.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	#[must_use]
	pub fn js_timeout(&self) -> Duration {
		Duration::from_millis(self.js_timeout_ms)
	}

	#[must_use]
	pub fn navigation_timeout(&self) -> Duration {
		Duration::from_millis(self.navigation_timeout_ms)
	}
}
