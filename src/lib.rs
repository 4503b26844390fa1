#![doc(html_root_url = "https://docs.rs/live-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod behavior;
pub mod children;
pub mod component;
pub mod config;
pub mod diff;
pub mod error;
pub mod load;
pub mod mutation;
pub mod node;
pub mod registry;
pub mod remote;
pub mod session;
pub mod store;
mod temp_set;
pub mod wire;

pub use behavior::{Behavior, ComponentEvent};
pub use component::Component;
pub use config::EngineConfig;
pub use diff::{apply, diff, diff_and_act, Patch, Reconciler};
pub use load::LiveNode;
pub use node::{ComponentId, Key, Node};
pub use registry::{LiveRegistry, RootId};
pub use session::Session;
