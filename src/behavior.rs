//! Component capabilities.
//!
//! Every [`Component`] carries one [`Behavior`] that decides how it renders and how it reacts to client events.
//! Containers aren't a separate kind: any component can hold children, whatever its behavior.

use crate::{component::Component, node::Node};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

/// An event dispatched from the client to one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentEvent {
	pub name: String,
	#[serde(default)]
	pub data: Value,
}
impl ComponentEvent {
	#[must_use]
	pub fn new(name: impl Into<String>, data: Value) -> Self {
		Self { name: name.into(), data }
	}
}

pub trait Behavior: Send + Sync {
	/// Short name for logs.
	fn kind(&self) -> &'static str {
		"element"
	}

	/// Called once when the component is first activated under a live session.
	fn on_create(&self, _component: &Component) {}

	/// Custom rendering.
	///
	/// `None` (the default) means the component is rendered from its own tag, stores, text and children.
	/// `Some` replaces all of that for this subtree, so child components are then not rendered unless the returned node includes them.
	fn render(&self, _component: &Component) -> Option<Node> {
		None
	}

	/// Whether [`render`](`Behavior::render`) returns `Some`.
	///
	/// Sessions ask this on every flush instead of rendering, so it must agree with `render`.
	fn is_custom_render(&self) -> bool {
		false
	}

	fn on_event(&self, component: &Arc<Component>, event: &ComponentEvent) {
		trace!(component = %component.id(), event = %event.name, kind = self.kind(), "Unhandled event.");
	}
}

/// A plain element without event handling.
#[derive(Debug, Default, Clone, Copy)]
pub struct Element;
impl Behavior for Element {}

/// A form control.
///
/// `input` and `change` events carry the client's current `value` (and `checked`) state,
/// which is mirrored into the component's properties silently: the client already shows it.
#[derive(Debug, Default, Clone, Copy)]
pub struct Input;
impl Behavior for Input {
	fn kind(&self) -> &'static str {
		"input"
	}

	fn on_event(&self, component: &Arc<Component>, event: &ComponentEvent) {
		if event.name != "input" && event.name != "change" {
			return trace!(component = %component.id(), event = %event.name, "Ignored input event.");
		}
		if let Some(value) = event.data.get("value").and_then(Value::as_str) {
			component.props().set_silent("value", value);
		}
		match event.data.get("checked").and_then(Value::as_bool) {
			Some(true) => component.props().set_silent("checked", ""),
			Some(false) => drop(component.props().delete_silent("checked")),
			None => (),
		}
		if cfg!(feature = "dangerous-logging") {
			debug!(component = %component.id(), data = %event.data, "Mirrored input state.");
		} else {
			debug!(component = %component.id(), "Mirrored input state.");
		}
	}
}

/// Renders through a closure instead of from component state.
pub struct RenderFn<F>(pub F);
impl<F> Behavior for RenderFn<F>
where
	F: Fn(&Component) -> Node + Send + Sync,
{
	fn kind(&self) -> &'static str {
		"render_fn"
	}

	fn is_custom_render(&self) -> bool {
		true
	}

	fn render(&self, component: &Component) -> Option<Node> {
		let mut node = (self.0)(component);
		node.component.get_or_insert_with(|| component.id().clone());
		Some(node)
	}
}

/// Handles events through a closure.
pub struct Handler<F>(pub F);
impl<F> Behavior for Handler<F>
where
	F: Fn(&Arc<Component>, &ComponentEvent) + Send + Sync,
{
	fn kind(&self) -> &'static str {
		"handler"
	}

	fn on_event(&self, component: &Arc<Component>, event: &ComponentEvent) {
		(self.0)(component, event);
	}
}
