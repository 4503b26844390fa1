//! Loading snapshot trees from live components.

use crate::{
	component::Component,
	node::{Attributes, Key, Node, SnapshotSource},
};
use std::{borrow::Cow, sync::Arc};

/// A lazily evaluated view of a live component.
///
/// Nothing is read from the component until the reconciler asks for it, so a diff only touches the parts of the live tree it visits.
/// Components with a custom [`render`](`crate::behavior::Behavior::render`) are rendered once, when their `LiveNode` is created.
#[derive(Debug, Clone)]
pub enum LiveNode {
	Component(Arc<Component>),
	Rendered(Node),
}
impl LiveNode {
	#[must_use]
	pub fn new(component: Arc<Component>) -> Self {
		match component.behavior().render(&component) {
			Some(rendered) => Self::Rendered(rendered),
			None => Self::Component(component),
		}
	}

	#[must_use]
	pub fn component(&self) -> Option<&Arc<Component>> {
		match self {
			LiveNode::Component(component) => Some(component),
			LiveNode::Rendered(_) => None,
		}
	}
}

impl SnapshotSource for LiveNode {
	fn tag(&self) -> String {
		match self {
			LiveNode::Component(component) => component.tag().to_owned(),
			LiveNode::Rendered(node) => node.tag.clone(),
		}
	}

	fn key(&self) -> Option<Key> {
		match self {
			LiveNode::Component(component) => component.key().cloned(),
			LiveNode::Rendered(node) => node.key.clone(),
		}
	}

	fn props(&self) -> Attributes {
		match self {
			LiveNode::Component(component) => component.props().snapshot(),
			LiveNode::Rendered(node) => node.props.clone(),
		}
	}

	fn style(&self) -> Attributes {
		match self {
			LiveNode::Component(component) => component.style().snapshot(),
			LiveNode::Rendered(node) => node.style.clone(),
		}
	}

	fn text(&self) -> Option<String> {
		match self {
			LiveNode::Component(component) => component.text(),
			LiveNode::Rendered(node) => node.text.clone(),
		}
	}

	fn children(&self) -> Vec<Cow<'_, Self>> {
		match self {
			LiveNode::Component(component) => component.children().to_vec().into_iter().map(|child| Cow::Owned(LiveNode::new(child))).collect(),
			LiveNode::Rendered(node) => node.children.iter().map(|child| Cow::Owned(LiveNode::Rendered(child.clone()))).collect(),
		}
	}

	fn snapshot(&self) -> Node {
		match self {
			LiveNode::Component(component) => load_component(component),
			LiveNode::Rendered(node) => node.clone(),
		}
	}
}

/// Materializes `component` and its subtree.
///
/// Builds bottom-up with an explicit stack, so deep live trees don't exhaust the call stack.
#[must_use]
pub fn load_component(component: &Arc<Component>) -> Node {
	let mut built: Vec<Node> = Vec::new();
	let mut stack = vec![(Arc::clone(component), None)];
	while let Some((component, child_count)) = stack.pop() {
		let Some(child_count) = child_count else {
			if let Some(rendered) = component.behavior().render(&component) {
				built.push(rendered);
				continue;
			}
			let children = component.children().to_vec();
			stack.push((Arc::clone(&component), Some(children.len())));
			// Reversed, so that children land on `built` in order.
			stack.extend(children.into_iter().rev().map(|child| (child, None)));
			continue;
		};

		let children = built.split_off(built.len() - child_count);
		built.push(Node {
			tag: component.tag().to_owned(),
			key: component.key().cloned(),
			props: component.props().snapshot(),
			style: component.style().snapshot(),
			children,
			text: component.text(),
			component: Some(component.id().clone()),
		});
	}
	// Exactly the root is left.
	built.swap_remove(0)
}
