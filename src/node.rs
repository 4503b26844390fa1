//! Snapshot trees.

use core::fmt::{self, Display, Formatter};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Ordered string map used for properties and style.
pub type Attributes = IndexMap<String, String>;

/// Identifies a component. Unique within one live root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);
impl ComponentId {
	#[must_use]
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for ComponentId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
impl From<&str> for ComponentId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}
impl From<String> for ComponentId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

/// Reconciliation key of a node.
///
/// Equality is exact: `Key::Int(1)` and `Key::Str("1".into())` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
	Int(i64),
	Str(String),
}
impl From<i64> for Key {
	fn from(key: i64) -> Self {
		Self::Int(key)
	}
}
impl From<&str> for Key {
	fn from(key: &str) -> Self {
		Self::Str(key.to_owned())
	}
}
impl From<String> for Key {
	fn from(key: String) -> Self {
		Self::Str(key)
	}
}
impl Display for Key {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Key::Int(key) => write!(f, "{}", key),
			Key::Str(key) => write!(f, "{:?}", key),
		}
	}
}

/// One rendered element, frozen.
///
/// A new render produces new `Node`s, existing ones are never updated in place.
///
/// Equality is structural: `props` and `style` compare as sets of pairs and [`component`](`Node::component`) is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Node {
	pub tag: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub key: Option<Key>,
	#[serde(default, skip_serializing_if = "IndexMap::is_empty")]
	pub props: Attributes,
	#[serde(default, skip_serializing_if = "IndexMap::is_empty")]
	pub style: Attributes,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub children: Vec<Node>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub text: Option<String>,
	/// The component this node was rendered from. Lookup only.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub component: Option<ComponentId>,
}
impl Node {
	#[must_use]
	pub fn new(tag: impl Into<String>) -> Self {
		Self {
			tag: tag.into(),
			..Self::default()
		}
	}

	#[must_use]
	pub fn with_key(mut self, key: impl Into<Key>) -> Self {
		self.key = Some(key.into());
		self
	}

	#[must_use]
	pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.props.insert(name.into(), value.into());
		self
	}

	#[must_use]
	pub fn with_style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.style.insert(name.into(), value.into());
		self
	}

	#[must_use]
	pub fn with_text(mut self, text: impl Into<String>) -> Self {
		self.text = Some(text.into());
		self
	}

	#[must_use]
	pub fn with_child(mut self, child: Node) -> Self {
		self.children.push(child);
		self
	}

	#[must_use]
	pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
		self.children.extend(children);
		self
	}

	/// Number of nodes in this subtree, including `self`.
	#[must_use]
	pub fn subtree_len(&self) -> usize {
		let mut count = 0;
		let mut stack = vec![self];
		while let Some(node) = stack.pop() {
			count += 1;
			stack.extend(node.children.iter());
		}
		count
	}

	/// Resolves an index path relative to this node's children.
	#[must_use]
	pub fn descendant(&self, path: &[usize]) -> Option<&Node> {
		path.iter().try_fold(self, |node, &i| node.children.get(i))
	}
}
impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		self.tag == other.tag && self.key == other.key && self.text == other.text && self.props == other.props && self.style == other.style && self.children == other.children
	}
}
impl Eq for Node {}

/// Read access to one node of a tree that can be diffed.
///
/// Implemented by frozen [`Node`]s and by [`LiveNode`](`crate::load::LiveNode`)s, which derive everything from current component state on demand.
///
/// Children are returned as [`Cow`]s so that frozen trees can be walked without copying.
pub trait SnapshotSource: Clone {
	fn tag(&self) -> String;
	fn key(&self) -> Option<Key>;
	fn props(&self) -> Attributes;
	fn style(&self) -> Attributes;
	fn text(&self) -> Option<String>;
	fn children(&self) -> Vec<Cow<'_, Self>>;

	/// Materializes this node and its subtree.
	fn snapshot(&self) -> Node;
}

impl SnapshotSource for Node {
	fn tag(&self) -> String {
		self.tag.clone()
	}

	fn key(&self) -> Option<Key> {
		self.key.clone()
	}

	fn props(&self) -> Attributes {
		self.props.clone()
	}

	fn style(&self) -> Attributes {
		self.style.clone()
	}

	fn text(&self) -> Option<String> {
		self.text.clone()
	}

	fn children(&self) -> Vec<Cow<'_, Self>> {
		self.children.iter().map(Cow::Borrowed).collect()
	}

	fn snapshot(&self) -> Node {
		self.clone()
	}
}
