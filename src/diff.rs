//! Reconciliation of snapshot trees into [`Patch`]es.

use crate::{
	component::Component,
	error::PatchError,
	mutation::{Mutation, MutationCode},
	node::{Attributes, Node, SnapshotSource},
	temp_set::TempKeyMap,
};
use core::future::Future;
use std::{borrow::Cow, sync::Arc};
use tracing::{debug, info, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// How many levels below the root are diffed node by node unless configured otherwise.
pub const DEFAULT_DEPTH_LIMIT: usize = 512;

/// An index path relative to the mount. The root node is at `[0]`.
pub type Path = Vec<usize>;

/// Closed set of patch kinds, as numbered on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PatchCode {
	ReplaceNode = 0,
	RemoveNode = 1,
	InsertNode = 2,
	AlterText = 3,
	ReplaceProps = 4,
	ReplaceStyle = 5,
	MoveNode = 6,
}
impl TryFrom<u8> for PatchCode {
	type Error = u8;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		Ok(match value {
			0 => Self::ReplaceNode,
			1 => Self::RemoveNode,
			2 => Self::InsertNode,
			3 => Self::AlterText,
			4 => Self::ReplaceProps,
			5 => Self::ReplaceStyle,
			6 => Self::MoveNode,
			unknown => return Err(unknown),
		})
	}
}

/// One DOM-level instruction.
///
/// Paths are valid at the moment the patch is applied, provided all earlier patches of the same list were applied first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
	ReplaceNode { path: Path, node: Node },
	RemoveNode { path: Path },
	InsertNode { parent: Path, index: usize, node: Node },
	AlterText { path: Path, text: Option<String> },
	ReplaceProps { path: Path, props: Attributes },
	ReplaceStyle { path: Path, style: Attributes },
	/// Moves the child at `from` so that it ends up at `to`, shifting the siblings in between.
	MoveNode { parent: Path, from: usize, to: usize },
}
impl Patch {
	#[must_use]
	pub fn code(&self) -> PatchCode {
		match self {
			Patch::ReplaceNode { .. } => PatchCode::ReplaceNode,
			Patch::RemoveNode { .. } => PatchCode::RemoveNode,
			Patch::InsertNode { .. } => PatchCode::InsertNode,
			Patch::AlterText { .. } => PatchCode::AlterText,
			Patch::ReplaceProps { .. } => PatchCode::ReplaceProps,
			Patch::ReplaceStyle { .. } => PatchCode::ReplaceStyle,
			Patch::MoveNode { .. } => PatchCode::MoveNode,
		}
	}
}

/// Computes [`Patch`]es between two trees.
///
/// The instance keeps scratch space for key matching between calls,
/// so reusing one `Reconciler` per session avoids most per-flush allocations besides the patches themselves.
#[derive(Debug)]
pub struct Reconciler {
	depth_limit: usize,
	key_matches: TempKeyMap,
}
impl Default for Reconciler {
	fn default() -> Self {
		Self::new(DEFAULT_DEPTH_LIMIT)
	}
}
impl Reconciler {
	#[must_use]
	pub fn new(depth_limit: usize) -> Self {
		Self {
			depth_limit,
			key_matches: TempKeyMap::new(),
		}
	}

	#[must_use]
	pub fn depth_limit(&self) -> usize {
		self.depth_limit
	}

	/// Computes the patches that turn a client structure built from `old` into one matching `new`.
	///
	/// `None` stands for an empty mount.
	#[instrument(skip_all)]
	pub fn diff<O: SnapshotSource, N: SnapshotSource>(&mut self, old: Option<&O>, new: Option<&N>) -> Vec<Patch> {
		let mut patches = Vec::new();
		match (old, new) {
			(None, None) => (),
			(None, Some(new)) => patches.push(Patch::InsertNode {
				parent: Vec::new(),
				index: 0,
				node: new.snapshot(),
			}),
			(Some(_), None) => patches.push(Patch::RemoveNode { path: vec![0] }),
			(Some(old), Some(new)) => {
				let mut path = vec![0];
				self.diff_node(old, new, &mut path, self.depth_limit, &mut patches);
			}
		}

		debug!(count = patches.len(), "Computed patches.");
		info!("Diff heap capacity (keys): {}", self.key_matches.capacity());
		if STATIC_MAX_LEVEL >= Level::WARN && self.key_matches.capacity() >= 1000 {
			warn!(
				"The key matching heap capacity is large ({}).\n\
				This may point to very long keyed sibling lists.",
				self.key_matches.capacity()
			);
		}
		patches
	}

	/// Computes [`diff`](`Reconciler::diff`), then awaits `action` once per patch, in order.
	///
	/// Returns the number of patches acted on.
	///
	/// # Errors
	///
	/// The first error returned by `action`. Later patches are not acted on.
	pub async fn diff_and_act<O, N, F, Fut, E>(&mut self, mut action: F, old: Option<&O>, new: Option<&N>) -> Result<usize, E>
	where
		O: SnapshotSource,
		N: SnapshotSource,
		F: FnMut(Patch) -> Fut,
		Fut: Future<Output = Result<(), E>>,
	{
		let patches = self.diff(old, new);
		let count = patches.len();
		for (i, patch) in patches.into_iter().enumerate() {
			let code = patch.code();
			if let Err(error) = action(patch).await {
				warn!(index = i, ?code, remaining = count - i - 1, "Patch action failed, aborting.");
				return Err(error);
			}
		}
		Ok(count)
	}

	fn diff_node<O: SnapshotSource, N: SnapshotSource>(&mut self, old: &O, new: &N, path: &mut Path, depth_limit: usize, patches: &mut Vec<Patch>) {
		let tag = new.tag();
		let span = if cfg!(feature = "log-paths") {
			trace_span!("Diffing node", %tag, path = ?path)
		} else {
			trace_span!("Diffing node", %tag)
		};
		let _enter = span.enter();

		let (old_tag, old_key, new_key) = (old.tag(), old.key(), new.key());
		if old_tag != tag || old_key != new_key {
			trace!(%old_tag, ?old_key, ?new_key, "Replacing node.");
			return patches.push(Patch::ReplaceNode {
				path: path.clone(),
				node: new.snapshot(),
			});
		}

		if depth_limit == 0 {
			let new = new.snapshot();
			if old.snapshot() != new {
				warn!("Depth limit reached, replacing the remaining subtree wholesale.");
				patches.push(Patch::ReplaceNode { path: path.clone(), node: new });
			}
			return;
		}

		let (old_text, new_text) = (old.text(), new.text());
		if old_text != new_text {
			if cfg!(feature = "dangerous-logging") {
				trace!(?old_text, ?new_text, "Text changed.");
			} else {
				trace!("Text changed.");
			}
			patches.push(Patch::AlterText { path: path.clone(), text: new_text });
		}

		let new_props = new.props();
		if old.props() != new_props {
			trace!(count = new_props.len(), "Properties changed.");
			patches.push(Patch::ReplaceProps {
				path: path.clone(),
				props: new_props,
			});
		}

		let new_style = new.style();
		if old.style() != new_style {
			trace!(count = new_style.len(), "Style changed.");
			patches.push(Patch::ReplaceStyle {
				path: path.clone(),
				style: new_style,
			});
		}

		self.diff_children(&old.children(), &new.children(), path, depth_limit - 1, patches);
	}

	fn diff_children<O: SnapshotSource, N: SnapshotSource>(&mut self, old: &[Cow<'_, O>], new: &[Cow<'_, N>], path: &mut Path, depth_limit: usize, patches: &mut Vec<Patch>) {
		if old.is_empty() && new.is_empty() {
			return;
		}

		let matches = self.match_children(old, new);

		let mut used = vec![false; old.len()];
		for &i in matches.iter().flatten() {
			used[i] = true;
		}

		// Client-side order of the children while patches are emitted, as old indices (`None` for inserted nodes).
		let mut current: Vec<Option<usize>> = (0..old.len()).map(Some).collect();
		for i in (0..old.len()).rev() {
			if !used[i] {
				path.push(i);
				patches.push(Patch::RemoveNode { path: path.clone() });
				path.pop();
				current.remove(i);
			}
		}

		for (j, new_child) in new.iter().enumerate() {
			match matches[j] {
				Some(o) => {
					let position = current[j..].iter().position(|&c| c == Some(o)).map_or(j, |p| p + j);
					if position != j {
						patches.push(Patch::MoveNode {
							parent: path.clone(),
							from: position,
							to: j,
						});
						let moved = current.remove(position);
						current.insert(j, moved);
					}
					path.push(j);
					self.diff_node(&*old[o], &**new_child, path, depth_limit, patches);
					path.pop();
				}
				None => {
					patches.push(Patch::InsertNode {
						parent: path.clone(),
						index: j,
						node: new_child.snapshot(),
					});
					current.insert(j, None);
				}
			}
		}
	}

	/// For each new child, the index of the old child it continues, if any.
	///
	/// Keyed children match by key at any position, the first of duplicate keys wins.
	/// Unkeyed children match in order among the unkeyed siblings.
	fn match_children<O: SnapshotSource, N: SnapshotSource>(&mut self, old: &[Cow<'_, O>], new: &[Cow<'_, N>]) -> Vec<Option<usize>> {
		let by_key = self.key_matches.temp();
		let mut unkeyed_old = Vec::new();
		for (i, child) in old.iter().enumerate() {
			match child.key() {
				Some(key) => {
					if by_key.contains_key(&key) {
						debug!(%key, "Duplicate key among old siblings.");
					} else {
						by_key.insert(key, i);
					}
				}
				None => unkeyed_old.push(i),
			}
		}

		let mut unkeyed_old = unkeyed_old.into_iter();
		new.iter()
			.map(|child| match child.key() {
				Some(key) => by_key.remove(&key),
				None => unkeyed_old.next(),
			})
			.collect()
	}
}

/// Diffs with a default [`Reconciler`].
#[must_use]
pub fn diff<O: SnapshotSource, N: SnapshotSource>(old: Option<&O>, new: Option<&N>) -> Vec<Patch> {
	Reconciler::default().diff(old, new)
}

/// [`Reconciler::diff_and_act`] with a default [`Reconciler`].
///
/// # Errors
///
/// The first error returned by `action`.
pub async fn diff_and_act<O, N, F, Fut, E>(action: F, old: Option<&O>, new: Option<&N>) -> Result<usize, E>
where
	O: SnapshotSource,
	N: SnapshotSource,
	F: FnMut(Patch) -> Fut,
	Fut: Future<Output = Result<(), E>>,
{
	Reconciler::default().diff_and_act(action, old, new).await
}

/// The drained mutations of one component, with the path it was found at during the same flush.
#[derive(Debug, Clone)]
pub struct LoggedChanges {
	pub path: Path,
	pub component: Arc<Component>,
	pub mutations: Vec<Mutation>,
}

/// Computes patches straight from mutation logs, without diffing.
///
/// Content changes are coalesced into at most one [`Patch::AlterText`], [`Patch::ReplaceProps`] and [`Patch::ReplaceStyle`] per component,
/// carrying the component's current state, in the order of `changes`.
///
/// Returns `None` if any structural mutation is present. Those need a tree diff.
#[must_use]
pub fn replay(changes: &[LoggedChanges]) -> Option<Vec<Patch>> {
	if changes.iter().flat_map(|c| &c.mutations).any(|m| m.code().is_structural()) {
		debug!("Structural mutations pending, log replay not possible.");
		return None;
	}

	let mut patches = Vec::new();
	for entry in changes {
		let (mut text, mut props, mut style) = (false, false, false);
		for mutation in &entry.mutations {
			match mutation.code() {
				MutationCode::SetInnerHtml => text = true,
				MutationCode::SetProp | MutationCode::DeleteProp => props = true,
				MutationCode::SetStyle | MutationCode::DeleteStyle => style = true,
				MutationCode::DeleteChild | MutationCode::InsertChild => (),
			}
		}
		if text {
			patches.push(Patch::AlterText {
				path: entry.path.clone(),
				text: entry.component.text(),
			});
		}
		if props {
			patches.push(Patch::ReplaceProps {
				path: entry.path.clone(),
				props: entry.component.props().snapshot(),
			});
		}
		if style {
			patches.push(Patch::ReplaceStyle {
				path: entry.path.clone(),
				style: entry.component.style().snapshot(),
			});
		}
	}
	trace!(count = patches.len(), "Replayed mutation logs.");
	Some(patches)
}

/// Applies `patch` to a mirror of a client mount.
///
/// # Errors
///
/// [`PatchError::InvalidPath`] if the patch addresses a node that doesn't exist. `mount` is unchanged in that case.
pub fn apply(mount: &mut Vec<Node>, patch: &Patch) -> Result<(), PatchError> {
	let invalid = |path: &[usize]| PatchError::InvalidPath(path.to_vec());
	match patch {
		Patch::ReplaceNode { path, node } => *node_mut(mount, path).ok_or_else(|| invalid(path))? = node.clone(),
		Patch::RemoveNode { path } => {
			let (&index, parent) = path.split_last().ok_or_else(|| invalid(path))?;
			let siblings = children_mut(mount, parent).filter(|siblings| index < siblings.len()).ok_or_else(|| invalid(path))?;
			siblings.remove(index);
		}
		Patch::InsertNode { parent, index, node } => {
			let siblings = children_mut(mount, parent).filter(|siblings| *index <= siblings.len()).ok_or_else(|| PatchError::InvalidPath(child_path(parent, *index)))?;
			siblings.insert(*index, node.clone());
		}
		Patch::AlterText { path, text } => node_mut(mount, path).ok_or_else(|| invalid(path))?.text = text.clone(),
		Patch::ReplaceProps { path, props } => node_mut(mount, path).ok_or_else(|| invalid(path))?.props = props.clone(),
		Patch::ReplaceStyle { path, style } => node_mut(mount, path).ok_or_else(|| invalid(path))?.style = style.clone(),
		Patch::MoveNode { parent, from, to } => {
			let siblings = children_mut(mount, parent)
				.filter(|siblings| *from < siblings.len() && *to < siblings.len())
				.ok_or_else(|| PatchError::InvalidPath(child_path(parent, *from)))?;
			let moved = siblings.remove(*from);
			siblings.insert(*to, moved);
		}
	}
	Ok(())
}

/// Applies `patches` in order, stopping at the first one that doesn't fit.
///
/// # Errors
///
/// As [`apply`]. Patches before the failing one remain applied.
pub fn apply_all<'a>(mount: &mut Vec<Node>, patches: impl IntoIterator<Item = &'a Patch>) -> Result<(), PatchError> {
	patches.into_iter().try_for_each(|patch| apply(mount, patch))
}

fn child_path(parent: &[usize], index: usize) -> Path {
	let mut path = parent.to_vec();
	path.push(index);
	path
}

fn children_mut<'a>(mount: &'a mut Vec<Node>, parent: &[usize]) -> Option<&'a mut Vec<Node>> {
	parent.iter().try_fold(mount, |children, &i| children.get_mut(i).map(|node| &mut node.children))
}

fn node_mut<'a>(mount: &'a mut Vec<Node>, path: &[usize]) -> Option<&'a mut Node> {
	let (&index, parent) = path.split_last()?;
	children_mut(mount, parent)?.get_mut(index)
}
