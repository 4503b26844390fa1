use live_dom::{
	diff::{apply_all, Patch, PatchCode},
	Node, Reconciler,
};

mod tracing_;

fn li(key: i64, text: &str) -> Node {
	Node::new("li").with_key(key).with_text(text)
}

fn check(old: &Node, new: &Node) -> Vec<Patch> {
	let patches = Reconciler::default().diff(Some(old), Some(new));
	let mut mount = vec![old.clone()];
	apply_all(&mut mount, &patches).unwrap();
	assert_eq!(mount, [new.clone()]);
	patches
}

#[test]
fn identical_trees_need_no_patches() {
	tracing_::init();
	let tree = Node::new("ul").with_prop("class", "list").with_children([li(1, "A"), li(2, "B"), Node::new("li").with_text("C")]);
	assert!(check(&tree, &tree.clone()).is_empty());
}

#[test]
fn keyed_reorder_only_moves() {
	tracing_::init();
	let old = Node::new("ul").with_children([li(1, "A"), li(2, "B")]);
	let new = Node::new("ul").with_children([li(2, "B"), li(1, "A")]);

	let patches = check(&old, &new);
	assert_eq!(patches, [Patch::MoveNode { parent: vec![0], from: 1, to: 0 }]);
}

#[test]
fn keyed_rotation_keeps_every_node() {
	tracing_::init();
	let old = Node::new("ul").with_children((0..6).map(|i| li(i, &i.to_string())));
	let new = Node::new("ul").with_children((0..6).map(|i| (i + 2) % 6).map(|i| li(i, &i.to_string())));

	let patches = check(&old, &new);
	assert!(patches.iter().all(|patch| patch.code() == PatchCode::MoveNode), "{:?}", patches);
}

#[test]
fn keyed_insert_and_remove() {
	tracing_::init();
	let old = Node::new("ul").with_children([li(1, "A"), li(2, "B"), li(3, "C")]);
	let new = Node::new("ul").with_children([li(3, "C"), li(4, "D"), li(1, "A*")]);

	let patches = check(&old, &new);
	let codes: Vec<_> = patches.iter().map(Patch::code).collect();
	assert_eq!(codes.iter().filter(|&&code| code == PatchCode::RemoveNode).count(), 1);
	assert_eq!(codes.iter().filter(|&&code| code == PatchCode::InsertNode).count(), 1);
	assert!(!codes.contains(&PatchCode::ReplaceNode));
	assert!(patches.contains(&Patch::AlterText {
		path: vec![0, 2],
		text: Some("A*".to_owned())
	}));
}

#[test]
fn changed_tag_replaces_even_with_equal_key() {
	tracing_::init();
	let old = Node::new("ul").with_child(li(1, "A"));
	let new = Node::new("ul").with_child(Node::new("p").with_key(1_i64).with_text("A"));

	let patches = check(&old, &new);
	assert_eq!(
		patches,
		[Patch::ReplaceNode {
			path: vec![0, 0],
			node: Node::new("p").with_key(1_i64).with_text("A"),
		}]
	);
}

#[test]
fn integer_and_string_keys_differ() {
	tracing_::init();
	let old = Node::new("ul").with_child(li(1, "A"));
	let new = Node::new("ul").with_child(Node::new("li").with_key("1").with_text("A"));

	let patches = check(&old, &new);
	assert_eq!(
		patches,
		[
			Patch::RemoveNode { path: vec![0, 0] },
			Patch::InsertNode {
				parent: vec![0],
				index: 0,
				node: Node::new("li").with_key("1").with_text("A"),
			},
		]
	);
}

#[test]
fn unkeyed_children_match_by_position() {
	tracing_::init();
	let old = Node::new("div").with_children([Node::new("span").with_text("a"), Node::new("span").with_text("b")]);
	let new = Node::new("div").with_children([Node::new("span").with_text("a"), Node::new("span").with_text("c"), Node::new("span").with_text("d")]);

	let patches = check(&old, &new);
	assert_eq!(
		patches,
		[
			Patch::AlterText {
				path: vec![0, 1],
				text: Some("c".to_owned())
			},
			Patch::InsertNode {
				parent: vec![0],
				index: 2,
				node: Node::new("span").with_text("d"),
			},
		]
	);
}

#[test]
fn props_compare_as_sets() {
	tracing_::init();
	let old = Node::new("a").with_prop("href", "/").with_prop("id", "x");
	let reordered = Node::new("a").with_prop("id", "x").with_prop("href", "/");
	assert!(check(&old, &reordered).is_empty());

	let changed = Node::new("a").with_prop("id", "x").with_style("color", "red");
	assert_eq!(
		check(&old, &changed),
		[
			Patch::ReplaceProps {
				path: vec![0],
				props: changed.props.clone(),
			},
			Patch::ReplaceStyle {
				path: vec![0],
				style: changed.style.clone(),
			},
		]
	);
}

#[test]
fn mounting_and_unmounting() {
	tracing_::init();
	let tree = Node::new("main").with_child(Node::new("p").with_text("hi"));
	let mut reconciler = Reconciler::default();

	let mount_patches = reconciler.diff(None::<&Node>, Some(&tree));
	let mut mount = Vec::new();
	apply_all(&mut mount, &mount_patches).unwrap();
	assert_eq!(mount, [tree.clone()]);

	let unmount_patches = reconciler.diff(Some(&tree), None::<&Node>);
	apply_all(&mut mount, &unmount_patches).unwrap();
	assert!(mount.is_empty());
}

#[test]
fn depth_limit_replaces_the_remaining_subtree() {
	tracing_::init();
	let nest = |leaf: &str| Node::new("a").with_child(Node::new("b").with_child(Node::new("c").with_child(Node::new("d").with_text(leaf))));
	let (old, new) = (nest("x"), nest("y"));

	let patches = Reconciler::new(2).diff(Some(&old), Some(&new));
	assert_eq!(
		patches,
		[Patch::ReplaceNode {
			path: vec![0, 0, 0],
			node: Node::new("c").with_child(Node::new("d").with_text("y")),
		}]
	);

	let unlimited = Reconciler::default().diff(Some(&old), Some(&new));
	assert_eq!(
		unlimited,
		[Patch::AlterText {
			path: vec![0, 0, 0, 0],
			text: Some("y".to_owned())
		}]
	);
}
