use live_dom::{diff::apply_all, Node, Patch, Reconciler};
use proptest::prelude::*;

mod tracing_;

const TAGS: [&str; 3] = ["div", "span", "p"];

/// A childless node with random content.
fn leaf() -> impl Strategy<Value = Node> {
	(
		prop::sample::select(TAGS.to_vec()),
		prop::option::weighted(0.4, (0..4_u8).prop_map(|text| format!("t{}", text))),
		prop::collection::vec((0..3_u8, 0..3_u8), 0..3),
		prop::option::weighted(0.3, prop::sample::select(vec!["red", "blue"])),
	)
		.prop_map(|(tag, text, props, color)| {
			let mut node = Node::new(tag);
			node.text = text;
			for (name, value) in props {
				node.props.insert(format!("p{}", name), format!("v{}", value));
			}
			if let Some(color) = color {
				node.style.insert("color".to_owned(), color.to_owned());
			}
			node
		})
}

/// Trees up to four levels deep. Siblings are either unkeyed or mostly keyed with distinct keys.
fn tree() -> impl Strategy<Value = Node> {
	leaf().prop_recursive(4, 64, 4, |inner| {
		(
			leaf(),
			prop::collection::vec((inner, prop::bool::weighted(0.8)), 0..5),
			any::<bool>(),
			Just((0..8_i64).collect::<Vec<_>>()).prop_shuffle(),
		)
			.prop_map(|(mut node, children, keyed, keys)| {
				for ((mut child, with_key), key) in children.into_iter().zip(keys) {
					if keyed && with_key {
						child.key = Some(key.into());
					}
					node.children.push(child);
				}
				node
			})
	})
}

fn list(keys: &[i64]) -> Node {
	Node::new("ul").with_children(keys.iter().map(|&key| Node::new("li").with_key(key).with_text(key.to_string())))
}

proptest! {
	#![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

	#[test]
	fn random_pairs_round_trip(old in tree(), new in tree()) {
		tracing_::init();
		let mut reconciler = Reconciler::default();

		let patches = reconciler.diff(Some(&old), Some(&new));
		let mut mount = vec![old];
		apply_all(&mut mount, &patches).unwrap_or_else(|error| panic!("{} in {:?}", error, patches));
		prop_assert_eq!(mount, vec![new.clone()]);

		prop_assert!(reconciler.diff(Some(&new), Some(&new)).is_empty());
	}

	#[test]
	fn shuffled_keyed_lists_only_move(keys in Just((0..20_i64).collect::<Vec<_>>()).prop_shuffle()) {
		tracing_::init();
		let old = list(&(0..20).collect::<Vec<_>>());
		let new = list(&keys);

		let patches = Reconciler::default().diff(Some(&old), Some(&new));
		prop_assert!(patches.iter().all(|patch| matches!(patch, Patch::MoveNode { .. })), "{:?}", patches);
		prop_assert!(patches.len() < keys.len());

		let mut mount = vec![old];
		apply_all(&mut mount, &patches).unwrap();
		prop_assert_eq!(mount, vec![new]);
	}
}
