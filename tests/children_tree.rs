use live_dom::{component::Component, error::TreeError, mutation::MutationCode, ComponentId};
use std::sync::Arc;

mod tracing_;

fn element(id: &str) -> Arc<Component> {
	Component::builder("div").id(id).build().unwrap()
}

#[test]
fn insert_sets_parent_and_records_once() {
	tracing_::init();
	let parent = element("parent");
	let child = element("child");

	parent.children().push(child.clone()).unwrap();

	assert!(Arc::ptr_eq(&child.parent().unwrap(), &parent));
	assert_eq!(child.root_id(), ComponentId::from("parent"));
	assert_eq!(parent.log().codes(), [MutationCode::InsertChild]);
	assert!(child.log().is_empty());
}

#[test]
fn already_attached_child_is_rejected() {
	tracing_::init();
	let (first, second) = (element("first"), element("second"));
	let child = element("child");
	first.children().push(child.clone()).unwrap();

	assert_eq!(
		second.children().push(child.clone()),
		Err(TreeError::AlreadyAttached {
			child: "child".into(),
			parent: "first".into(),
		})
	);
	assert!(second.children().is_empty());
	assert!(Arc::ptr_eq(&child.parent().unwrap(), &first));
	assert!(second.log().is_empty());
}

#[test]
fn cycles_are_rejected() {
	tracing_::init();
	let outer = element("outer");
	let inner = element("inner");
	outer.children().push(inner.clone()).unwrap();

	assert!(matches!(inner.children().push(outer.clone()), Err(TreeError::WouldCycle { .. })));
	assert!(matches!(outer.children().push(outer.clone()), Err(TreeError::WouldCycle { .. })));
	assert_eq!(inner.children().len(), 0);
}

#[test]
fn out_of_bounds_insert_is_rejected() {
	tracing_::init();
	let parent = element("parent");
	assert_eq!(parent.children().insert(1, element("child")), Err(TreeError::IndexOutOfBounds { index: 1, len: 0 }));
}

#[test]
fn remove_detaches_only_the_removed_component() {
	tracing_::init();
	let root = element("root");
	let middle = element("middle");
	let leaf = element("leaf");
	middle.children().push(leaf.clone()).unwrap();
	root.children().push(middle.clone()).unwrap();
	assert_eq!(leaf.root_id(), ComponentId::from("root"));
	drop(root.log().drain());

	assert_eq!(root.children().remove(&middle), Ok(0));

	assert!(middle.parent().is_none());
	assert_eq!(middle.root_id(), ComponentId::from("middle"));
	assert_eq!(leaf.root_id(), ComponentId::from("root"));
	assert_eq!(root.log().codes(), [MutationCode::DeleteChild]);
	assert!(matches!(root.children().remove(&middle), Err(TreeError::ChildNotFound { .. })));
}

#[test]
fn deep_trees_propagate_roots_without_recursion() {
	tracing_::init();
	let top = element("top");
	let mut current = element("level-0");
	let bottom = current.clone();
	for level in 1..1000 {
		let parent = Component::builder("div").id(format!("level-{}", level)).child(current).build().unwrap();
		current = parent;
	}
	assert_eq!(bottom.root_id(), ComponentId::from("level-999"));

	top.children().push(current).unwrap();
	assert_eq!(bottom.root_id(), ComponentId::from("top"));
}

#[test]
fn concurrent_inserts_attach_each_child_exactly_once() {
	tracing_::init();
	let parents: Vec<_> = (0..4).map(|i| element(&format!("parent-{}", i))).collect();
	let children: Vec<_> = (0..50).map(|i| element(&format!("child-{}", i))).collect();

	std::thread::scope(|scope| {
		for parent in &parents {
			let children = &children;
			scope.spawn(move || {
				for child in children {
					drop(parent.children().push(child.clone()));
				}
			});
		}
	});

	assert_eq!(parents.iter().map(|parent| parent.children().len()).sum::<usize>(), children.len());
	for child in &children {
		let parent = child.parent().unwrap();
		assert!(parent.children().index_of(child).is_some());
	}
}
