use live_dom::{diff::PatchCode, diff_and_act, Node, Patch};
use std::sync::Mutex;
use tokio::time::{sleep, Duration};

mod tracing_;

fn trees() -> (Node, Node) {
	let old = Node::new("ul").with_children([Node::new("li").with_key(1_i64), Node::new("li").with_key(2_i64).with_text("b"), Node::new("li").with_key(3_i64)]);
	let new = Node::new("ul").with_prop("class", "x").with_children([Node::new("li").with_key(3_i64), Node::new("li").with_key(1_i64), Node::new("li").with_key(4_i64)]);
	(old, new)
}

#[tokio::test(start_paused = true)]
async fn actions_run_in_patch_order() {
	tracing_::init();
	let (old, new) = trees();
	let expected = live_dom::diff(Some(&old), Some(&new));
	assert!(expected.len() > 2);

	let seen = Mutex::new(Vec::new());
	let count = diff_and_act(
		|patch: Patch| {
			let seen = &seen;
			async move {
				// Earlier patches sleep longer, so completion order would differ from list order if actions overlapped.
				let delay = 10 * (8_u64.saturating_sub(seen.lock().unwrap().len() as u64)).max(1);
				sleep(Duration::from_millis(delay)).await;
				seen.lock().unwrap().push(patch);
				Ok::<_, ()>(())
			}
		},
		Some(&old),
		Some(&new),
	)
	.await
	.unwrap();

	assert_eq!(count, expected.len());
	assert_eq!(seen.into_inner().unwrap(), expected);
}

#[tokio::test]
async fn first_error_aborts() {
	tracing_::init();
	let (old, new) = trees();
	let mut calls = Vec::new();
	let result = diff_and_act(
		|patch: Patch| {
			calls.push(patch.code());
			let fail = calls.len() == 2;
			async move {
				if fail {
					Err("client rejected patch")
				} else {
					Ok(())
				}
			}
		},
		Some(&old),
		Some(&new),
	)
	.await;

	assert_eq!(result, Err("client rejected patch"));
	assert_eq!(calls, [PatchCode::ReplaceProps, PatchCode::RemoveNode]);
}
