use live_dom::{
	error::StoreError,
	store::{ObservableMap, StoreKind, StoreObserver},
};
use std::sync::{Arc, Mutex, OnceLock};

mod tracing_;

/// Records each call together with what the store held while the hook ran.
#[derive(Default)]
struct Recorder {
	store: OnceLock<Arc<ObservableMap>>,
	calls: Mutex<Vec<(&'static str, String, Option<String>)>>,
}
impl StoreObserver for Recorder {
	fn on_set_item(&self, kind: StoreKind, key: &str, value: &str) {
		assert_eq!(kind, StoreKind::Props);
		let visible = self.store.get().and_then(|store| store.get(key));
		assert_eq!(visible.as_deref(), Some(value));
		self.calls.lock().unwrap().push(("set", key.to_owned(), visible));
	}

	fn on_delete_item(&self, kind: StoreKind, key: &str) {
		assert_eq!(kind, StoreKind::Props);
		let visible = self.store.get().and_then(|store| store.get(key));
		assert_eq!(visible, None);
		self.calls.lock().unwrap().push(("delete", key.to_owned(), visible));
	}
}

fn observed() -> (Arc<ObservableMap>, Arc<Recorder>) {
	let recorder = Arc::new(Recorder::default());
	let store = Arc::new(ObservableMap::new(StoreKind::Props, Some(recorder.clone() as Arc<dyn StoreObserver>)));
	assert!(recorder.store.set(store.clone()).is_ok());
	(store, recorder)
}

#[test]
fn one_hook_per_change_after_it_is_visible() {
	tracing_::init();
	let (store, recorder) = observed();

	store.set("a", "1");
	store.set("b", "2");
	store.set("a", "3");
	store.delete("b").unwrap();
	store.update([("c", "4"), ("d", "5")]);

	let calls = recorder.calls.lock().unwrap();
	assert_eq!(
		*calls,
		[
			("set", "a".to_owned(), Some("1".to_owned())),
			("set", "b".to_owned(), Some("2".to_owned())),
			("set", "a".to_owned(), Some("3".to_owned())),
			("delete", "b".to_owned(), None),
			("set", "c".to_owned(), Some("4".to_owned())),
			("set", "d".to_owned(), Some("5".to_owned())),
		]
	);
	assert_eq!(store.version(), 6);
}

#[test]
fn delete_of_missing_key_changes_nothing() {
	tracing_::init();
	let (store, recorder) = observed();
	store.set("a", "1");
	let version = store.version();

	assert_eq!(store.delete("missing"), Err(StoreError::KeyNotFound { key: "missing".to_owned() }));
	assert_eq!(store.version(), version);
	assert_eq!(recorder.calls.lock().unwrap().len(), 1);
	assert_eq!(store.get("a").as_deref(), Some("1"));
}

#[test]
fn silent_variants_skip_the_observer() {
	tracing_::init();
	let (store, recorder) = observed();

	store.set_silent("a", "1");
	assert_eq!(store.delete_silent("a"), Ok("1".to_owned()));
	assert!(recorder.calls.lock().unwrap().is_empty());
	assert_eq!(store.version(), 2);
}

#[test]
fn delete_keeps_the_order_of_the_rest() {
	tracing_::init();
	let (store, _recorder) = observed();
	store.update([("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")]);
	store.delete("b").unwrap();

	let keys: Vec<_> = store.snapshot().into_keys().collect();
	assert_eq!(keys, ["a", "c", "d"]);
}

#[test]
fn clear_notifies_every_key() {
	tracing_::init();
	let (store, recorder) = observed();
	store.update([("a", "1"), ("b", "2")]);
	store.clear();

	assert!(store.is_empty());
	let deletes: Vec<_> = recorder.calls.lock().unwrap().iter().filter(|(op, ..)| *op == "delete").map(|(_, key, _)| key.clone()).collect();
	assert_eq!(deletes, ["a", "b"]);
}

#[test]
fn concurrent_writers_each_get_their_hook() {
	tracing_::init();
	let (store, recorder) = observed();

	std::thread::scope(|scope| {
		for thread in 0..8 {
			let store = &store;
			scope.spawn(move || {
				for i in 0..100 {
					store.set(format!("{}-{}", thread, i), "x");
				}
			});
		}
	});

	assert_eq!(store.len(), 800);
	assert_eq!(recorder.calls.lock().unwrap().len(), 800);
	assert_eq!(store.version(), 800);
}
