use live_dom::{
	component::Component,
	error::{ExecutionError, NavigationError},
	session::NavigationResult,
	wire::{decode, encode, ExecutionOutcome, Message},
	EngineConfig, LiveRegistry, RootId, Session,
};
use serde_json::json;
use std::sync::Arc;
use tokio::{sync::mpsc, time::Duration};

mod tracing_;

fn connect(config: EngineConfig) -> (Arc<Session>, mpsc::UnboundedReceiver<Vec<u8>>) {
	let root = Component::builder("body").build().unwrap();
	let (transport, frames) = mpsc::unbounded_channel::<Vec<u8>>();
	let session = Session::new(RootId::from("remote"), root, Arc::new(LiveRegistry::new()), Arc::new(transport), config);
	(Arc::new(session), frames)
}

#[tokio::test]
async fn results_are_routed_through_on_receive() {
	tracing_::init();
	let (session, mut frames) = connect(EngineConfig::default());

	let client = {
		let session = Arc::clone(&session);
		tokio::spawn(async move {
			let Message::ExecuteJs { id, code, .. } = decode(&frames.recv().await.unwrap()).unwrap() else {
				panic!("expected a script");
			};
			assert_eq!(code, "document.title");
			session
				.on_receive(
					&encode(&Message::JsExecutionResult {
						id,
						outcome: ExecutionOutcome::Value(json!("Home")),
					})
					.unwrap(),
				)
				.unwrap();
		})
	};

	assert_eq!(session.execute_js("document.title", None).await, Ok(json!("Home")));
	client.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn default_timeout_comes_from_the_config() {
	tracing_::init();
	let config = EngineConfig {
		js_timeout_ms: 25,
		..EngineConfig::default()
	};
	let (session, _frames) = connect(config);

	let result = session.get_js_result("var x = 1;", "x", None).await;
	assert!(matches!(result, Err(ExecutionError::Timeout { after, .. }) if after == Duration::from_millis(25)));
	assert_eq!(session.executor().pending_count(), 0);
}

#[tokio::test]
async fn navigation_waits_for_the_result() {
	tracing_::init();
	let (session, mut frames) = connect(EngineConfig::default());

	let client = {
		let session = Arc::clone(&session);
		tokio::spawn(async move {
			let Message::NavigateTo { url } = decode(&frames.recv().await.unwrap()).unwrap() else {
				panic!("expected a navigation");
			};
			let frame = encode(&Message::NavigationResult {
				success: true,
				url: format!("{}?redirected", url),
			})
			.unwrap();
			session.on_receive(&frame).unwrap();
		})
	};

	assert_eq!(
		session.navigate_to("/next", None).await,
		Ok(NavigationResult {
			success: true,
			url: "/next?redirected".to_owned(),
		})
	);
	client.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn navigation_times_out() {
	tracing_::init();
	let (session, _frames) = connect(EngineConfig::default());
	assert_eq!(session.navigate_to("/slow", Some(Duration::from_millis(50))).await, Err(NavigationError::Timeout(Duration::from_millis(50))));

	// Nothing is pending anymore, so a late result is dropped.
	let late = encode(&Message::NavigationResult { success: true, url: "/slow".to_owned() }).unwrap();
	session.on_receive(&late).unwrap();
}

#[tokio::test]
async fn teardown_cancels_pending_requests() {
	tracing_::init();
	let (session, mut frames) = connect(EngineConfig::default());

	let closer = {
		let session = Arc::clone(&session);
		tokio::spawn(async move {
			frames.recv().await.unwrap();
			frames.recv().await.unwrap();
			session.teardown();
		})
	};

	let (script, navigation) = tokio::join!(session.execute_js("1", None), session.navigate_to("/", None));
	closer.await.unwrap();
	assert_eq!(script, Err(ExecutionError::Disconnected));
	assert_eq!(navigation, Err(NavigationError::Disconnected));
}
