// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use parking_lot::Mutex;
use tokio::sync::Notify;
// self
use auth_gateway::{
	auth::CredentialPair,
	config::GatewayConfig,
	error::{Error, RefreshError},
	ext::SignOutReason,
	gateway::Gateway,
	http::{GatewayRequest, GatewayResponse, HttpTransport, TransportFuture},
	http_types::{HeaderValue, Method, StatusCode, header::CONTENT_TYPE},
	pipeline::{OutboundContext, Pipeline, RequestStage, StatusClassifier},
	store::{CredentialStore, MemoryStore},
	url::Url,
};

const REFRESH_PATH: &str = "/account/op/refresh-token/";

/// In-process upstream: `/protected` and `/slow` accept only `T2` or `T3`, `/forbidden`
/// answers 403 to `T1`, every other path succeeds. The refresh endpoint blocks until released,
/// and so does `/slow` when sent with `T1`.
#[derive(Default)]
struct ScriptedTransport {
	refresh_gate: Notify,
	slow_gate: Notify,
	refresh_calls: AtomicUsize,
	seen: Mutex<Vec<GatewayRequest>>,
}
impl ScriptedTransport {
	fn seen(&self) -> Vec<GatewayRequest> {
		self.seen.lock().clone()
	}
}
impl HttpTransport for ScriptedTransport {
	fn execute(&self, request: GatewayRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			self.seen.lock().push(request.clone());

			if request.url.path() == REFRESH_PATH {
				self.refresh_calls.fetch_add(1, Ordering::SeqCst);
				self.refresh_gate.notified().await;

				return Ok(
					GatewayResponse::new(StatusCode::OK).with_body(r#"{"access_token":"T2"}"#)
				);
			}

			if request.url.path() == "/slow" && request.bearer_token() == Some("T1") {
				self.slow_gate.notified().await;
			}

			let status = match (request.url.path(), request.bearer_token()) {
				("/protected" | "/slow", Some("T2" | "T3")) | ("/forbidden", Some("T2")) =>
					StatusCode::OK,
				("/protected" | "/slow", _) => StatusCode::UNAUTHORIZED,
				("/forbidden", _) => StatusCode::FORBIDDEN,
				_ => StatusCode::OK,
			};

			Ok(GatewayResponse::new(status))
		})
	}
}

fn config() -> GatewayConfig {
	GatewayConfig::builder(
		Url::parse("https://api.example.com").expect("Fixture base URL should parse."),
	)
	.client_id("client-scripted")
	.client_secret("secret-scripted")
	.build()
	.expect("Fixture config should build.")
}

async fn gateway(
	credentials: Option<CredentialPair>,
) -> (Gateway<ScriptedTransport>, Arc<ScriptedTransport>, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::default());

	if let Some(pair) = credentials {
		store.save(pair).await.expect("Fixture credentials should persist.");
	}

	let transport = Arc::new(ScriptedTransport::default());
	let gateway = Gateway::<ScriptedTransport>::with_transport(
		config(),
		store.clone() as Arc<dyn CredentialStore>,
		transport.clone(),
	);

	(gateway, transport, store)
}

fn seeded_pair() -> CredentialPair {
	CredentialPair::new("T1").with_refresh_token("R1")
}

async fn until(mut condition: impl FnMut() -> bool) {
	while !condition() {
		tokio::time::sleep(std::time::Duration::from_millis(5)).await;
	}
}

/// Sends `GET /slow` with `T1` and waits until the transport holds it.
async fn hold_slow_request(
	gateway: &Gateway<ScriptedTransport>,
	transport: &ScriptedTransport,
) -> tokio::task::JoinHandle<auth_gateway::error::Result<GatewayResponse>> {
	let held = tokio::spawn({
		let gateway = gateway.clone();

		async move { gateway.get("slow").await }
	});

	until(|| transport.seen().iter().any(|request| request.url.path() == "/slow")).await;

	held
}

fn counting_sign_out() -> (Arc<AtomicUsize>, impl Fn(SignOutReason<'_>) + Send + Sync) {
	let count = Arc::new(AtomicUsize::new(0));
	let handler = {
		let count = count.clone();

		move |_: SignOutReason<'_>| {
			count.fetch_add(1, Ordering::SeqCst);
		}
	};

	(count, handler)
}

#[tokio::test]
async fn independent_requests_bypass_a_blocked_refresh() {
	let (gateway, transport, _store) = gateway(Some(seeded_pair())).await;
	let stalled = tokio::spawn({
		let gateway = gateway.clone();

		async move { gateway.get("protected").await }
	});

	until(|| gateway.is_refreshing()).await;

	let response = gateway.get("public").await.expect("Independent requests should not wait.");

	assert_eq!(response.status, StatusCode::OK);
	assert!(gateway.is_refreshing());
	assert_eq!(transport.seen().last().and_then(|request| request.bearer_token()), Some("T1"));

	transport.refresh_gate.notify_one();

	let recovered = stalled
		.await
		.expect("Stalled request task should not panic.")
		.expect("Stalled request should be replayed after the refresh.");

	assert_eq!(recovered.status, StatusCode::OK);
	assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn aborted_driver_abandons_waiters_without_signing_out() {
	let (gateway, transport, store) = gateway(Some(seeded_pair())).await;
	let driver = tokio::spawn({
		let gateway = gateway.clone();

		async move { gateway.get("protected").await }
	});

	until(|| gateway.is_refreshing()).await;

	let waiter = tokio::spawn({
		let gateway = gateway.clone();

		async move { gateway.get("protected").await }
	});

	until(|| gateway.queued() == 1).await;
	driver.abort();

	let err = waiter
		.await
		.expect("Waiter task should not panic.")
		.expect_err("Waiters of an abandoned cycle should be rejected.");

	assert!(matches!(err, Error::Refresh(RefreshError::Abandoned)));
	assert!(!gateway.is_refreshing());
	assert!(!store.is_empty());

	// The next rejection starts a fresh cycle; the stored permit releases it immediately.
	transport.refresh_gate.notify_one();

	let response = gateway.get("protected").await.expect("A new cycle should recover.");

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 2);
	assert_eq!(gateway.refresh_metrics.attempts(), 2);
}

#[tokio::test]
async fn missing_access_token_omits_authorization() {
	let (gateway, transport, _store) = gateway(None).await;
	let request = gateway
		.request(Method::GET, "public")
		.and_then(|request| request.try_with_header("content-type", "text/plain"))
		.expect("Request should build.");

	gateway.send(request).await.expect("Unauthenticated requests should still be sent.");

	let seen = transport.seen();

	assert_eq!(seen.len(), 1);
	assert!(seen[0].bearer_token().is_none());
	assert_eq!(seen[0].headers[CONTENT_TYPE], "text/plain");
	assert_eq!(seen[0].url.as_str(), "https://api.example.com/public");
}

#[tokio::test]
async fn custom_classifier_and_stages_apply_to_replays() {
	struct ReplayMarker;
	impl RequestStage for ReplayMarker {
		fn name(&self) -> &'static str {
			"replay_marker"
		}

		fn apply(
			&self,
			request: &mut GatewayRequest,
			ctx: &OutboundContext<'_>,
		) -> auth_gateway::error::Result<()> {
			if ctx.replay {
				request.headers.insert("x-replayed", HeaderValue::from_static("true"));
			}

			Ok(())
		}
	}

	let (gateway, transport, _store) = gateway(Some(seeded_pair())).await;
	let gateway = gateway.with_pipeline(
		Pipeline::standard().with_stage(ReplayMarker).with_classifier(
			StatusClassifier::with_authorization_statuses([
				StatusCode::UNAUTHORIZED,
				StatusCode::FORBIDDEN,
			]),
		),
	);

	transport.refresh_gate.notify_one();

	let response = gateway.get("forbidden").await.expect("403 should trigger a refresh.");

	assert_eq!(response.status, StatusCode::OK);

	let seen = transport.seen();
	let paths: Vec<_> = seen.iter().map(|request| request.url.path()).collect();

	assert_eq!(paths, ["/forbidden", REFRESH_PATH, "/forbidden"]);
	assert!(seen[0].headers.get("x-replayed").is_none());
	assert!(seen[1].bearer_token().is_none());
	assert_eq!(seen[2].headers["x-replayed"], "true");
	assert_eq!(seen[2].bearer_token(), Some("T2"));
}

#[tokio::test]
async fn late_rejection_shares_the_settled_refresh() {
	let (gateway, transport, _store) = gateway(Some(seeded_pair())).await;
	let late = hold_slow_request(&gateway, &transport).await;

	transport.refresh_gate.notify_one();
	gateway.get("protected").await.expect("The driving request should recover.");

	assert!(!gateway.is_refreshing());

	// The held request now lands its 401 after the cycle already settled.
	transport.slow_gate.notify_one();

	let response = late
		.await
		.expect("Late request task should not panic.")
		.expect("A late rejection should replay with the settled token.");

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);
	assert_eq!(gateway.refresh_metrics.attempts(), 1);
	assert_eq!(gateway.refresh_metrics.shared(), 1);
	assert_eq!(gateway.refresh_metrics.queued(), 0);

	let seen = transport.seen();
	let replay = seen.last().expect("The late request should have been replayed.");

	assert_eq!(replay.url.path(), "/slow");
	assert!(replay.is_retried());
	assert_eq!(replay.bearer_token(), Some("T2"));
}

#[tokio::test]
async fn sign_out_discards_the_settled_token_for_late_rejections() {
	let (gateway, transport, store) = gateway(Some(seeded_pair())).await;
	let late = hold_slow_request(&gateway, &transport).await;

	transport.refresh_gate.notify_one();
	gateway.get("protected").await.expect("The driving request should recover.");
	gateway.sign_out().await.expect("Sign-out should succeed.");
	transport.slow_gate.notify_one();

	let err = late
		.await
		.expect("Late request task should not panic.")
		.expect_err("A late rejection after sign-out should not be authenticated.");

	assert!(err.is_authorization_failure());
	assert!(store.is_empty());
	assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);

	let seen = transport.seen();
	let replay = seen.last().expect("The late request should have been replayed.");

	assert_eq!(replay.url.path(), "/slow");
	assert!(replay.is_retried());
	assert!(replay.bearer_token().is_none());
}

#[tokio::test]
async fn sign_out_during_refresh_does_not_restore_credentials() {
	let (count, handler) = counting_sign_out();
	let (gateway, transport, store) = gateway(Some(seeded_pair())).await;
	let gateway = gateway.with_sign_out_handler(Arc::new(handler));
	let stalled = tokio::spawn({
		let gateway = gateway.clone();

		async move { gateway.get("protected").await }
	});

	until(|| transport.refresh_calls.load(Ordering::SeqCst) == 1).await;
	gateway.sign_out().await.expect("Sign-out should succeed.");
	transport.refresh_gate.notify_one();

	let err = stalled
		.await
		.expect("Stalled request task should not panic.")
		.expect_err("The replay should go out without a credential.");

	assert!(err.is_authorization_failure());
	assert!(store.is_empty());
	assert!(!gateway.is_refreshing());
	assert_eq!(count.load(Ordering::SeqCst), 1);
	assert_eq!(gateway.refresh_metrics.successes(), 0);
	assert_eq!(gateway.refresh_metrics.failures(), 0);
	assert!(transport.seen().last().and_then(|request| request.bearer_token()).is_none());
}

#[tokio::test]
async fn sign_in_during_refresh_keeps_the_new_session() {
	let (gateway, transport, store) = gateway(Some(seeded_pair())).await;
	let stalled = tokio::spawn({
		let gateway = gateway.clone();

		async move { gateway.get("protected").await }
	});

	until(|| transport.refresh_calls.load(Ordering::SeqCst) == 1).await;

	let fresh = CredentialPair::new("T3").with_refresh_token("R3");

	gateway.sign_in(fresh.clone()).await.expect("Sign-in should succeed.");
	transport.refresh_gate.notify_one();

	let response = stalled
		.await
		.expect("Stalled request task should not panic.")
		.expect("The replay should use the new session's credential.");

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(store.load().await.expect("Load should succeed."), Some(fresh));
	assert_eq!(transport.seen().last().and_then(|request| request.bearer_token()), Some("T3"));
}
