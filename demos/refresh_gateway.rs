//! Demonstrates a reqwest-backed gateway recovering three concurrent requests that hit an
//! expired access token with a single refresh call, then signing the session out when the
//! refresh token is revoked.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use auth_gateway::{
	auth::CredentialPair,
	config::GatewayConfig,
	ext::SignOutReason,
	gateway::ReqwestGateway,
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
	let config = GatewayConfig::builder(Url::parse(&server.base_url())?)
		.client_id("demo-client")
		.client_secret("demo-secret")
		.build()?;
	let gateway = ReqwestGateway::new(config, store.clone()).with_sign_out_handler(Arc::new(
		|reason: SignOutReason<'_>| println!("Signed out: {reason:?}."),
	));

	gateway
		.sign_in(CredentialPair::new("expired-access").with_refresh_token("demo-refresh"))
		.await?;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/classes").header("authorization", "Bearer expired-access");
			then.status(401);
		})
		.await;

	let mut classes_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/classes").header("authorization", "Bearer fresh-access");
			then.status(200).header("content-type", "application/json").body(r#"["yoga"]"#);
		})
		.await;
	let mut refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/account/op/refresh-token/");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"fresh-access","refresh_token":"rotated-refresh"}"#);
		})
		.await;
	let (a, b, c) =
		tokio::join!(gateway.get("classes"), gateway.get("classes"), gateway.get("classes"));

	for response in [a?, b?, c?] {
		println!("Replayed request answered {} with {}.", response.status, response.text());
	}

	refresh_mock.assert_calls_async(1).await;
	refresh_mock.delete_async().await;
	classes_mock.delete_async().await;

	println!(
		"Refresh attempts: {}, parked: {}, shared: {}.",
		gateway.refresh_metrics.attempts(),
		gateway.refresh_metrics.queued(),
		gateway.refresh_metrics.shared(),
	);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/classes").header("authorization", "Bearer fresh-access");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/account/op/refresh-token/");
			then.status(401).body(r#"{"error":"refresh token revoked"}"#);
		})
		.await;

	if let Err(err) = gateway.get("classes").await {
		println!("Request rejected after sign-out: {err}");
	}

	println!("Stored credentials remaining: {:?}.", store.load().await?);

	Ok(())
}
