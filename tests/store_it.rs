#![cfg(feature = "reqwest")]

// std
use std::{fs, path::PathBuf};
// crates.io
use httpmock::prelude::*;
// self
use auth_gateway::{
	_preludet::*,
	auth::CredentialPair,
	gateway::Gateway,
	http::ReqwestTransport,
	store::{CredentialStore, FileStore, MemoryStore, StoreKey},
};

fn temp_store_path(name: &str) -> PathBuf {
	let dir = std::env::temp_dir()
		.join(format!("auth-gateway-store-it-{}-{name}", std::process::id()));
	let _ = fs::remove_dir_all(&dir);

	dir.join("credentials.json")
}

#[tokio::test]
async fn memory_store_replaces_pair_and_drops_missing_refresh_token() {
	let store = MemoryStore::default();

	assert_eq!(store.load().await.expect("Empty load should succeed."), None);

	store
		.save(CredentialPair::new("T1").with_refresh_token("R1"))
		.await
		.expect("Saving a full pair should succeed.");
	store.save(CredentialPair::new("T2")).await.expect("Saving an access-only pair should succeed.");

	let pair = store.load().await.expect("Load should succeed.").expect("Pair should be stored.");

	assert_eq!(pair, CredentialPair::new("T2"));
	assert_eq!(store.fetch(StoreKey::RefreshToken).await.expect("Fetch should succeed."), None);

	store.clear().await.expect("Clear should succeed.");

	assert!(store.is_empty());
}

#[tokio::test]
async fn memory_store_clones_share_state() {
	let store = MemoryStore::default();
	let clone = store.clone();

	clone.save(CredentialPair::new("T1")).await.expect("Save through the clone should succeed.");

	assert_eq!(
		store
			.fetch(StoreKey::AuthToken)
			.await
			.expect("Fetch should succeed.")
			.as_ref()
			.map(|secret| secret.expose()),
		Some("T1")
	);
}

#[tokio::test]
async fn file_store_keeps_rotated_credentials_across_restarts() {
	let server = MockServer::start_async().await;
	let path = temp_store_path("rotation");
	let store = Arc::new(FileStore::open(&path).expect("File store should open."));

	store
		.save(CredentialPair::new("T1").with_refresh_token("R1"))
		.await
		.expect("Seeding the file store should succeed.");

	server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer T1");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/account/op/refresh-token/");
			then.status(200).body(r#"{"access_token":"T2","refresh_token":"R2"}"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer T2");
			then.status(200);
		})
		.await;

	let gateway = Gateway::<ReqwestTransport>::new(
		test_config(&server.base_url()),
		store.clone() as Arc<dyn CredentialStore>,
	);

	gateway.get("me").await.expect("Request should recover through a refresh.");
	drop(gateway);
	drop(store);

	let reopened = FileStore::open(&path).expect("File store should reopen.");
	let pair = reopened
		.load()
		.await
		.expect("Reopened load should succeed.")
		.expect("Rotated pair should be persisted.");

	assert_eq!(pair, CredentialPair::new("T2").with_refresh_token("R2"));

	let raw = fs::read_to_string(&path).expect("Store file should be readable.");

	assert!(raw.contains("\"auth_token\""));
	assert!(raw.contains("\"refresh_token\""));

	let _ = fs::remove_dir_all(path.parent().expect("Store path should have a parent."));
}

#[tokio::test]
async fn file_store_is_emptied_by_forced_sign_out() {
	let server = MockServer::start_async().await;
	let path = temp_store_path("sign-out");
	let store = Arc::new(FileStore::open(&path).expect("File store should open."));

	store
		.save(CredentialPair::new("T1").with_refresh_token("R1"))
		.await
		.expect("Seeding the file store should succeed.");

	server
		.mock_async(|when, then| {
			when.method(GET).path("/me");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/account/op/refresh-token/");
			then.status(401).body("refresh token revoked");
		})
		.await;

	let sign_out = Arc::new(CountingSignOut::default());
	let gateway = Gateway::<ReqwestTransport>::new(
		test_config(&server.base_url()),
		store.clone() as Arc<dyn CredentialStore>,
	)
	.with_sign_out_handler(sign_out.clone());
	let err = gateway.get("me").await.expect_err("Revoked refresh tokens should sign out.");

	assert!(err.as_refresh().is_some());
	assert_eq!(sign_out.count(), 1);

	let reopened = FileStore::open(&path).expect("File store should reopen.");

	assert_eq!(reopened.load().await.expect("Reopened load should succeed."), None);

	let _ = fs::remove_dir_all(path.parent().expect("Store path should have a parent."));
}
