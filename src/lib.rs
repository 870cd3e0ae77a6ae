//! Bearer-authenticated HTTP gateway that refreshes expired credentials exactly once under
//! concurrent load, parks every other stalled request in FIFO order, and replays them with the
//! rotated token.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod ext;
pub mod gateway;
pub mod http;
pub mod obs;
pub mod pipeline;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers shared by the integration tests and demos.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use crate::{
		auth::CredentialPair,
		config::GatewayConfig,
		ext::{SignOutHandler, SignOutReason},
		gateway::Gateway,
		http::ReqwestTransport,
		store::{CredentialStore, MemoryStore},
	};

	/// Gateway type alias used by reqwest-backed integration tests.
	pub type ReqwestTestGateway = Gateway<ReqwestTransport>;

	/// Client identifier used by test gateways.
	pub const TEST_CLIENT_ID: &str = "client-gateway";
	/// Client secret used by test gateways.
	pub const TEST_CLIENT_SECRET: &str = "secret-gateway";

	/// Sign-out handler that counts how many times the gateway forced a sign-out.
	#[derive(Debug, Default)]
	pub struct CountingSignOut(AtomicUsize);
	impl CountingSignOut {
		/// Returns the number of sign-outs observed so far.
		pub fn count(&self) -> usize {
			self.0.load(Ordering::SeqCst)
		}
	}
	impl SignOutHandler for CountingSignOut {
		fn signed_out(&self, _reason: SignOutReason<'_>) {
			self.0.fetch_add(1, Ordering::SeqCst);
		}
	}

	/// Builds a config pointed at `base_url` with the test client identity.
	pub fn test_config(base_url: &str) -> GatewayConfig {
		GatewayConfig::builder(
			Url::parse(base_url).expect("Test base URL should parse successfully."),
		)
		.client_id(TEST_CLIENT_ID)
		.client_secret(TEST_CLIENT_SECRET)
		.build()
		.expect("Test gateway config should build successfully.")
	}

	/// Constructs a reqwest-backed [`Gateway`] with an in-memory store seeded with `credentials`
	/// and a counting sign-out handler.
	pub async fn build_reqwest_test_gateway(
		config: GatewayConfig,
		credentials: Option<CredentialPair>,
	) -> (ReqwestTestGateway, Arc<MemoryStore>, Arc<CountingSignOut>) {
		let store_backend = Arc::new(MemoryStore::default());

		if let Some(pair) = credentials {
			store_backend.save(pair).await.expect("Failed to seed credentials into the store.");
		}

		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let sign_out = Arc::new(CountingSignOut::default());
		let gateway =
			ReqwestTestGateway::with_transport(config, store, ReqwestTransport::default())
				.with_sign_out_handler(sign_out.clone());

		(gateway, store_backend, sign_out)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::Duration;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use ::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
