//! Gateway facade: owns the transport, credential store, pipeline, and refresh coordination
//! shared by every request issued through one gateway.

pub(crate) mod coordinator;
pub mod refresh;

mod send;

pub use refresh::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	config::GatewayConfig,
	ext::{IgnoreSignOut, SignOutHandler, SignOutReason},
	gateway::coordinator::RefreshCoordinator,
	http::HttpTransport,
	obs::{self, SessionChange},
	pipeline::Pipeline,
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport.
pub type ReqwestGateway = Gateway<ReqwestTransport>;

/// Authenticated HTTP gateway.
///
/// Every request goes through the [`Pipeline`] (bearer credential, JSON content type, host
/// stages) before reaching the transport. A response classified as an authorization failure
/// joins the gateway's refresh cycle: the first such request calls the refresh endpoint, later
/// ones park in FIFO order, and all of them replay once with the rotated token. A failed
/// refresh clears the store, notifies the [`SignOutHandler`], and rejects every parked
/// request with the same [`RefreshError`](crate::error::RefreshError).
///
/// Clones share the store, the coordination state, and the metrics, so they observe the same
/// refresh cycles.
pub struct Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Transport used for every outbound call, including the refresh call.
	pub transport: Arc<T>,
	/// Durable credential storage.
	pub store: Arc<dyn CredentialStore>,
	/// Base URL, client identity, and timeouts.
	pub config: Arc<GatewayConfig>,
	/// Outbound stages and the response classifier.
	pub pipeline: Pipeline,
	/// Hook invoked whenever the session ends.
	pub sign_out_handler: Arc<dyn SignOutHandler>,
	/// Shared counters for refresh cycles.
	pub refresh_metrics: Arc<RefreshMetrics>,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a gateway that sends through the caller-provided transport.
	pub fn with_transport(
		config: GatewayConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			config: Arc::new(config),
			pipeline: Pipeline::standard(),
			sign_out_handler: Arc::new(IgnoreSignOut),
			refresh_metrics: Default::default(),
			coordinator: Default::default(),
		}
	}

	/// Replaces the request/response pipeline.
	pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
		self.pipeline = pipeline;

		self
	}

	/// Registers the hook notified when the session ends.
	pub fn with_sign_out_handler<H>(mut self, handler: Arc<H>) -> Self
	where
		H: 'static + SignOutHandler,
	{
		self.sign_out_handler = handler;

		self
	}

	/// Persists a freshly issued credential pair (e.g., after the host's login flow).
	///
	/// Starts a new session: a refresh cycle still in flight discards its rotated pair, and
	/// rejections of requests sent before this call replay with `pair`.
	pub async fn sign_in(&self, pair: CredentialPair) -> Result<()> {
		{
			let _session = self.coordinator.lock_session().await;

			self.store.save(pair).await?;
			self.coordinator.invalidate();
		}

		obs::session_changed(SessionChange::SignedIn);
		obs::record_session_change(SessionChange::SignedIn);

		Ok(())
	}

	/// Clears both stored credentials and notifies the sign-out hook.
	///
	/// Ends the session: a refresh cycle still in flight cannot restore credentials, and
	/// rejections of requests sent before this call replay without a credential. The handler
	/// is not invoked when the store fails to clear.
	pub async fn sign_out(&self) -> Result<()> {
		{
			let _session = self.coordinator.lock_session().await;

			self.store.clear().await?;
			self.coordinator.invalidate();
		}

		obs::session_changed(SessionChange::SignedOut);
		obs::record_session_change(SessionChange::SignedOut);
		self.sign_out_handler.signed_out(SignOutReason::Requested);

		Ok(())
	}

	/// Returns `true` while a refresh call is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.coordinator.is_refreshing()
	}

	/// Number of requests currently parked on the in-flight refresh.
	pub fn queued(&self) -> usize {
		self.coordinator.queued()
	}
}
#[cfg(feature = "reqwest")]
impl Gateway<ReqwestTransport> {
	/// Creates a gateway backed by a default reqwest client.
	///
	/// The client carries no global timeout; [`GatewayConfig::refresh_timeout`] and
	/// [`GatewayConfig::request_timeout`] are applied per request.
	pub fn new(config: GatewayConfig, store: Arc<dyn CredentialStore>) -> Self {
		Self::with_transport(config, store, ReqwestTransport::default())
	}
}
impl<T> Clone for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			pipeline: self.pipeline.clone(),
			sign_out_handler: self.sign_out_handler.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<T> Debug for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("config", &self.config)
			.field("pipeline", &self.pipeline)
			.field("refreshing", &self.is_refreshing())
			.finish()
	}
}
