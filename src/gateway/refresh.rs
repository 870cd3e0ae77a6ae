//! Refresh cycle driver: one refresh call per cycle, credential rotation, forced sign-out.
//!
//! Only the request that [`RefreshCoordinator::join`](super::coordinator::RefreshCoordinator)
//! elects as driver reaches [`Gateway::drive_refresh`]. The refresh call goes straight to the
//! transport, bypassing the pipeline and classifier, so it can never re-enter the protocol.
//! Successful cycles persist the rotated pair before any waiter is released; failed cycles
//! clear both stored credentials and notify the host before any waiter is rejected. A cycle
//! overtaken by a host sign-in/sign-out commits nothing and releases its waiters to replay with
//! whatever the store holds by then.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use ::http::{HeaderValue, Method, header::CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, RefreshGrant, RefreshedCredentials, TokenSecret},
	error::RefreshError,
	ext::SignOutReason,
	gateway::{
		Gateway,
		coordinator::{RefreshCycle, RefreshOutcome},
	},
	http::{GatewayRequest, HttpTransport, JSON_CONTENT_TYPE},
	obs::{self, OpKind, OpOutcome, OpSpan, SessionChange},
	store::StoreKey,
};

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Runs the cycle owned by `cycle` and settles it for every waiter.
	pub(crate) async fn drive_refresh(&self, cycle: RefreshCycle<'_>) -> RefreshOutcome {
		const KIND: OpKind = OpKind::Refresh;

		let span = OpSpan::refresh(self.coordinator.epoch());

		obs::record_op_outcome(KIND, OpOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let (outcome, released) = span
			.instrument(async {
				let rotated = self.rotate_credentials().await;
				// Held until the cycle settles: a host sign-in/sign-out lands before the commit or
				// after every waiter is released.
				let _session = self.coordinator.lock_session().await;
				let outcome = if !cycle.is_current() {
					obs::refresh_superseded();

					Ok(None)
				} else {
					match self.commit(rotated).await {
						Ok(token) => {
							self.refresh_metrics.record_success();

							Ok(Some(token))
						},
						Err(err) => {
							self.refresh_metrics.record_failure();
							self.force_sign_out(&err).await;

							Err(err)
						},
					}
				};
				let released = cycle.finish(outcome.clone());

				(outcome, released)
			})
			.await;

		obs::refresh_settled(outcome.as_ref().err(), released);
		obs::record_op_result(KIND, &outcome);

		outcome
	}

	/// Calls the refresh endpoint with the stored refresh token; persists nothing.
	async fn rotate_credentials(&self) -> Result<CredentialPair, RefreshError> {
		let refresh_token = self
			.store
			.fetch(StoreKey::RefreshToken)
			.await
			.map_err(RefreshError::Storage)?
			.filter(|secret| !secret.is_empty())
			.ok_or(RefreshError::MissingRefreshToken)?;
		let request = self.refresh_request(&refresh_token)?;
		let response = self
			.transport
			.execute(request)
			.await
			.map_err(|err| RefreshError::call_failed(None, error_chain(&err)))?;

		if !response.is_success() {
			return Err(RefreshError::call_failed(
				Some(response.status.as_u16()),
				response.body_preview(),
			));
		}

		let refreshed = response.json::<RefreshedCredentials>().map_err(RefreshError::malformed)?;

		refreshed.into_pair(refresh_token).ok_or_else(|| RefreshError::MalformedResponse {
			path: "access_token".into(),
			message: "access token is empty".into(),
		})
	}

	async fn commit(
		&self,
		rotated: Result<CredentialPair, RefreshError>,
	) -> Result<TokenSecret, RefreshError> {
		let pair = rotated?;
		let access_token = pair.access_token.clone();

		self.store.save(pair).await.map_err(RefreshError::Storage)?;

		Ok(access_token)
	}

	fn refresh_request(&self, refresh_token: &TokenSecret) -> Result<GatewayRequest, RefreshError> {
		let url = self
			.config
			.refresh_endpoint()
			.map_err(|err| RefreshError::call_failed(None, err.to_string()))?;
		let grant = RefreshGrant {
			refresh_token: refresh_token.expose(),
			client_id: &self.config.client_id,
			client_secret: self.config.client_secret.expose(),
		};
		let body = serde_json::to_vec(&grant)
			.map_err(|err| RefreshError::call_failed(None, err.to_string()))?;
		let mut request = GatewayRequest::new(Method::POST, url)
			.with_header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))
			.with_body(body);

		request.timeout = self.config.refresh_timeout;

		Ok(request)
	}

	async fn force_sign_out(&self, reason: &RefreshError) {
		let cleanup = self.store.clear().await.err().map(Error::from);

		obs::forced_sign_out(reason, cleanup.as_ref());
		obs::record_session_change(SessionChange::ForcedOut);
		self.sign_out_handler.signed_out(SignOutReason::RefreshFailed(reason));
	}
}

fn error_chain(err: &dyn StdError) -> String {
	let mut message = err.to_string().trim_end_matches('.').to_owned();
	let mut source = err.source();

	while let Some(cause) = source {
		message.push_str(": ");
		message.push_str(cause.to_string().trim_end_matches('.'));
		source = cause.source();
	}

	message
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::TransportError;

	#[test]
	fn error_chain_includes_sources() {
		let err = TransportError::from(std::io::Error::other("connection reset"));

		assert_eq!(
			error_chain(&err),
			"I/O error occurred while calling the upstream service: connection reset"
		);

		let wrapped = RefreshError::call_failed(None, error_chain(&err));

		assert_eq!(
			wrapped.to_string(),
			"Refresh endpoint call failed (status None): I/O error occurred while calling the \
			 upstream service: connection reset"
		);
	}
}
