//! Outbound path: request construction, dispatch through the pipeline, and the single
//! refresh-and-replay recovery of authorization failures.

// crates.io
use ::http::Method;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::RequestError,
	gateway::{Gateway, coordinator::Join},
	http::{GatewayRequest, GatewayResponse, HttpTransport},
	obs::{self, OpKind, OpOutcome, OpSpan, RecoveryRole},
	pipeline::{Disposition, OutboundContext},
	store::StoreKey,
};

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Builds a request for `path` relative to the configured base URL.
	pub fn request(&self, method: Method, path: &str) -> Result<GatewayRequest> {
		let mut request = GatewayRequest::new(method, self.config.endpoint(path)?);

		request.timeout = self.config.request_timeout;

		Ok(request)
	}

	/// Sends `GET path`.
	pub async fn get(&self, path: &str) -> Result<GatewayResponse> {
		self.send(self.request(Method::GET, path)?).await
	}

	/// Sends `DELETE path`.
	pub async fn delete(&self, path: &str) -> Result<GatewayResponse> {
		self.send(self.request(Method::DELETE, path)?).await
	}

	/// Sends `POST path` with a JSON body.
	pub async fn post<B>(&self, path: &str, body: &B) -> Result<GatewayResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(self.request(Method::POST, path)?.with_json(body)?).await
	}

	/// Sends `PUT path` with a JSON body.
	pub async fn put<B>(&self, path: &str, body: &B) -> Result<GatewayResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(self.request(Method::PUT, path)?.with_json(body)?).await
	}

	/// Sends `PATCH path` with a JSON body.
	pub async fn patch<B>(&self, path: &str, body: &B) -> Result<GatewayResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(self.request(Method::PATCH, path)?.with_json(body)?).await
	}

	/// Sends `request` through the pipeline.
	///
	/// Resolves with the upstream response when it is classified as a success. An
	/// authorization failure triggers at most one refresh-and-replay; the replay outcome is
	/// final. Every other failure status surfaces as [`Error::Request`] carrying the original
	/// response, and transport failures surface as [`Error::Transport`] without any retry.
	pub async fn send(&self, request: GatewayRequest) -> Result<GatewayResponse> {
		const KIND: OpKind = OpKind::Request;

		let span = OpSpan::outbound(KIND, &request);

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let (epoch, response) = self.dispatch(&request, false, None).await?;

				match self.pipeline.classify(&response) {
					Disposition::Success => Ok(response),
					Disposition::AuthorizationFailure if !request.is_retried() =>
						self.recover(request, epoch).await,
					disposition => Err(Error::from(RequestError::classified(response, disposition))),
				}
			})
			.await;

		obs::record_op_result(KIND, &result);

		result
	}

	/// Prepares and executes one attempt. Returns the refresh epoch observed before the
	/// credential was read, so a late rejection can be matched to the cycle that replaced it.
	///
	/// `token` overrides the stored access token; without it the store is read.
	async fn dispatch(
		&self,
		request: &GatewayRequest,
		replay: bool,
		token: Option<&TokenSecret>,
	) -> Result<(u64, GatewayResponse)> {
		let epoch = self.coordinator.epoch();
		let stored;
		let access_token = match token {
			Some(token) => Some(token),
			None => {
				stored = self.store.fetch(StoreKey::AuthToken).await?;

				stored.as_ref().filter(|secret| !secret.is_empty())
			},
		};
		let ctx = OutboundContext { access_token, replay };
		let prepared = self.pipeline.prepare(request.clone(), &ctx)?;
		let response = self.transport.execute(prepared).await?;

		Ok((epoch, response))
	}

	async fn recover(&self, request: GatewayRequest, epoch: u64) -> Result<GatewayResponse> {
		let (role, outcome) = match self.coordinator.join(epoch) {
			Join::Drive(cycle) => {
				obs::recovery_joined(RecoveryRole::Driver);

				(RecoveryRole::Driver, self.drive_refresh(cycle).await)
			},
			Join::Wait(waiter) => {
				obs::recovery_joined(RecoveryRole::Waiter);
				self.refresh_metrics.record_queued();

				(RecoveryRole::Waiter, waiter.wait().await)
			},
			Join::Settled(outcome) => {
				obs::recovery_joined(RecoveryRole::Shared);
				self.refresh_metrics.record_shared();

				(RecoveryRole::Shared, outcome)
			},
		};

		obs::record_recovery(role);

		// `None`: the session changed mid-flight, so replay with whatever is stored now.
		let token = outcome?;

		self.replay(request.into_retried(), token.as_ref()).await
	}

	async fn replay(
		&self,
		request: GatewayRequest,
		token: Option<&TokenSecret>,
	) -> Result<GatewayResponse> {
		const KIND: OpKind = OpKind::Replay;

		let span = OpSpan::outbound(KIND, &request);

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let (_, response) = self.dispatch(&request, true, token).await?;

				match self.pipeline.classify(&response) {
					Disposition::Success => Ok(response),
					disposition => Err(Error::from(RequestError::classified(response, disposition))),
				}
			})
			.await;

		obs::record_op_result(KIND, &result);

		result
	}
}
