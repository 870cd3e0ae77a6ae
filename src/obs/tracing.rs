// self
use crate::{
	_prelude::*,
	error::RefreshError,
	http::GatewayRequest,
	obs::{OpKind, RecoveryRole, SessionChange},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// Span wrapping one gateway operation.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Span for a request leaving through the pipeline, either first attempt or replay.
	///
	/// Only the URL path is recorded; query strings may carry caller data.
	pub fn outbound(kind: OpKind, request: &GatewayRequest) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"auth_gateway.op",
				op = kind.as_str(),
				method = %request.method,
				path = request.url.path(),
				retried = request.is_retried(),
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, request);

			Self {}
		}
	}

	/// Span for a refresh cycle started from `epoch`.
	pub fn refresh(epoch: u64) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("auth_gateway.op", op = OpKind::Refresh.as_str(), epoch);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = epoch;

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits the role a rejected request took in the refresh protocol.
pub(crate) fn recovery_joined(role: RecoveryRole) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(role = role.as_str(), "credential rejected, joining refresh");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = role;
	}
}

/// Emits the settle event of a refresh cycle; `failure` is `None` on success.
pub(crate) fn refresh_settled(failure: Option<&RefreshError>, released: usize) {
	#[cfg(feature = "tracing")]
	{
		match failure {
			None => tracing::info!(released, "credential refresh settled"),
			Some(err) => tracing::warn!(released, error = %err, "credential refresh failed"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (failure, released);
	}
}

/// Emits that the host changed the session while the cycle was in flight.
pub(crate) fn refresh_superseded() {
	#[cfg(feature = "tracing")]
	{
		tracing::info!("session changed during refresh, rotated credentials discarded");
	}
}

/// Emits a host-initiated session change.
pub(crate) fn session_changed(change: SessionChange) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(change = change.as_str(), "session changed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = change;
	}
}

/// Emits the forced sign-out event; `cleanup` carries a store failure that left credentials
/// behind.
pub(crate) fn forced_sign_out(reason: &RefreshError, cleanup: Option<&Error>) {
	#[cfg(feature = "tracing")]
	{
		let change = SessionChange::ForcedOut.as_str();

		match cleanup {
			None => tracing::warn!(change, reason = %reason, "session signed out"),
			Some(err) => tracing::error!(
				change,
				reason = %reason,
				error = %err,
				"session signed out but stored credentials could not be cleared"
			),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (reason, cleanup);
	}
}
