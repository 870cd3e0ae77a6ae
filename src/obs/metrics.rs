// self
use crate::obs::{OpKind, OpOutcome, RecoveryRole, SessionChange};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"auth_gateway_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a finished operation, mapping `Ok`/`Err` to success/failure.
pub fn record_op_result<T, E>(kind: OpKind, result: &Result<T, E>) {
	record_op_outcome(kind, OpOutcome::of(result));
}

/// Counts how a rejected request joined the refresh protocol.
pub fn record_recovery(role: RecoveryRole) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("auth_gateway_recovery_total", "role" => role.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = role;
	}
}

/// Counts a session transition.
pub fn record_session_change(change: SessionChange) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("auth_gateway_session_total", "change" => change.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = change;
	}
}
