//! Optional observability helpers for gateway operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit `auth_gateway.op` spans. Outbound spans carry `op`, `method`,
//!   `path`, and `retried`; refresh spans carry `op` and the `epoch` the cycle started from.
//!   Events mark how a rejected request joined recovery, how a refresh cycle settled, and every
//!   session change (host sign-in/sign-out, forced sign-out).
//! - Enable `metrics` to increment `auth_gateway_op_total` (labels `op` + `outcome`),
//!   `auth_gateway_recovery_total` (label `role`), and `auth_gateway_session_total` (label
//!   `change`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Gateway operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Caller-issued request through the gateway.
	Request,
	/// Replay of a request after a credential refresh.
	Replay,
	/// Refresh cycle driven by the first rejected request.
	Refresh,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Request => "request",
			OpKind::Replay => "replay",
			OpKind::Refresh => "refresh",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to a gateway operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}

	/// Maps a finished operation onto its outcome label.
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { OpOutcome::Success } else { OpOutcome::Failure }
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How a request rejected for its credential joined the refresh protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecoveryRole {
	/// Called the refresh endpoint for everyone.
	Driver,
	/// Parked until the in-flight cycle settled.
	Waiter,
	/// Arrived after the cycle settled and reused its outcome.
	Shared,
}
impl RecoveryRole {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RecoveryRole::Driver => "driver",
			RecoveryRole::Waiter => "waiter",
			RecoveryRole::Shared => "shared",
		}
	}
}
impl Display for RecoveryRole {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Session transitions reported to observability sinks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionChange {
	/// The host stored a freshly issued pair.
	SignedIn,
	/// The host ended the session.
	SignedOut,
	/// A failed refresh ended the session.
	ForcedOut,
}
impl SessionChange {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionChange::SignedIn => "signed_in",
			SessionChange::SignedOut => "signed_out",
			SessionChange::ForcedOut => "forced_out",
		}
	}
}
impl Display for SessionChange {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
