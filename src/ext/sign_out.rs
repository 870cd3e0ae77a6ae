//! Sign-out notifications that let the hosting application move to its unauthenticated entry
//! point once stored credentials are gone.

// self
use crate::error::RefreshError;

/// Why the session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignOutReason<'a> {
	/// The host called [`Gateway::sign_out`](crate::gateway::Gateway::sign_out).
	Requested,
	/// A refresh cycle failed terminally; stored credentials were cleared.
	RefreshFailed(&'a RefreshError),
}

/// Receives sign-out notifications. Invoked exactly once per forced sign-out, after both
/// stored credentials were deleted and before waiting requests are rejected.
pub trait SignOutHandler
where
	Self: Send + Sync,
{
	/// Reacts to the end of the session (e.g., redirect to the login surface).
	fn signed_out(&self, reason: SignOutReason<'_>);
}
impl<F> SignOutHandler for F
where
	F: Fn(SignOutReason<'_>) + Send + Sync,
{
	fn signed_out(&self, reason: SignOutReason<'_>) {
		self(reason)
	}
}

/// Handler that ignores sign-outs; the default for gateways without a host hook.
#[derive(Clone, Copy, Debug, Default)]
pub struct IgnoreSignOut;
impl SignOutHandler for IgnoreSignOut {
	fn signed_out(&self, _reason: SignOutReason<'_>) {}
}
