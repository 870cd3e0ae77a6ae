//! Refresh coordination state: the single-flight flag, the FIFO waiter queue, the epoch of
//! settled cycles, and the session generation bumped by host sign-in/sign-out.
//!
//! All fields live behind one lock and change together; the lock is never held across an
//! `.await`, so a cycle's state transitions are atomic with respect to every other request.
//! Store writes that must not interleave with a host session change go through
//! [`RefreshCoordinator::lock_session`] instead.

// std
use std::mem;
// crates.io
use futures::{
	channel::oneshot,
	lock::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard},
};
// self
use crate::{_prelude::*, auth::TokenSecret, error::RefreshError};

/// Result every participant of a refresh cycle observes.
///
/// `Ok(None)` means the host signed in or out while the cycle was in flight: nothing was
/// persisted, and the request replays with whatever credential is stored now.
pub(crate) type RefreshOutcome = Result<Option<TokenSecret>, RefreshError>;

#[derive(Debug, Default)]
struct CoordinatorState {
	refreshing: bool,
	waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
	epoch: u64,
	session: u64,
	last: Option<RefreshOutcome>,
}

/// Owned coordination state of one gateway.
#[derive(Debug)]
pub(crate) struct RefreshCoordinator {
	state: Mutex<CoordinatorState>,
	session_lock: AsyncMutex<()>,
}
impl RefreshCoordinator {
	/// Number of cycles that settled (successfully or not), plus host session changes.
	pub(crate) fn epoch(&self) -> u64 {
		self.state.lock().epoch
	}

	/// Returns `true` while a refresh call is in flight.
	pub(crate) fn is_refreshing(&self) -> bool {
		self.state.lock().refreshing
	}

	/// Number of requests parked on the in-flight cycle.
	pub(crate) fn queued(&self) -> usize {
		self.state.lock().waiters.len()
	}

	/// Serializes store writes of refresh cycles with host sign-in/sign-out.
	pub(crate) async fn lock_session(&self) -> AsyncMutexGuard<'_, ()> {
		self.session_lock.lock().await
	}

	/// Records a host session change.
	///
	/// Requests dispatched earlier no longer share the cached outcome; they replay with the
	/// credential stored now. A cycle in flight stops being current and must not persist its
	/// rotated pair.
	pub(crate) fn invalidate(&self) {
		let mut state = self.state.lock();

		state.session += 1;
		state.epoch += 1;
		state.last = Some(Ok(None));
	}

	/// Assigns a role to a request whose credential was rejected. `observed_epoch` is the epoch
	/// read when that request was dispatched.
	pub(crate) fn join(&self, observed_epoch: u64) -> Join<'_> {
		let mut state = self.state.lock();

		if state.refreshing {
			let (tx, rx) = oneshot::channel();

			state.waiters.push_back(tx);

			return Join::Wait(Waiter(rx));
		}
		// A cycle settled (or the session changed) after this request left; its 401 belongs to the
		// replaced credential.
		if observed_epoch < state.epoch
			&& let Some(outcome) = state.last.clone()
		{
			return Join::Settled(outcome);
		}

		debug_assert!(state.waiters.is_empty());

		state.refreshing = true;

		Join::Drive(RefreshCycle { coordinator: self, session: state.session, settled: false })
	}

	fn settle(&self, session: u64, outcome: Option<RefreshOutcome>) -> usize {
		let (waiters, outcome) = {
			let mut state = self.state.lock();

			state.refreshing = false;

			// A token rotated for an ended session is never handed out.
			let outcome = outcome.map(|outcome| {
				if state.session == session { outcome } else { Ok(None) }
			});

			if let Some(outcome) = &outcome {
				state.epoch += 1;
				state.last = Some(outcome.clone());
			}

			(mem::take(&mut state.waiters), outcome)
		};
		let released = waiters.len();
		let outcome = outcome.unwrap_or(Err(RefreshError::Abandoned));

		for waiter in waiters {
			// A dropped receiver means that caller went away; nothing to deliver.
			let _ = waiter.send(outcome.clone());
		}

		released
	}
}
impl Default for RefreshCoordinator {
	fn default() -> Self {
		Self { state: Default::default(), session_lock: AsyncMutex::new(()) }
	}
}

/// Role assigned by [`RefreshCoordinator::join`].
pub(crate) enum Join<'a> {
	/// First rejected request: performs the refresh call.
	Drive(RefreshCycle<'a>),
	/// Parked until the in-flight cycle settles.
	Wait(Waiter),
	/// Late arrival sharing the outcome of an already settled cycle.
	Settled(RefreshOutcome),
}

/// Exclusive right to run the current refresh cycle.
///
/// Dropping it without [`RefreshCycle::finish`] (e.g., the driving future was cancelled)
/// rejects every waiter with [`RefreshError::Abandoned`] and leaves the epoch untouched, so the
/// next rejected request starts a fresh cycle.
pub(crate) struct RefreshCycle<'a> {
	coordinator: &'a RefreshCoordinator,
	session: u64,
	settled: bool,
}
impl RefreshCycle<'_> {
	/// Returns `false` once the host signed in or out after this cycle started.
	pub(crate) fn is_current(&self) -> bool {
		self.coordinator.state.lock().session == self.session
	}

	/// Settles the cycle, releasing waiters in FIFO order. Returns how many were released.
	pub(crate) fn finish(mut self, outcome: RefreshOutcome) -> usize {
		self.settled = true;

		self.coordinator.settle(self.session, Some(outcome))
	}
}
impl Drop for RefreshCycle<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.coordinator.settle(self.session, None);
		}
	}
}

/// Continuation of a parked request.
pub(crate) struct Waiter(oneshot::Receiver<RefreshOutcome>);
impl Waiter {
	/// Suspends until the in-flight cycle settles.
	pub(crate) async fn wait(self) -> RefreshOutcome {
		self.0.await.unwrap_or(Err(RefreshError::Abandoned))
	}
}
