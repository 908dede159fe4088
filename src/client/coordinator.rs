//! Single-flight bookkeeping for token refreshes.
//!
//! The first request to hit an auth failure becomes the *leader* and performs
//! the refresh; every request failing while that refresh is outstanding
//! becomes a *follower* and parks on a oneshot channel. The leader settles the
//! refresh exactly once, which wakes all followers in arrival order and makes
//! the next failure start a new refresh.
//!
//! A request signed before a refresh completed is not allowed to lead another
//! one: it is told to replay with the token that refresh produced.

use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;
use tracing::debug;

use super::error::RefreshError;

type Outcome = Result<String, RefreshError>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    pending: Vec<oneshot::Sender<Outcome>>,
    /// Bumped by every successful refresh.
    generation: u64,
    /// The token produced by the last refresh, cleared when a refresh fails.
    latest: Option<String>,
}

/// Guards the in-flight flag, the pending queue and the refresh generation
/// together. The lock is never held across an `.await`.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// What a request was signed with when it was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub token: Option<String>,
    pub generation: u64,
}

/// The role a failed request plays in the current refresh.
#[derive(Debug)]
pub enum Ticket<'a> {
    /// Perform the refresh and settle it through the guard.
    Leader(RefreshGuard<'a>),
    /// Wait for the leader's outcome.
    Follower(oneshot::Receiver<Outcome>),
    /// The token changed after the request was signed; replay with this one.
    Replay(String),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the generation a request is signed in.
    pub fn sign(&self, token: Option<String>) -> Signature {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Signature {
            token,
            generation: state.generation,
        }
    }

    /// Decides, in one critical section, whether a request rejected while
    /// signed with `signed` follows the running refresh, replays with a newer
    /// token, or leads a new refresh. `current` is the token the session holds
    /// now; `None` means there is no session to refresh.
    pub fn join(&self, signed: &Signature, current: Option<&str>) -> Ticket<'_> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.pending.push(tx);
            debug!(position = state.pending.len(), "Queued behind in-flight refresh");
            return Ticket::Follower(rx);
        }

        if let Some(current) = current {
            if signed.token.as_deref() != Some(current) {
                return Ticket::Replay(current.to_string());
            }
            if state.generation != signed.generation {
                if let Some(latest) = &state.latest {
                    return Ticket::Replay(latest.clone());
                }
            }
        }

        state.in_flight = true;
        Ticket::Leader(RefreshGuard {
            coordinator: self,
            settled: false,
        })
    }

    pub fn is_refreshing(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight
    }

    /// Number of requests currently parked behind the refresh.
    pub fn pending_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }

    /// Ends the refresh and hands `outcome` to every waiter. Returns how many
    /// waiters were drained.
    fn settle(&self, outcome: Outcome) -> usize {
        let pending = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.in_flight = false;
            match &outcome {
                Ok(token) => {
                    state.generation += 1;
                    state.latest = Some(token.clone());
                }
                Err(_) => state.latest = None,
            }
            std::mem::take(&mut state.pending)
        };

        let drained = pending.len();
        for waiter in pending {
            // A waiter whose caller went away has dropped its receiver.
            let _ = waiter.send(outcome.clone());
        }
        drained
    }
}

/// Proof of leadership over the current refresh.
///
/// Dropping it without calling [`RefreshGuard::settle`] (an early return, a
/// panic, or the leader's future being cancelled) settles the refresh with
/// [`RefreshError::Abandoned`], so followers never wait forever and the
/// in-flight flag is always cleared.
#[derive(Debug)]
pub struct RefreshGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshGuard<'_> {
    pub fn settle(mut self, outcome: Result<String, RefreshError>) -> usize {
        self.settled = true;
        self.coordinator.settle(outcome)
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!("Refresh leader dropped without settling");
            self.coordinator.settle(Err(RefreshError::Abandoned));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_leader(ticket: Ticket<'_>) -> RefreshGuard<'_> {
        match ticket {
            Ticket::Leader(guard) => guard,
            other => panic!("expected to lead the refresh, got {other:?}"),
        }
    }

    fn expect_follower(ticket: Ticket<'_>) -> oneshot::Receiver<Outcome> {
        match ticket {
            Ticket::Follower(rx) => rx,
            other => panic!("expected to follow the refresh, got {other:?}"),
        }
    }

    fn signed_t1(coordinator: &RefreshCoordinator) -> Signature {
        coordinator.sign(Some("T1".to_string()))
    }

    #[tokio::test]
    async fn test_single_leader_and_success_drains_all_followers() {
        let coordinator = RefreshCoordinator::new();
        let signed = signed_t1(&coordinator);
        let leader = expect_leader(coordinator.join(&signed, Some("T1")));
        let followers: Vec<_> = (0..3)
            .map(|_| expect_follower(coordinator.join(&signed, Some("T1"))))
            .collect();

        assert!(coordinator.is_refreshing());
        assert_eq!(coordinator.pending_count(), 3);

        assert_eq!(leader.settle(Ok("T2".to_string())), 3);
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending_count(), 0);

        for rx in followers {
            assert_eq!(rx.await.unwrap(), Ok("T2".to_string()));
        }
    }

    #[tokio::test]
    async fn test_failure_is_fanned_out() {
        let coordinator = RefreshCoordinator::new();
        let signed = signed_t1(&coordinator);
        let leader = expect_leader(coordinator.join(&signed, Some("T1")));
        let a = expect_follower(coordinator.join(&signed, Some("T1")));
        let b = expect_follower(coordinator.join(&signed, Some("T1")));

        leader.settle(Err(RefreshError::MissingRefreshToken));

        assert_eq!(a.await.unwrap(), Err(RefreshError::MissingRefreshToken));
        assert_eq!(b.await.unwrap(), Err(RefreshError::MissingRefreshToken));
    }

    #[tokio::test]
    async fn test_dropped_leader_abandons_refresh() {
        let coordinator = RefreshCoordinator::new();
        let signed = signed_t1(&coordinator);
        let leader = expect_leader(coordinator.join(&signed, Some("T1")));
        let follower = expect_follower(coordinator.join(&signed, Some("T1")));

        drop(leader);

        assert!(!coordinator.is_refreshing());
        assert_eq!(follower.await.unwrap(), Err(RefreshError::Abandoned));
    }

    #[test]
    fn test_late_failure_replays_with_refreshed_token() {
        let coordinator = RefreshCoordinator::new();
        let signed = signed_t1(&coordinator);
        expect_leader(coordinator.join(&signed, Some("T1"))).settle(Ok("T2".to_string()));

        // Read the session before the leader persisted T2, joined after it settled.
        match coordinator.join(&signed, Some("T1")) {
            Ticket::Replay(token) => assert_eq!(token, "T2"),
            other => panic!("expected a replay, got {other:?}"),
        }
        assert!(!coordinator.is_refreshing());
    }

    #[test]
    fn test_changed_session_token_is_replayed() {
        let coordinator = RefreshCoordinator::new();
        let signed = signed_t1(&coordinator);
        match coordinator.join(&signed, Some("T9")) {
            Ticket::Replay(token) => assert_eq!(token, "T9"),
            other => panic!("expected a replay, got {other:?}"),
        };
    }

    #[test]
    fn test_failure_signed_after_refresh_leads_new_refresh() {
        let coordinator = RefreshCoordinator::new();
        let first = signed_t1(&coordinator);
        expect_leader(coordinator.join(&first, Some("T1"))).settle(Ok("T2".to_string()));

        let second = coordinator.sign(Some("T2".to_string()));
        assert_eq!(second.generation, first.generation + 1);
        let leader = expect_leader(coordinator.join(&second, Some("T2")));
        assert!(coordinator.is_refreshing());
        leader.settle(Ok("T3".to_string()));
    }

    #[test]
    fn test_no_session_never_replays() {
        let coordinator = RefreshCoordinator::new();
        let signed = signed_t1(&coordinator);
        expect_leader(coordinator.join(&signed, Some("T1"))).settle(Ok("T2".to_string()));

        // Logged out since: lead, so the missing refresh token ends the session.
        expect_leader(coordinator.join(&signed, None)).settle(Err(RefreshError::MissingRefreshToken));

        // A failed refresh forgets its predecessor's token.
        let _leader = expect_leader(coordinator.join(&signed, Some("T1")));
    }

    #[tokio::test]
    async fn test_departed_follower_does_not_block_others() {
        let coordinator = RefreshCoordinator::new();
        let signed = signed_t1(&coordinator);
        let leader = expect_leader(coordinator.join(&signed, Some("T1")));
        drop(expect_follower(coordinator.join(&signed, Some("T1"))));
        let kept = expect_follower(coordinator.join(&signed, Some("T1")));

        assert_eq!(leader.settle(Ok("T2".to_string())), 2);
        assert_eq!(kept.await.unwrap(), Ok("T2".to_string()));
    }
}
