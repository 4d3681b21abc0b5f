//! Session lifecycle state machine.
//!
//! The [`SessionStateMachine`] is the single authority over which state the
//! kiosk is in and therefore which inputs and commits are legal. Requests
//! that do not fit the current state are ignored without an error, matching
//! the "ignore stray input" behaviour expected from a public kiosk.
//!
//! # States
//!
//! ```text
//!           B2                     subtype button
//!   Idle ───────► SelectingSubtype ──────────────► Idle
//!    │
//!    │ commit
//!    ▼
//!  Sending ──(outcome)──► ShowingStatus ──(status duration)──► Idle
//! ```
//!
//! `Sending` has zero duration: the dispatcher runs synchronously and the
//! outcome is reported back on the same loop iteration.

use log::debug;

use crate::dispatch::UploadOutcome;

/// Kiosk session state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SessionState {
    /// Waiting for classification or commit; weight is live.
    #[default]
    Idle,
    /// Inorganic chosen, subtype menu on screen.
    SelectingSubtype,
    /// Commit in progress.
    Sending,
    /// Showing the commit outcome until the status duration elapses.
    ShowingStatus,
}

/// State change requested by the input classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionRequest {
    /// Open the inorganic subtype menu.
    EnterSubtypeMenu,
    /// Close the subtype menu after a subtype was picked.
    LeaveSubtypeMenu,
    /// Start committing the current deposit.
    Commit,
}

/// Owns the session state and enforces legal transitions.
///
/// # Example
///
/// ```rust
/// use ecoscale::session::{SessionState, SessionStateMachine};
/// use ecoscale::dispatch::UploadOutcome;
///
/// let mut session = SessionStateMachine::new(2000);
/// assert!(session.begin_commit());
/// assert!(session.finish_commit(UploadOutcome::Success, 100));
///
/// session.tick(2099);
/// assert_eq!(session.state(), SessionState::ShowingStatus);
/// session.tick(2100);
/// assert_eq!(session.state(), SessionState::Idle);
/// ```
#[derive(Clone, Debug)]
pub struct SessionStateMachine {
    state: SessionState,
    status_duration_ms: u32,
    status_since_ms: u64,
    last_outcome: Option<UploadOutcome>,
}

impl SessionStateMachine {
    /// Creates a machine in `Idle`.
    pub fn new(status_duration_ms: u32) -> Self {
        Self {
            state: SessionState::Idle,
            status_duration_ms,
            status_since_ms: 0,
            last_outcome: None,
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Outcome of the most recent commit, if any.
    pub fn last_outcome(&self) -> Option<&UploadOutcome> {
        self.last_outcome.as_ref()
    }

    /// True in the states where classification buttons have meaning.
    pub fn accepts_classification(&self) -> bool {
        matches!(
            self.state,
            SessionState::Idle | SessionState::SelectingSubtype
        )
    }

    /// Applies a classifier request. Returns false if it was ignored.
    pub fn apply(&mut self, request: SessionRequest) -> bool {
        match request {
            SessionRequest::EnterSubtypeMenu => {
                self.transition(SessionState::Idle, SessionState::SelectingSubtype)
            }
            SessionRequest::LeaveSubtypeMenu => {
                self.transition(SessionState::SelectingSubtype, SessionState::Idle)
            }
            SessionRequest::Commit => self.begin_commit(),
        }
    }

    /// `Idle → Sending`. Returns false (and does nothing) in any other state.
    pub fn begin_commit(&mut self) -> bool {
        self.transition(SessionState::Idle, SessionState::Sending)
    }

    /// `Sending → ShowingStatus`, recording the outcome and the time it
    /// was shown. Ignored outside `Sending`.
    pub fn finish_commit(&mut self, outcome: UploadOutcome, now_ms: u64) -> bool {
        if !self.transition(SessionState::Sending, SessionState::ShowingStatus) {
            return false;
        }
        self.status_since_ms = now_ms;
        self.last_outcome = Some(outcome);
        true
    }

    /// Advances time-based transitions.
    ///
    /// Returns true when `ShowingStatus` expired and the machine went back
    /// to `Idle` on this call.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if self.state != SessionState::ShowingStatus {
            return false;
        }
        let elapsed = now_ms.saturating_sub(self.status_since_ms);
        if elapsed < u64::from(self.status_duration_ms) {
            return false;
        }
        self.transition(SessionState::ShowingStatus, SessionState::Idle)
    }

    /// Milliseconds left on the status screen, or 0 outside `ShowingStatus`.
    pub fn status_remaining_ms(&self, now_ms: u64) -> u64 {
        if self.state != SessionState::ShowingStatus {
            return 0;
        }
        let deadline = self.status_since_ms + u64::from(self.status_duration_ms);
        deadline.saturating_sub(now_ms)
    }

    fn transition(&mut self, from: SessionState, to: SessionState) -> bool {
        if self.state != from {
            debug!("session: ignored {:?} -> {:?} while {:?}", from, to, self.state);
            return false;
        }
        debug!("session: {:?} -> {:?}", from, to);
        self.state = to;
        true
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new(2000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::RejectReason;

    // ========================================================================
    // Subtype Menu
    // ========================================================================

    #[test]
    fn subtype_menu_only_from_idle() {
        let mut s = SessionStateMachine::default();
        assert!(s.apply(SessionRequest::EnterSubtypeMenu));
        assert_eq!(s.state(), SessionState::SelectingSubtype);

        // Re-entering while already in the menu is ignored.
        assert!(!s.apply(SessionRequest::EnterSubtypeMenu));
        assert_eq!(s.state(), SessionState::SelectingSubtype);

        assert!(s.apply(SessionRequest::LeaveSubtypeMenu));
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn leave_menu_ignored_in_idle() {
        let mut s = SessionStateMachine::default();
        assert!(!s.apply(SessionRequest::LeaveSubtypeMenu));
        assert_eq!(s.state(), SessionState::Idle);
    }

    // ========================================================================
    // Commit Flow
    // ========================================================================

    #[test]
    fn commit_only_from_idle() {
        let mut s = SessionStateMachine::default();
        s.apply(SessionRequest::EnterSubtypeMenu);
        assert!(!s.begin_commit());
        assert_eq!(s.state(), SessionState::SelectingSubtype);
    }

    #[test]
    fn finish_commit_requires_sending() {
        let mut s = SessionStateMachine::default();
        assert!(!s.finish_commit(UploadOutcome::Success, 0));
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.last_outcome().is_none());
    }

    #[test]
    fn full_commit_cycle_records_outcome() {
        let mut s = SessionStateMachine::new(2000);
        assert!(s.apply(SessionRequest::Commit));
        assert_eq!(s.state(), SessionState::Sending);

        let outcome = UploadOutcome::Rejected(RejectReason::Offline);
        assert!(s.finish_commit(outcome.clone(), 500));
        assert_eq!(s.state(), SessionState::ShowingStatus);
        assert_eq!(s.last_outcome(), Some(&outcome));
    }

    // ========================================================================
    // Status Timeout
    // ========================================================================

    #[test]
    fn status_returns_to_idle_exactly_at_duration() {
        let mut s = SessionStateMachine::new(2000);
        s.begin_commit();
        s.finish_commit(UploadOutcome::Success, 1000);

        assert!(!s.tick(1000));
        assert!(!s.tick(2999));
        assert_eq!(s.state(), SessionState::ShowingStatus);
        assert_eq!(s.status_remaining_ms(2999), 1);

        assert!(s.tick(3000));
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.status_remaining_ms(3000), 0);
    }

    #[test]
    fn requests_ignored_while_showing_status() {
        let mut s = SessionStateMachine::new(2000);
        s.begin_commit();
        s.finish_commit(UploadOutcome::Success, 0);

        assert!(!s.apply(SessionRequest::EnterSubtypeMenu));
        assert!(!s.apply(SessionRequest::Commit));
        assert!(!s.accepts_classification());
        assert_eq!(s.state(), SessionState::ShowingStatus);
    }

    #[test]
    fn tick_is_noop_outside_status() {
        let mut s = SessionStateMachine::default();
        assert!(!s.tick(1_000_000));
        assert_eq!(s.state(), SessionState::Idle);
    }
}
