//! Button classification.
//!
//! [`classify`] is a pure function of (button, session state, deposit). It
//! never mutates anything: the caller applies the returned deposit and hands
//! the requested transition to the [`SessionStateMachine`].
//!
//! # Button Table
//!
//! | Button | Idle | SelectingSubtype |
//! |--------|------|------------------|
//! | One    | Organic | Inorganic / General, back to Idle |
//! | Two    | open subtype menu | Inorganic / Bottle, back to Idle |
//! | Three  | Residual | Inorganic / Paper, back to Idle |
//! | Commit | commit | ignored |
//!
//! Every button is ignored in `Sending` and `ShowingStatus`. A new
//! classification always overwrites the previous one.
//!
//! [`SessionStateMachine`]: crate::session::SessionStateMachine

use crate::deposit::{Category, Deposit, Subcategory};
use crate::session::{SessionRequest, SessionState};
use crate::traits::{Button, Tone};

/// Result of interpreting one button press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    /// Deposit after the press (unchanged when the press was ignored).
    pub deposit: Deposit,
    /// Transition to request from the session state machine.
    pub request: Option<SessionRequest>,
    /// Feedback tone to play.
    pub tone: Option<Tone>,
}

impl Classification {
    fn ignored(deposit: Deposit) -> Self {
        Self {
            deposit,
            request: None,
            tone: None,
        }
    }

    fn select(deposit: Deposit, request: Option<SessionRequest>) -> Self {
        Self {
            deposit,
            request,
            tone: Some(Tone::CLICK),
        }
    }

    /// True when the press had no effect at all.
    pub fn is_ignored(&self, before: &Deposit) -> bool {
        self.request.is_none() && self.tone.is_none() && self.deposit == *before
    }
}

/// Interprets a button press in the given state.
///
/// # Example
///
/// ```rust
/// use ecoscale::deposit::{Deposit, Subcategory};
/// use ecoscale::input::classify;
/// use ecoscale::session::{SessionRequest, SessionState};
/// use ecoscale::traits::Button;
///
/// let open = classify(Button::Two, SessionState::Idle, &Deposit::EMPTY);
/// assert_eq!(open.request, Some(SessionRequest::EnterSubtypeMenu));
/// assert_eq!(open.deposit, Deposit::EMPTY);
///
/// let bottle = classify(Button::Two, SessionState::SelectingSubtype, &open.deposit);
/// assert_eq!(bottle.deposit, Deposit::inorganic(Subcategory::Bottle));
/// assert_eq!(bottle.request, Some(SessionRequest::LeaveSubtypeMenu));
/// ```
pub fn classify(button: Button, state: SessionState, deposit: &Deposit) -> Classification {
    match state {
        SessionState::Idle => classify_idle(button, deposit),
        SessionState::SelectingSubtype => classify_subtype(button, deposit),
        SessionState::Sending | SessionState::ShowingStatus => Classification::ignored(*deposit),
    }
}

fn classify_idle(button: Button, deposit: &Deposit) -> Classification {
    match button {
        Button::One => Classification::select(Deposit::with_category(Category::Organic), None),
        Button::Two => Classification {
            deposit: *deposit,
            request: Some(SessionRequest::EnterSubtypeMenu),
            tone: None,
        },
        Button::Three => Classification::select(Deposit::with_category(Category::Residual), None),
        Button::Commit => Classification {
            deposit: *deposit,
            request: Some(SessionRequest::Commit),
            tone: Some(Tone::COMMIT),
        },
    }
}

fn classify_subtype(button: Button, deposit: &Deposit) -> Classification {
    let subcategory = match button {
        Button::One => Subcategory::General,
        Button::Two => Subcategory::Bottle,
        Button::Three => Subcategory::Paper,
        Button::Commit => return Classification::ignored(*deposit),
    };
    Classification::select(
        Deposit::inorganic(subcategory),
        Some(SessionRequest::LeaveSubtypeMenu),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Idle
    // ========================================================================

    #[test]
    fn idle_single_step_categories() {
        let c = classify(Button::One, SessionState::Idle, &Deposit::EMPTY);
        assert_eq!(c.deposit, Deposit::with_category(Category::Organic));
        assert_eq!(c.request, None);
        assert_eq!(c.tone, Some(Tone::CLICK));

        let c = classify(Button::Three, SessionState::Idle, &Deposit::EMPTY);
        assert_eq!(c.deposit, Deposit::with_category(Category::Residual));
        assert_eq!(c.deposit.subcategory(), Subcategory::None);
    }

    #[test]
    fn idle_overwrites_previous_selection() {
        let prior = Deposit::inorganic(Subcategory::Bottle);
        let c = classify(Button::One, SessionState::Idle, &prior);
        assert_eq!(c.deposit, Deposit::with_category(Category::Organic));
    }

    #[test]
    fn idle_button_two_keeps_deposit_until_subtype_chosen() {
        let prior = Deposit::with_category(Category::Residual);
        let c = classify(Button::Two, SessionState::Idle, &prior);
        assert_eq!(c.deposit, prior);
        assert_eq!(c.request, Some(SessionRequest::EnterSubtypeMenu));
        assert_eq!(c.tone, None);
    }

    #[test]
    fn idle_commit_requests_commit_without_touching_deposit() {
        let prior = Deposit::with_category(Category::Organic);
        let c = classify(Button::Commit, SessionState::Idle, &prior);
        assert_eq!(c.deposit, prior);
        assert_eq!(c.request, Some(SessionRequest::Commit));
        assert_eq!(c.tone, Some(Tone::COMMIT));
    }

    // ========================================================================
    // SelectingSubtype
    // ========================================================================

    #[test]
    fn subtype_buttons_force_inorganic() {
        let cases = [
            (Button::One, Subcategory::General),
            (Button::Two, Subcategory::Bottle),
            (Button::Three, Subcategory::Paper),
        ];
        for (button, sub) in cases {
            let c = classify(
                button,
                SessionState::SelectingSubtype,
                &Deposit::with_category(Category::Organic),
            );
            assert_eq!(c.deposit, Deposit::inorganic(sub));
            assert_eq!(c.request, Some(SessionRequest::LeaveSubtypeMenu));
            assert_eq!(c.tone, Some(Tone::CLICK));
        }
    }

    #[test]
    fn commit_ignored_in_subtype_menu() {
        let prior = Deposit::EMPTY;
        let c = classify(Button::Commit, SessionState::SelectingSubtype, &prior);
        assert!(c.is_ignored(&prior));
    }

    // ========================================================================
    // Busy States
    // ========================================================================

    #[test]
    fn everything_ignored_while_busy() {
        let prior = Deposit::with_category(Category::Residual);
        for state in [SessionState::Sending, SessionState::ShowingStatus] {
            for button in Button::ALL {
                let c = classify(button, state, &prior);
                assert!(c.is_ignored(&prior), "{:?} in {:?}", button, state);
            }
        }
    }
}
