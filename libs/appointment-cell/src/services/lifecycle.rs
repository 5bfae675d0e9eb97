// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use shared_models::scheduling::BookingStatus;

use crate::models::BookingError;

/// Booking status rules:
/// `pending -> confirmed -> completed`, and `pending | confirmed -> cancelled`.
pub struct BookingLifecycleService;

impl Default for BookingLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_transition(
        &self,
        current_status: BookingStatus,
        new_status: BookingStatus,
    ) -> Result<(), BookingError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(BookingError::InvalidTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn valid_transitions(&self, current_status: BookingStatus) -> &'static [BookingStatus] {
        match current_status {
            BookingStatus::Pending => &[BookingStatus::Confirmed, BookingStatus::Cancelled],
            BookingStatus::Confirmed => &[BookingStatus::Completed, BookingStatus::Cancelled],
            // Terminal states - no transitions allowed
            BookingStatus::Completed | BookingStatus::Cancelled => &[],
        }
    }

    pub fn is_terminal(&self, status: BookingStatus) -> bool {
        self.valid_transitions(status).is_empty()
    }

    /// Status a new booking starts in.
    pub fn initial_status(&self, requires_approval: bool) -> BookingStatus {
        if requires_approval {
            BookingStatus::Pending
        } else {
            BookingStatus::Confirmed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::scheduling::BookingStatus::*;

    const ALL: [BookingStatus; 4] = [Pending, Confirmed, Completed, Cancelled];

    #[test]
    fn allowed_transitions() {
        let lifecycle = BookingLifecycleService::new();

        assert!(lifecycle.validate_transition(Pending, Confirmed).is_ok());
        assert!(lifecycle.validate_transition(Confirmed, Completed).is_ok());
        assert!(lifecycle.validate_transition(Pending, Cancelled).is_ok());
        assert!(lifecycle.validate_transition(Confirmed, Cancelled).is_ok());
    }

    #[test]
    fn pending_cannot_skip_to_completed() {
        let lifecycle = BookingLifecycleService::new();
        assert_eq!(
            lifecycle.validate_transition(Pending, Completed),
            Err(BookingError::InvalidTransition { from: Pending, to: Completed })
        );
    }

    #[test]
    fn terminal_states_never_move() {
        let lifecycle = BookingLifecycleService::new();

        for from in [Completed, Cancelled] {
            assert!(lifecycle.is_terminal(from));
            for to in ALL {
                assert!(lifecycle.validate_transition(from, to).is_err(), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn self_transitions_are_rejected() {
        let lifecycle = BookingLifecycleService::new();
        for status in ALL {
            assert!(lifecycle.validate_transition(status, status).is_err());
        }
    }

    #[test]
    fn approval_policy_picks_initial_status() {
        let lifecycle = BookingLifecycleService::new();
        assert_eq!(lifecycle.initial_status(true), Pending);
        assert_eq!(lifecycle.initial_status(false), Confirmed);
    }
}
