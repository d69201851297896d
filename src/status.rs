//! Ticket status lifecycle.
//!
//! Statuses are ordered; automatic transitions only move forward, and an
//! update flagged as resolved always lands on [`TicketStatus::Closed`].
//! Manual edits may set any status and are treated as an override.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Position of a ticket in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    /// Draft state before submission.
    New,
    /// Submitted and awaiting review.
    Submitted,
    /// Reviewed and awaiting assignment.
    Reviewed,
    /// Assigned to an internal resource.
    AssignedInternally,
    /// Assigned to an external service provider.
    AssignedExternally,
    /// Resolved, monitoring for confirmation.
    Monitoring,
    /// Waiting on information or action from the submitter.
    AwaitingUser,
    /// Resolved. Terminal.
    Closed,
    /// Rejected. Terminal.
    Rejected,
}

/// Raised when a stored status code has no matching variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown ticket status code {0}")]
pub struct UnknownStatus(pub i32);

/// Raised when a status name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown ticket status \"{0}\"")]
pub struct UnknownStatusName(pub String);

/// Rejected automatic status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The requested status precedes the current one.
    #[error("cannot move ticket back from {from:?} to {to:?}")]
    Backward {
        /// Current status.
        from: TicketStatus,
        /// Requested status.
        to: TicketStatus,
    },
    /// The ticket is already in a terminal state.
    #[error("ticket is {0:?} and accepts no further status changes")]
    Terminal(TicketStatus),
}

impl TicketStatus {
    /// Every status in lifecycle order.
    pub const ALL: [Self; 9] = [
        Self::New,
        Self::Submitted,
        Self::Reviewed,
        Self::AssignedInternally,
        Self::AssignedExternally,
        Self::Monitoring,
        Self::AwaitingUser,
        Self::Closed,
        Self::Rejected,
    ];

    /// Stored numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::New => -1,
            Self::Submitted => 0,
            Self::Reviewed => 1,
            Self::AssignedInternally => 2,
            Self::AssignedExternally => 3,
            Self::Monitoring => 4,
            Self::AwaitingUser => 5,
            Self::Closed => 6,
            Self::Rejected => 7,
        }
    }

    /// Stable identifier used in filter selectors and JSON.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Submitted => "Submitted",
            Self::Reviewed => "Reviewed",
            Self::AssignedInternally => "AssignedInternally",
            Self::AssignedExternally => "AssignedExternally",
            Self::Monitoring => "Monitoring",
            Self::AwaitingUser => "AwaitingUser",
            Self::Closed => "Closed",
            Self::Rejected => "Rejected",
        }
    }

    /// Human readable label shown to users.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::New => "New Ticket",
            Self::Submitted => "Ticket Submitted - Awaiting Review",
            Self::Reviewed => "Ticket Reviewed - Awaiting Assignment",
            Self::AssignedInternally => "Assigned to Internal Resource",
            Self::AssignedExternally => "Assigned to External Service Provider",
            Self::Monitoring => "Problem Resolved - Monitoring for Confirmation",
            Self::AwaitingUser => "Awaiting Information/Action from User",
            Self::Closed => "Issue Resolved",
            Self::Rejected => "Rejected",
        }
    }

    /// Whether no automatic transition may leave this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool { matches!(self, Self::Closed | Self::Rejected) }

    /// Status stored for a freshly created ticket.
    #[must_use]
    pub const fn normalize_initial(self) -> Self {
        match self {
            Self::New => Self::Submitted,
            other => other,
        }
    }

    /// Status after a progress update is recorded against a ticket in `self`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when `requested` would move the ticket
    /// backwards or out of a terminal state.
    pub fn after_update(
        self,
        is_resolved: bool,
        requested: Option<Self>,
    ) -> Result<Self, TransitionError> {
        if is_resolved {
            return Ok(Self::Closed);
        }
        let Some(to) = requested else {
            return Ok(self);
        };
        if to == self {
            return Ok(self);
        }
        if self.is_terminal() {
            return Err(TransitionError::Terminal(self));
        }
        if to < self {
            return Err(TransitionError::Backward { from: self, to });
        }
        Ok(to)
    }

    /// Whether moving from `self` to `to` is a manual override.
    #[must_use]
    pub fn is_override(self, to: Self) -> bool { to < self || (self.is_terminal() && to != self) }
}

impl TryFrom<i32> for TicketStatus {
    type Error = UnknownStatus;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or(UnknownStatus(code))
    }
}

impl From<TicketStatus> for i32 {
    fn from(status: TicketStatus) -> Self { status.code() }
}

impl FromStr for TicketStatus {
    type Err = UnknownStatusName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownStatusName(trimmed.to_owned()))
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.display_name()) }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn any_status() -> impl Strategy<Value = TicketStatus> {
        proptest::sample::select(TicketStatus::ALL.to_vec())
    }

    #[rstest]
    fn codes_round_trip() {
        for status in TicketStatus::ALL {
            assert_eq!(TicketStatus::try_from(status.code()), Ok(status));
        }
        assert_eq!(TicketStatus::try_from(42), Err(UnknownStatus(42)));
    }

    #[rstest]
    #[case("submitted", TicketStatus::Submitted)]
    #[case(" AwaitingUser ", TicketStatus::AwaitingUser)]
    #[case("CLOSED", TicketStatus::Closed)]
    fn parses_names(#[case] input: &str, #[case] expected: TicketStatus) {
        assert_eq!(input.parse::<TicketStatus>(), Ok(expected));
    }

    #[rstest]
    fn new_is_normalized_on_creation() {
        assert_eq!(TicketStatus::New.normalize_initial(), TicketStatus::Submitted);
        assert_eq!(TicketStatus::Reviewed.normalize_initial(), TicketStatus::Reviewed);
    }

    #[rstest]
    fn update_moves_forward() {
        let next = TicketStatus::Submitted
            .after_update(false, Some(TicketStatus::AssignedInternally))
            .expect("forward transition");
        assert_eq!(next, TicketStatus::AssignedInternally);
    }

    #[rstest]
    fn update_rejects_backward_move() {
        let err = TicketStatus::Monitoring
            .after_update(false, Some(TicketStatus::Reviewed))
            .expect_err("backward transition");
        assert_eq!(
            err,
            TransitionError::Backward {
                from: TicketStatus::Monitoring,
                to: TicketStatus::Reviewed,
            }
        );
    }

    #[rstest]
    fn terminal_states_accept_no_automatic_change() {
        let err = TicketStatus::Closed
            .after_update(false, Some(TicketStatus::Rejected))
            .expect_err("terminal");
        assert_eq!(err, TransitionError::Terminal(TicketStatus::Closed));
    }

    #[rstest]
    #[case(TicketStatus::Monitoring, TicketStatus::Submitted, true)]
    #[case(TicketStatus::Closed, TicketStatus::Rejected, true)]
    #[case(TicketStatus::Submitted, TicketStatus::Closed, false)]
    fn detects_overrides(#[case] from: TicketStatus, #[case] to: TicketStatus, #[case] expected: bool) {
        assert_eq!(from.is_override(to), expected);
    }

    proptest! {
        #[test]
        fn resolved_update_always_closes(current in any_status(), requested in proptest::option::of(any_status())) {
            prop_assert_eq!(current.after_update(true, requested), Ok(TicketStatus::Closed));
        }

        #[test]
        fn automatic_updates_never_decrease(current in any_status(), requested in proptest::option::of(any_status())) {
            if let Ok(next) = current.after_update(false, requested) {
                prop_assert!(next >= current);
            }
        }
    }
}
