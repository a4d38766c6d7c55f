//! Transition tables for applications and postings.
//!
//! Both tables are pure: they answer "where does this action lead from here" and never
//! touch a record. The service consults them before mutating anything so a rejected
//! action leaves state untouched.

use serde::{Deserialize, Serialize};

use super::domain::{ApplicationStatus, InternshipStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationAction {
    /// Company approves a pending application.
    Approve,
    /// Company rejects a pending application.
    Reject,
    /// Student (or the posting owner, on confirmation) accepts an offer.
    Accept,
    /// Student turns down an offer or reverses an acceptance.
    DeclineOffer,
    RequestWithdrawal,
    ApproveWithdrawal,
    RejectWithdrawal,
}

impl ApplicationAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approve => "approve application",
            Self::Reject => "reject application",
            Self::Accept => "accept placement",
            Self::DeclineOffer => "reject placement",
            Self::RequestWithdrawal => "request withdrawal",
            Self::ApproveWithdrawal => "approve withdrawal",
            Self::RejectWithdrawal => "reject withdrawal",
        }
    }
}

/// Target of a permitted application transition, including the new previous-status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationTransition {
    pub to: ApplicationStatus,
    pub previous: Option<ApplicationStatus>,
}

impl ApplicationTransition {
    const fn to(status: ApplicationStatus) -> Self {
        Self {
            to: status,
            previous: None,
        }
    }
}

/// Resolve `action` against the current status, or `None` when the table has no row for it.
pub fn next_application_status(
    current: ApplicationStatus,
    previous: Option<ApplicationStatus>,
    action: ApplicationAction,
) -> Option<ApplicationTransition> {
    use ApplicationAction as A;
    use ApplicationStatus as S;

    match (current, action) {
        (S::Pending, A::Approve) => Some(ApplicationTransition::to(S::Successful)),
        (S::Pending, A::Reject) => Some(ApplicationTransition::to(S::Unsuccessful)),
        (S::Successful, A::Accept) => Some(ApplicationTransition::to(S::Accepted)),
        (S::Successful | S::Accepted, A::DeclineOffer) => {
            Some(ApplicationTransition::to(S::Unsuccessful))
        }
        (S::Pending | S::Successful | S::Accepted, A::RequestWithdrawal) => {
            Some(ApplicationTransition {
                to: S::WithdrawalRequested,
                previous: Some(current),
            })
        }
        (S::WithdrawalRequested, A::ApproveWithdrawal) => {
            Some(ApplicationTransition::to(S::Withdrawn))
        }
        (S::WithdrawalRequested, A::RejectWithdrawal) => {
            previous.map(ApplicationTransition::to)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternshipAction {
    Approve,
    Reject,
    Edit,
    Resubmit,
    Delete,
}

impl InternshipAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approve => "approve internship",
            Self::Reject => "reject internship",
            Self::Edit => "edit internship",
            Self::Resubmit => "resubmit internship",
            Self::Delete => "delete internship",
        }
    }
}

/// Resolve a staff or owner action on a posting. Edit and delete keep the status.
pub fn next_internship_status(
    current: InternshipStatus,
    action: InternshipAction,
) -> Option<InternshipStatus> {
    use InternshipAction as A;
    use InternshipStatus as S;

    match (current, action) {
        (S::Pending, A::Approve) => Some(S::Approved),
        (S::Pending, A::Reject) => Some(S::Rejected),
        (S::Pending, A::Edit | A::Delete) => Some(S::Pending),
        (S::Rejected, A::Resubmit) => Some(S::Pending),
        _ => None,
    }
}
