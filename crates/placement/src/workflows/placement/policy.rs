use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{Internship, InternshipDraft, InternshipLevel, InternshipStatus};

pub const DEFAULT_MAX_OPEN_POSTINGS: usize = 5;
pub const DEFAULT_MAX_SLOTS: u32 = 10;
pub const DEFAULT_MAX_ACTIVE_APPLICATIONS: usize = 3;

/// Students below this year may only apply to `Basic` postings.
pub const MIN_YEAR_FOR_ADVANCED_LEVELS: u8 = 3;

/// Creation-time and submission-time limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementPolicy {
    pub max_open_postings: usize,
    pub max_slots: u32,
    pub max_active_applications: usize,
}

impl Default for PlacementPolicy {
    fn default() -> Self {
        Self {
            max_open_postings: DEFAULT_MAX_OPEN_POSTINGS,
            max_slots: DEFAULT_MAX_SLOTS,
            max_active_applications: DEFAULT_MAX_ACTIVE_APPLICATIONS,
        }
    }
}

impl PlacementPolicy {
    pub fn validate_draft(&self, draft: &InternshipDraft) -> Result<(), ValidationError> {
        if draft.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        if draft.num_slots == 0 || draft.num_slots > self.max_slots {
            return Err(ValidationError::SlotsOutOfRange {
                max: self.max_slots,
                found: draft.num_slots,
            });
        }

        if draft.close_date < draft.open_date {
            return Err(ValidationError::InvalidDateWindow {
                open: draft.open_date,
                close: draft.close_date,
            });
        }

        Ok(())
    }

    /// Postings that count against the per-creator cap.
    pub fn counts_as_open(status: InternshipStatus) -> bool {
        matches!(status, InternshipStatus::Pending | InternshipStatus::Approved)
    }
}

/// Rule violations detected before a record is created or transitioned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("internship title must not be empty")]
    EmptyTitle,
    #[error("slot count must be between 1 and {max} (found {found})")]
    SlotsOutOfRange { max: u32, found: u32 },
    #[error("closing date {close} precedes opening date {open}")]
    InvalidDateWindow { open: NaiveDate, close: NaiveDate },
    #[error("creator already has the maximum of {cap} open postings")]
    PostingCapReached { cap: usize },
    #[error("student is not eligible: {0}")]
    NotEligible(Ineligibility),
    #[error("student already has an active application to internship {internship_id}")]
    DuplicateApplication { internship_id: u64 },
    #[error("student already has the maximum of {limit} active applications")]
    ApplicationLimitReached { limit: usize },
    #[error("student has already accepted a placement")]
    AlreadyPlaced,
    #[error("internship {internship_id} has no remaining slots")]
    NoRemainingSlots { internship_id: u64 },
}

/// Why a posting is not effectively visible to a student.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Ineligibility {
    #[error("posting is hidden")]
    Hidden,
    #[error("posting is {0}, not approved")]
    NotApproved(&'static str),
    #[error("posting prefers {required} majors, student majors in {found}")]
    MajorMismatch { required: String, found: String },
    #[error("{level} postings require year {required} or above (student is year {year})")]
    LevelRestricted {
        level: &'static str,
        required: u8,
        year: u8,
    },
    #[error("applications are open {open} to {close}, not on {on}")]
    OutsideWindow {
        open: NaiveDate,
        close: NaiveDate,
        on: NaiveDate,
    },
}

/// Effective visibility of a posting to a student on a given date.
pub fn check_visibility(
    internship: &Internship,
    major: &str,
    year_of_study: u8,
    on: NaiveDate,
) -> Result<(), Ineligibility> {
    if !internship.is_visible() {
        return Err(Ineligibility::Hidden);
    }

    if internship.status() != InternshipStatus::Approved {
        return Err(Ineligibility::NotApproved(internship.status().label()));
    }

    if !major_matches(&internship.preferred_major, major) {
        return Err(Ineligibility::MajorMismatch {
            required: internship.preferred_major.clone(),
            found: major.to_string(),
        });
    }

    if !level_allowed(internship.level, year_of_study) {
        return Err(Ineligibility::LevelRestricted {
            level: internship.level.label(),
            required: MIN_YEAR_FOR_ADVANCED_LEVELS,
            year: year_of_study,
        });
    }

    if on < internship.open_date || on > internship.close_date {
        return Err(Ineligibility::OutsideWindow {
            open: internship.open_date,
            close: internship.close_date,
            on,
        });
    }

    Ok(())
}

fn major_matches(preferred: &str, major: &str) -> bool {
    let preferred = preferred.trim();
    preferred.is_empty()
        || preferred.eq_ignore_ascii_case("any")
        || preferred.eq_ignore_ascii_case(major.trim())
}

fn level_allowed(level: InternshipLevel, year_of_study: u8) -> bool {
    match level {
        InternshipLevel::Basic => true,
        InternshipLevel::Intermediate | InternshipLevel::Advanced => {
            year_of_study >= MIN_YEAR_FOR_ADVANCED_LEVELS
        }
    }
}
