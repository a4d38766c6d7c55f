use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for internship postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InternshipId(pub u64);

impl fmt::Display for InternshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier wrapper for student applications. Allocated from its own counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub u64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a student, company representative, or career-centre staff member.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InternshipLevel {
    Basic,
    Intermediate,
    Advanced,
}

impl InternshipLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

/// Approval status of a posting. `Filled` is only ever derived from slot recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InternshipStatus {
    Pending,
    Approved,
    Rejected,
    Filled,
}

impl InternshipStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Filled => "Filled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Successful,
    Accepted,
    Unsuccessful,
    WithdrawalRequested,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Successful => "Successful",
            Self::Accepted => "Accepted",
            Self::Unsuccessful => "Unsuccessful",
            Self::WithdrawalRequested => "Withdrawal Requested",
            Self::Withdrawn => "Withdrawn",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Unsuccessful | Self::Withdrawn)
    }

    pub const fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

/// A posting together with its capacity accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct Internship {
    pub id: InternshipId,
    pub title: String,
    pub description: String,
    pub level: InternshipLevel,
    pub preferred_major: String,
    pub open_date: NaiveDate,
    pub close_date: NaiveDate,
    pub company_name: String,
    pub creator_id: UserId,
    pub(crate) visible: bool,
    pub num_slots: u32,
    pub(crate) filled_slots: u32,
    pub(crate) status: InternshipStatus,
    pub(crate) applications: Vec<ApplicationId>,
}

impl Internship {
    pub(crate) fn from_draft(
        id: InternshipId,
        draft: InternshipDraft,
        company_name: String,
        creator_id: UserId,
    ) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            level: draft.level,
            preferred_major: draft.preferred_major,
            open_date: draft.open_date,
            close_date: draft.close_date,
            company_name,
            creator_id,
            visible: false,
            num_slots: draft.num_slots,
            filled_slots: 0,
            status: InternshipStatus::Pending,
            applications: Vec::new(),
        }
    }

    pub fn status(&self) -> InternshipStatus {
        self.status
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn filled_slots(&self) -> u32 {
        self.filled_slots
    }

    pub fn remaining_slots(&self) -> u32 {
        self.num_slots.saturating_sub(self.filled_slots)
    }

    /// Application ids in submission order.
    pub fn application_ids(&self) -> &[ApplicationId] {
        &self.applications
    }

    pub(crate) fn draft(&self) -> InternshipDraft {
        InternshipDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            level: self.level,
            preferred_major: self.preferred_major.clone(),
            open_date: self.open_date,
            close_date: self.close_date,
            num_slots: self.num_slots,
        }
    }

    pub(crate) fn apply_draft(&mut self, draft: InternshipDraft) {
        self.title = draft.title;
        self.description = draft.description;
        self.level = draft.level;
        self.preferred_major = draft.preferred_major;
        self.open_date = draft.open_date;
        self.close_date = draft.close_date;
        self.num_slots = draft.num_slots;
    }
}

/// Fields a company representative supplies when creating a posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternshipDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub level: InternshipLevel,
    #[serde(default)]
    pub preferred_major: String,
    pub open_date: NaiveDate,
    pub close_date: NaiveDate,
    pub num_slots: u32,
}

/// Partial update applied to a posting that is still pending review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternshipEdit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub level: Option<InternshipLevel>,
    #[serde(default)]
    pub preferred_major: Option<String>,
    #[serde(default)]
    pub open_date: Option<NaiveDate>,
    #[serde(default)]
    pub close_date: Option<NaiveDate>,
    #[serde(default)]
    pub num_slots: Option<u32>,
}

impl InternshipEdit {
    pub(crate) fn merge_into(self, mut draft: InternshipDraft) -> InternshipDraft {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(level) = self.level {
            draft.level = level;
        }
        if let Some(major) = self.preferred_major {
            draft.preferred_major = major;
        }
        if let Some(open_date) = self.open_date {
            draft.open_date = open_date;
        }
        if let Some(close_date) = self.close_date {
            draft.close_date = close_date;
        }
        if let Some(num_slots) = self.num_slots {
            draft.num_slots = num_slots;
        }
        draft
    }
}

/// A student's application to a single posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub id: ApplicationId,
    pub internship_id: InternshipId,
    pub student_id: UserId,
    pub date_applied: NaiveDate,
    pub(crate) status: ApplicationStatus,
    pub(crate) previous_status: Option<ApplicationStatus>,
    pub(crate) withdrawal_reason: Option<String>,
}

impl Application {
    pub(crate) fn new(
        id: ApplicationId,
        internship_id: InternshipId,
        student_id: UserId,
        date_applied: NaiveDate,
    ) -> Self {
        Self {
            id,
            internship_id,
            student_id,
            date_applied,
            status: ApplicationStatus::Pending,
            previous_status: None,
            withdrawal_reason: None,
        }
    }

    pub fn status(&self) -> ApplicationStatus {
        self.status
    }

    pub fn previous_status(&self) -> Option<ApplicationStatus> {
        self.previous_status
    }

    pub fn withdrawal_reason(&self) -> Option<&str> {
        self.withdrawal_reason.as_deref()
    }

    /// Whether this application holds one of the posting's slots. A pending
    /// withdrawal of an accepted placement keeps its slot until staff decide.
    pub fn occupies_slot(&self) -> bool {
        match self.status {
            ApplicationStatus::Accepted => true,
            ApplicationStatus::WithdrawalRequested => {
                self.previous_status == Some(ApplicationStatus::Accepted)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum UserRole {
    Student { major: String, year_of_study: u8 },
    CompanyRepresentative { company_name: String },
    Staff,
}

impl UserRole {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Student { .. } => "student",
            Self::CompanyRepresentative { .. } => "company representative",
            Self::Staff => "staff",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(flatten)]
    pub role: UserRole,
}

impl User {
    pub fn student(
        id: impl Into<String>,
        name: impl Into<String>,
        major: impl Into<String>,
        year_of_study: u8,
    ) -> Self {
        Self {
            id: UserId::new(id),
            name: name.into(),
            role: UserRole::Student {
                major: major.into(),
                year_of_study,
            },
        }
    }

    pub fn company_representative(
        id: impl Into<String>,
        name: impl Into<String>,
        company_name: impl Into<String>,
    ) -> Self {
        Self {
            id: UserId::new(id),
            name: name.into(),
            role: UserRole::CompanyRepresentative {
                company_name: company_name.into(),
            },
        }
    }

    pub fn staff(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            name: name.into(),
            role: UserRole::Staff,
        }
    }
}
