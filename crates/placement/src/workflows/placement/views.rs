//! Read-only projections handed to presentation layers.

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Internship, InternshipId, InternshipLevel,
    InternshipStatus, UserId,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InternshipSummary {
    pub id: InternshipId,
    pub title: String,
    pub description: String,
    pub level: InternshipLevel,
    pub level_label: &'static str,
    pub preferred_major: String,
    pub open_date: NaiveDate,
    pub close_date: NaiveDate,
    pub company_name: String,
    pub creator_id: UserId,
    pub visible: bool,
    pub num_slots: u32,
    pub filled_slots: u32,
    pub remaining_slots: u32,
    pub status: InternshipStatus,
    pub status_label: &'static str,
    pub application_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationSummary {
    pub id: ApplicationId,
    pub internship_id: InternshipId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internship_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub student_id: UserId,
    pub date_applied: NaiveDate,
    pub status: ApplicationStatus,
    pub status_label: &'static str,
    pub previous_status: Option<ApplicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawal_reason: Option<String>,
}

/// Result of an acceptance, including the cascade it triggered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementOutcome {
    pub accepted: ApplicationSummary,
    pub internship: InternshipSummary,
    pub withdrawn: Vec<ApplicationId>,
}

impl Internship {
    pub fn summary(&self) -> InternshipSummary {
        InternshipSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            level: self.level,
            level_label: self.level.label(),
            preferred_major: self.preferred_major.clone(),
            open_date: self.open_date,
            close_date: self.close_date,
            company_name: self.company_name.clone(),
            creator_id: self.creator_id.clone(),
            visible: self.visible,
            num_slots: self.num_slots,
            filled_slots: self.filled_slots,
            remaining_slots: self.remaining_slots(),
            status: self.status,
            status_label: self.status.label(),
            application_count: self.applications.len(),
        }
    }
}

impl Application {
    pub fn summary(&self, internship: Option<&Internship>) -> ApplicationSummary {
        ApplicationSummary {
            id: self.id,
            internship_id: self.internship_id,
            internship_title: internship.map(|internship| internship.title.clone()),
            company_name: internship.map(|internship| internship.company_name.clone()),
            student_id: self.student_id.clone(),
            date_applied: self.date_applied,
            status: self.status,
            status_label: self.status.label(),
            previous_status: self.previous_status,
            withdrawal_reason: self.withdrawal_reason.clone(),
        }
    }
}
