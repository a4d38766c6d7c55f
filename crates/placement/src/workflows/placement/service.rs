use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use tracing::{debug, error, info};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Internship, InternshipDraft, InternshipEdit,
    InternshipId, InternshipStatus, User, UserId, UserRole,
};
use super::policy::{check_visibility, PlacementPolicy, ValidationError};
use super::registry::PlacementRegistry;
use super::repository::{GatewayError, PlacementGateway, UserDirectory};
use super::transitions::{
    next_application_status, next_internship_status, ApplicationAction, ApplicationTransition,
    InternshipAction,
};
use super::views::{ApplicationSummary, InternshipSummary, PlacementOutcome};

/// Lifecycle engine for postings and applications.
///
/// Every operation checks existence, authorization, and the transition table before it
/// mutates anything, then recounts affected slots and persists each touched record
/// before returning. The working set lives behind one mutex held for the whole
/// operation, which serializes acceptances per student and recounts per posting.
pub struct PlacementService<G, U> {
    gateway: Arc<G>,
    directory: Arc<U>,
    policy: PlacementPolicy,
    registry: Mutex<PlacementRegistry>,
}

/// Records written by a single operation.
#[derive(Debug, Default)]
struct Touched {
    internships: BTreeSet<InternshipId>,
    applications: BTreeSet<ApplicationId>,
}

impl<G, U> PlacementService<G, U>
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    /// Build the engine and load the working set from the gateway.
    pub fn open(
        gateway: Arc<G>,
        directory: Arc<U>,
        policy: PlacementPolicy,
    ) -> Result<Self, PlacementError> {
        let service = Self {
            gateway,
            directory,
            policy,
            registry: Mutex::new(PlacementRegistry::default()),
        };
        service.reload()?;
        Ok(service)
    }

    /// Replace the working set with freshly loaded state.
    pub fn reload(&self) -> Result<(), PlacementError> {
        let snapshot = self.gateway.load().map_err(|source| {
            error!(error = %source, "failed to load placement records");
            PlacementError::Persistence(source)
        })?;
        let loaded = PlacementRegistry::from_snapshot(snapshot, self.directory.as_ref());
        let mut registry = self.registry();
        *registry = loaded;
        info!(
            internships = registry.all_internships().count(),
            applications = registry.all_applications().count(),
            "placement records loaded"
        );
        Ok(())
    }

    pub fn create_internship(
        &self,
        actor: &UserId,
        draft: InternshipDraft,
    ) -> Result<InternshipSummary, PlacementError> {
        let user = self.user(actor)?;
        let UserRole::CompanyRepresentative { company_name } = &user.role else {
            return Err(PlacementError::unauthorized(&user, "create internships"));
        };

        self.policy.validate_draft(&draft)?;

        let mut registry = self.registry();
        self.ensure_posting_capacity(&registry, actor)?;

        let id = registry.allocate_internship_id();
        let internship = Internship::from_draft(id, draft, company_name.clone(), actor.clone());
        registry.insert_internship(internship);
        info!(internship_id = %id, creator_id = %actor, "internship created");

        let mut touched = Touched::default();
        touched.internships.insert(id);
        self.persist(&registry, &touched)?;

        self.internship_summary(&registry, id)
    }

    pub fn edit_internship(
        &self,
        actor: &UserId,
        id: InternshipId,
        edit: InternshipEdit,
    ) -> Result<InternshipSummary, PlacementError> {
        let user = self.user(actor)?;
        let mut registry = self.registry();
        let internship = find_internship(&registry, id)?;
        ensure_owner(&user, internship)?;
        internship_transition(internship, InternshipAction::Edit)?;

        let draft = edit.merge_into(internship.draft());
        self.policy.validate_draft(&draft)?;

        if let Some(internship) = registry.internship_mut(id) {
            internship.apply_draft(draft);
        }
        info!(internship_id = %id, "internship edited");

        let mut touched = Touched::default();
        touched.internships.insert(id);
        self.persist(&registry, &touched)?;

        self.internship_summary(&registry, id)
    }

    /// Move a rejected posting back to `Pending` so it can be edited and reviewed again.
    pub fn resubmit_internship(
        &self,
        actor: &UserId,
        id: InternshipId,
    ) -> Result<InternshipSummary, PlacementError> {
        let user = self.user(actor)?;
        let mut registry = self.registry();
        let internship = find_internship(&registry, id)?;
        ensure_owner(&user, internship)?;
        let status = internship_transition(internship, InternshipAction::Resubmit)?;
        self.ensure_posting_capacity(&registry, actor)?;

        if let Some(internship) = registry.internship_mut(id) {
            internship.status = status;
            internship.visible = false;
        }
        info!(internship_id = %id, "internship resubmitted for review");

        let mut touched = Touched::default();
        touched.internships.insert(id);
        self.persist(&registry, &touched)?;

        self.internship_summary(&registry, id)
    }

    pub fn delete_internship(&self, actor: &UserId, id: InternshipId) -> Result<(), PlacementError> {
        let user = self.user(actor)?;
        let mut registry = self.registry();
        let internship = find_internship(&registry, id)?;
        ensure_owner(&user, internship)?;
        internship_transition(internship, InternshipAction::Delete)?;

        let Some(removed) = registry.remove_internship(id) else {
            return Err(PlacementError::not_found("internship", id));
        };
        info!(internship_id = %id, "internship deleted");

        self.gateway.delete_internship(&removed).map_err(|source| {
            error!(
                internship_id = %id,
                error = %source,
                "failed to persist internship deletion; in-memory state already updated"
            );
            PlacementError::Persistence(source)
        })
    }

    pub fn approve_internship(
        &self,
        actor: &UserId,
        id: InternshipId,
    ) -> Result<InternshipSummary, PlacementError> {
        self.review_internship(actor, id, InternshipAction::Approve)
    }

    pub fn reject_internship(
        &self,
        actor: &UserId,
        id: InternshipId,
    ) -> Result<InternshipSummary, PlacementError> {
        self.review_internship(actor, id, InternshipAction::Reject)
    }

    fn review_internship(
        &self,
        actor: &UserId,
        id: InternshipId,
        action: InternshipAction,
    ) -> Result<InternshipSummary, PlacementError> {
        let user = self.user(actor)?;
        ensure_staff(&user, action.label())?;
        let mut registry = self.registry();
        let internship = find_internship(&registry, id)?;
        let status = internship_transition(internship, action)?;

        if let Some(internship) = registry.internship_mut(id) {
            internship.status = status;
            internship.visible = status == InternshipStatus::Approved;
        }
        info!(internship_id = %id, status = status.label(), reviewer = %actor, "internship reviewed");

        let mut touched = Touched::default();
        touched.internships.insert(id);
        self.persist(&registry, &touched)?;

        self.internship_summary(&registry, id)
    }

    /// Flip the visibility flag. Outside `Approved` this leaves the posting unchanged.
    pub fn toggle_visibility(
        &self,
        actor: &UserId,
        id: InternshipId,
    ) -> Result<InternshipSummary, PlacementError> {
        let user = self.user(actor)?;
        let mut registry = self.registry();
        let internship = find_internship(&registry, id)?;
        ensure_owner(&user, internship)?;

        if internship.status() != InternshipStatus::Approved {
            debug!(
                internship_id = %id,
                status = internship.status().label(),
                "visibility toggle ignored outside approved status"
            );
            return self.internship_summary(&registry, id);
        }

        let mut visible = false;
        if let Some(internship) = registry.internship_mut(id) {
            internship.visible = !internship.visible;
            visible = internship.visible;
        }
        info!(internship_id = %id, visible, "internship visibility toggled");

        let mut touched = Touched::default();
        touched.internships.insert(id);
        self.persist(&registry, &touched)?;

        self.internship_summary(&registry, id)
    }

    pub fn submit_application(
        &self,
        actor: &UserId,
        internship_id: InternshipId,
        applied_on: NaiveDate,
    ) -> Result<ApplicationSummary, PlacementError> {
        let user = self.user(actor)?;
        let UserRole::Student {
            major,
            year_of_study,
        } = &user.role
        else {
            return Err(PlacementError::unauthorized(&user, "apply for internships"));
        };

        let mut registry = self.registry();
        let internship = find_internship(&registry, internship_id)?;
        check_visibility(internship, major, *year_of_study, applied_on)
            .map_err(ValidationError::NotEligible)?;

        let mut active = 0;
        for application in registry.applications_for_student(actor) {
            if application.occupies_slot() {
                return Err(ValidationError::AlreadyPlaced.into());
            }
            if application.status().is_active() {
                if application.internship_id == internship_id {
                    return Err(ValidationError::DuplicateApplication {
                        internship_id: internship_id.0,
                    }
                    .into());
                }
                active += 1;
            }
        }
        if active >= self.policy.max_active_applications {
            return Err(ValidationError::ApplicationLimitReached {
                limit: self.policy.max_active_applications,
            }
            .into());
        }

        let id = registry.allocate_application_id();
        registry.insert_application(Application::new(
            id,
            internship_id,
            actor.clone(),
            applied_on,
        ));
        info!(
            application_id = %id,
            internship_id = %internship_id,
            student_id = %actor,
            "application submitted"
        );

        let mut touched = Touched::default();
        touched.applications.insert(id);
        self.persist(&registry, &touched)?;

        self.application_summary(&registry, id)
    }

    pub fn approve_application(
        &self,
        actor: &UserId,
        id: ApplicationId,
    ) -> Result<ApplicationSummary, PlacementError> {
        self.company_decision(actor, id, ApplicationAction::Approve)
    }

    pub fn reject_application(
        &self,
        actor: &UserId,
        id: ApplicationId,
    ) -> Result<ApplicationSummary, PlacementError> {
        self.company_decision(actor, id, ApplicationAction::Reject)
    }

    fn company_decision(
        &self,
        actor: &UserId,
        id: ApplicationId,
        action: ApplicationAction,
    ) -> Result<ApplicationSummary, PlacementError> {
        let user = self.user(actor)?;
        let mut registry = self.registry();
        let application = find_application(&registry, id)?;
        ensure_owner(&user, find_internship(&registry, application.internship_id)?)?;
        let transition = application_transition(application, action)?;

        apply_transition(&mut registry, id, transition);
        info!(application_id = %id, action = action.label(), "application decision recorded");

        let mut touched = Touched::default();
        touched.applications.insert(id);
        self.persist(&registry, &touched)?;

        self.application_summary(&registry, id)
    }

    /// Student accepts a successful offer. Withdraws every other active application of the
    /// student and recounts every posting involved.
    pub fn accept_application(
        &self,
        actor: &UserId,
        id: ApplicationId,
    ) -> Result<PlacementOutcome, PlacementError> {
        let user = self.user(actor)?;
        let mut registry = self.registry();
        let application = find_application(&registry, id)?;
        ensure_applicant(&user, application)?;
        self.place(&mut registry, id)
    }

    /// Posting owner confirms a successful offer; runs the same cascade as acceptance.
    pub fn confirm_placement(
        &self,
        actor: &UserId,
        id: ApplicationId,
    ) -> Result<PlacementOutcome, PlacementError> {
        let user = self.user(actor)?;
        let mut registry = self.registry();
        let application = find_application(&registry, id)?;
        ensure_owner(&user, find_internship(&registry, application.internship_id)?)?;
        self.place(&mut registry, id)
    }

    fn place(
        &self,
        registry: &mut PlacementRegistry,
        id: ApplicationId,
    ) -> Result<PlacementOutcome, PlacementError> {
        let application = find_application(registry, id)?;
        let transition = application_transition(application, ApplicationAction::Accept)?;
        let internship_id = application.internship_id;
        let student_id = application.student_id.clone();

        let internship = find_internship(registry, internship_id)?;
        if registry.occupied_slots(internship_id) >= internship.num_slots {
            return Err(ValidationError::NoRemainingSlots {
                internship_id: internship_id.0,
            }
            .into());
        }

        apply_transition(registry, id, transition);
        let withdrawn = registry.withdraw_other_applications(&student_id, id);

        let mut touched = Touched::default();
        touched.applications.insert(id);
        touched.internships.insert(internship_id);
        for (withdrawn_id, withdrawn_internship) in &withdrawn {
            touched.applications.insert(*withdrawn_id);
            touched.internships.insert(*withdrawn_internship);
        }
        for internship in &touched.internships {
            registry.recompute_slots(*internship);
        }

        info!(
            application_id = %id,
            internship_id = %internship_id,
            student_id = %student_id,
            withdrawn = withdrawn.len(),
            "placement accepted"
        );
        self.persist(registry, &touched)?;

        Ok(PlacementOutcome {
            accepted: self.application_summary(registry, id)?,
            internship: self.internship_summary(registry, internship_id)?,
            withdrawn: withdrawn.into_iter().map(|(id, _)| id).collect(),
        })
    }

    /// Student declines a successful offer or reverses an accepted placement.
    pub fn reject_placement(
        &self,
        actor: &UserId,
        id: ApplicationId,
    ) -> Result<ApplicationSummary, PlacementError> {
        let user = self.user(actor)?;
        let mut registry = self.registry();
        let application = find_application(&registry, id)?;
        ensure_applicant(&user, application)?;
        let was_accepted = application.status() == ApplicationStatus::Accepted;
        let internship_id = application.internship_id;
        let transition = application_transition(application, ApplicationAction::DeclineOffer)?;

        apply_transition(&mut registry, id, transition);
        let mut touched = Touched::default();
        touched.applications.insert(id);
        if was_accepted {
            registry.recompute_slots(internship_id);
            touched.internships.insert(internship_id);
        }
        info!(application_id = %id, was_accepted, "placement rejected by student");

        self.persist(&registry, &touched)?;
        self.application_summary(&registry, id)
    }

    pub fn request_withdrawal(
        &self,
        actor: &UserId,
        id: ApplicationId,
        reason: Option<String>,
    ) -> Result<ApplicationSummary, PlacementError> {
        let user = self.user(actor)?;
        let mut registry = self.registry();
        let application = find_application(&registry, id)?;
        ensure_applicant(&user, application)?;
        let transition = application_transition(application, ApplicationAction::RequestWithdrawal)?;

        apply_transition(&mut registry, id, transition);
        if let Some(application) = registry.application_mut(id) {
            application.withdrawal_reason = reason
                .map(|reason| reason.trim().to_string())
                .filter(|reason| !reason.is_empty());
        }
        info!(
            application_id = %id,
            previous_status = transition.previous.map(ApplicationStatus::label),
            "withdrawal requested"
        );

        let mut touched = Touched::default();
        touched.applications.insert(id);
        self.persist(&registry, &touched)?;

        self.application_summary(&registry, id)
    }

    pub fn approve_withdrawal(
        &self,
        actor: &UserId,
        id: ApplicationId,
    ) -> Result<ApplicationSummary, PlacementError> {
        let user = self.user(actor)?;
        ensure_staff(&user, ApplicationAction::ApproveWithdrawal.label())?;
        let mut registry = self.registry();
        let application = find_application(&registry, id)?;
        let held_slot = application.previous_status() == Some(ApplicationStatus::Accepted);
        let internship_id = application.internship_id;
        let transition = application_transition(application, ApplicationAction::ApproveWithdrawal)?;

        apply_transition(&mut registry, id, transition);
        let mut touched = Touched::default();
        touched.applications.insert(id);
        if held_slot {
            registry.recompute_slots(internship_id);
            touched.internships.insert(internship_id);
        }
        info!(application_id = %id, released_slot = held_slot, "withdrawal approved");

        self.persist(&registry, &touched)?;
        self.application_summary(&registry, id)
    }

    pub fn reject_withdrawal(
        &self,
        actor: &UserId,
        id: ApplicationId,
    ) -> Result<ApplicationSummary, PlacementError> {
        let user = self.user(actor)?;
        ensure_staff(&user, ApplicationAction::RejectWithdrawal.label())?;
        let mut registry = self.registry();
        let application = find_application(&registry, id)?;
        let internship_id = application.internship_id;
        let transition = application_transition(application, ApplicationAction::RejectWithdrawal)?;

        apply_transition(&mut registry, id, transition);
        if let Some(application) = registry.application_mut(id) {
            application.withdrawal_reason = None;
        }

        let mut touched = Touched::default();
        touched.applications.insert(id);
        if matches!(
            transition.to,
            ApplicationStatus::Accepted | ApplicationStatus::Successful
        ) {
            registry.recompute_slots(internship_id);
            touched.internships.insert(internship_id);
        }
        info!(
            application_id = %id,
            restored = transition.to.label(),
            "withdrawal rejected"
        );

        self.persist(&registry, &touched)?;
        self.application_summary(&registry, id)
    }

    pub fn internship(&self, id: InternshipId) -> Result<InternshipSummary, PlacementError> {
        let registry = self.registry();
        self.internship_summary(&registry, id)
    }

    pub fn internships(&self) -> Vec<InternshipSummary> {
        let registry = self.registry();
        registry.all_internships().map(Internship::summary).collect()
    }

    pub fn application(&self, id: ApplicationId) -> Result<ApplicationSummary, PlacementError> {
        let registry = self.registry();
        self.application_summary(&registry, id)
    }

    pub fn applications(&self) -> Vec<ApplicationSummary> {
        let registry = self.registry();
        registry
            .all_applications()
            .map(|application| application.summary(registry.find_by_id(application.internship_id)))
            .collect()
    }

    /// Postings the student could apply to on `on`.
    pub fn visible_internships(
        &self,
        student: &UserId,
        on: NaiveDate,
    ) -> Result<Vec<InternshipSummary>, PlacementError> {
        let user = self.user(student)?;
        let UserRole::Student {
            major,
            year_of_study,
        } = &user.role
        else {
            return Err(PlacementError::unauthorized(&user, "browse student postings"));
        };

        let registry = self.registry();
        Ok(registry
            .all_internships()
            .filter(|internship| check_visibility(internship, major, *year_of_study, on).is_ok())
            .map(Internship::summary)
            .collect())
    }

    pub fn student_applications(
        &self,
        student: &UserId,
    ) -> Result<Vec<ApplicationSummary>, PlacementError> {
        self.user(student)?;
        let registry = self.registry();
        Ok(registry
            .applications_for_student(student)
            .map(|application| application.summary(registry.find_by_id(application.internship_id)))
            .collect())
    }

    /// Applications to a posting, visible to its owner.
    pub fn internship_applications(
        &self,
        actor: &UserId,
        id: InternshipId,
    ) -> Result<Vec<ApplicationSummary>, PlacementError> {
        let user = self.user(actor)?;
        let registry = self.registry();
        let internship = find_internship(&registry, id)?;
        ensure_owner(&user, internship)?;
        Ok(registry
            .applications_for_internship(id)
            .into_iter()
            .map(|application| application.summary(Some(internship)))
            .collect())
    }

    pub fn pending_withdrawals(
        &self,
        actor: &UserId,
    ) -> Result<Vec<ApplicationSummary>, PlacementError> {
        let user = self.user(actor)?;
        ensure_staff(&user, "review withdrawals")?;
        let registry = self.registry();
        Ok(registry
            .all_applications()
            .filter(|application| application.status() == ApplicationStatus::WithdrawalRequested)
            .map(|application| application.summary(registry.find_by_id(application.internship_id)))
            .collect())
    }

    fn registry(&self) -> MutexGuard<'_, PlacementRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn user(&self, id: &UserId) -> Result<User, PlacementError> {
        self.directory
            .find_by_id(id)
            .ok_or_else(|| PlacementError::not_found("user", id))
    }

    /// Pending and approved postings count against the creator's cap.
    fn ensure_posting_capacity(
        &self,
        registry: &PlacementRegistry,
        creator: &UserId,
    ) -> Result<(), PlacementError> {
        let open_postings = registry
            .all_internships()
            .filter(|internship| &internship.creator_id == creator)
            .filter(|internship| PlacementPolicy::counts_as_open(internship.status()))
            .count();
        if open_postings >= self.policy.max_open_postings {
            return Err(ValidationError::PostingCapReached {
                cap: self.policy.max_open_postings,
            }
            .into());
        }
        Ok(())
    }

    fn internship_summary(
        &self,
        registry: &PlacementRegistry,
        id: InternshipId,
    ) -> Result<InternshipSummary, PlacementError> {
        find_internship(registry, id).map(Internship::summary)
    }

    fn application_summary(
        &self,
        registry: &PlacementRegistry,
        id: ApplicationId,
    ) -> Result<ApplicationSummary, PlacementError> {
        let application = find_application(registry, id)?;
        Ok(application.summary(registry.find_by_id(application.internship_id)))
    }

    /// Write every touched record, applications first. The in-memory mutation is kept
    /// even when a write fails.
    fn persist(&self, registry: &PlacementRegistry, touched: &Touched) -> Result<(), PlacementError> {
        for id in &touched.applications {
            let Some(application) = registry.application(*id) else {
                continue;
            };
            self.gateway.save_application(application).map_err(|source| {
                error!(
                    application_id = %id,
                    error = %source,
                    "failed to persist application; in-memory state already updated"
                );
                PlacementError::Persistence(source)
            })?;
        }

        for id in &touched.internships {
            let Some(internship) = registry.find_by_id(*id) else {
                continue;
            };
            self.gateway.save_internship(internship).map_err(|source| {
                error!(
                    internship_id = %id,
                    error = %source,
                    "failed to persist internship; in-memory state already updated"
                );
                PlacementError::Persistence(source)
            })?;
        }

        Ok(())
    }
}

fn find_internship(
    registry: &PlacementRegistry,
    id: InternshipId,
) -> Result<&Internship, PlacementError> {
    registry
        .find_by_id(id)
        .ok_or_else(|| PlacementError::not_found("internship", id))
}

fn find_application(
    registry: &PlacementRegistry,
    id: ApplicationId,
) -> Result<&Application, PlacementError> {
    registry
        .application(id)
        .ok_or_else(|| PlacementError::not_found("application", id))
}

fn application_transition(
    application: &Application,
    action: ApplicationAction,
) -> Result<ApplicationTransition, PlacementError> {
    next_application_status(application.status(), application.previous_status(), action)
        .ok_or_else(|| PlacementError::InvalidTransition {
            entity: "application",
            id: application.id.to_string(),
            current: application.status().label(),
            action: action.label(),
        })
}

fn internship_transition(
    internship: &Internship,
    action: InternshipAction,
) -> Result<InternshipStatus, PlacementError> {
    next_internship_status(internship.status(), action).ok_or_else(|| {
        PlacementError::InvalidTransition {
            entity: "internship",
            id: internship.id.to_string(),
            current: internship.status().label(),
            action: action.label(),
        }
    })
}

fn apply_transition(
    registry: &mut PlacementRegistry,
    id: ApplicationId,
    transition: ApplicationTransition,
) {
    if let Some(application) = registry.application_mut(id) {
        application.status = transition.to;
        application.previous_status = transition.previous;
    }
}

fn ensure_owner(user: &User, internship: &Internship) -> Result<(), PlacementError> {
    match &user.role {
        UserRole::CompanyRepresentative { .. } if internship.creator_id == user.id => Ok(()),
        _ => Err(PlacementError::Unauthorized(format!(
            "{} is not the representative who owns internship {}",
            user.id, internship.id
        ))),
    }
}

fn ensure_applicant(user: &User, application: &Application) -> Result<(), PlacementError> {
    if application.student_id == user.id {
        Ok(())
    } else {
        Err(PlacementError::Unauthorized(format!(
            "{} did not submit application {}",
            user.id, application.id
        )))
    }
}

fn ensure_staff(user: &User, action: &str) -> Result<(), PlacementError> {
    match user.role {
        UserRole::Staff => Ok(()),
        _ => Err(PlacementError::unauthorized(user, action)),
    }
}

/// Error raised by the placement service.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("cannot {action} on {entity} {id} while it is {current}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        current: &'static str,
        action: &'static str,
    },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("persistence failure: {0}")]
    Persistence(#[from] GatewayError),
}

impl PlacementError {
    fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    fn unauthorized(user: &User, action: &str) -> Self {
        Self::Unauthorized(format!(
            "{} ({}) may not {}",
            user.id,
            user.role.label(),
            action
        ))
    }
}
