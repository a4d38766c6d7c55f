use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Internship, InternshipId, InternshipStatus,
    UserId,
};
use super::repository::{Snapshot, UserDirectory};

/// In-memory working set the engine mutates. Built once from a [`Snapshot`] and owned by
/// the service; nothing outside the service reaches it.
#[derive(Debug, Default)]
pub struct PlacementRegistry {
    internships: BTreeMap<InternshipId, Internship>,
    applications: BTreeMap<ApplicationId, Application>,
    next_internship_id: u64,
    next_application_id: u64,
}

/// Outcome of a slot recount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRecount {
    pub filled_slots: u32,
    pub status: InternshipStatus,
    pub changed: bool,
}

impl PlacementRegistry {
    /// Rebuild the working set from persisted records. Internships are indexed first;
    /// applications pointing at an unknown internship are dropped. Identifier sequences
    /// resume past the highest id the store has ever seen, so deleted ids are never reissued.
    pub fn from_snapshot<U: UserDirectory + ?Sized>(snapshot: Snapshot, directory: &U) -> Self {
        let mut registry = Self {
            next_internship_id: snapshot.last_internship_id.saturating_add(1),
            next_application_id: snapshot.last_application_id.saturating_add(1),
            ..Self::default()
        };

        for mut internship in snapshot.internships {
            if directory.find_by_id(&internship.creator_id).is_none() {
                warn!(
                    internship_id = %internship.id,
                    creator_id = %internship.creator_id,
                    "internship creator not found in user directory"
                );
            }
            internship.applications.clear();
            registry.next_internship_id = registry.next_internship_id.max(internship.id.0 + 1);
            registry.internships.insert(internship.id, internship);
        }

        let mut applications = snapshot.applications;
        applications.sort_by_key(|application| application.id);
        for application in applications {
            registry.next_application_id =
                registry.next_application_id.max(application.id.0 + 1);

            let Some(internship) = registry.internships.get_mut(&application.internship_id) else {
                warn!(
                    application_id = %application.id,
                    internship_id = %application.internship_id,
                    "dropping application that references a missing internship"
                );
                continue;
            };

            if directory.find_by_id(&application.student_id).is_none() {
                warn!(
                    application_id = %application.id,
                    student_id = %application.student_id,
                    "applicant not found in user directory"
                );
            }

            internship.applications.push(application.id);
            registry.applications.insert(application.id, application);
        }

        let ids: Vec<InternshipId> = registry.internships.keys().copied().collect();
        for id in ids {
            if let Some(recount) = registry.recompute_slots(id) {
                if recount.changed {
                    debug!(
                        internship_id = %id,
                        filled_slots = recount.filled_slots,
                        status = recount.status.label(),
                        "reconciled slot count on load"
                    );
                }
            }
        }

        registry
    }

    pub fn find_by_id(&self, id: InternshipId) -> Option<&Internship> {
        self.internships.get(&id)
    }

    pub fn all_internships(&self) -> impl Iterator<Item = &Internship> {
        self.internships.values()
    }

    pub fn application(&self, id: ApplicationId) -> Option<&Application> {
        self.applications.get(&id)
    }

    pub fn all_applications(&self) -> impl Iterator<Item = &Application> {
        self.applications.values()
    }

    pub fn applications_for_student<'a>(
        &'a self,
        student_id: &'a UserId,
    ) -> impl Iterator<Item = &'a Application> + 'a {
        self.applications
            .values()
            .filter(move |application| &application.student_id == student_id)
    }

    pub fn applications_for_internship(&self, id: InternshipId) -> Vec<&Application> {
        self.internships
            .get(&id)
            .map(|internship| {
                internship
                    .applications
                    .iter()
                    .filter_map(|application_id| self.applications.get(application_id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn occupied_slots(&self, id: InternshipId) -> u32 {
        let occupied = self
            .applications_for_internship(id)
            .into_iter()
            .filter(|application| application.occupies_slot())
            .count();
        u32::try_from(occupied).unwrap_or(u32::MAX)
    }

    pub(crate) fn internship_mut(&mut self, id: InternshipId) -> Option<&mut Internship> {
        self.internships.get_mut(&id)
    }

    pub(crate) fn application_mut(&mut self, id: ApplicationId) -> Option<&mut Application> {
        self.applications.get_mut(&id)
    }

    pub(crate) fn allocate_internship_id(&mut self) -> InternshipId {
        let id = InternshipId(self.next_internship_id.max(1));
        self.next_internship_id = id.0 + 1;
        id
    }

    pub(crate) fn allocate_application_id(&mut self) -> ApplicationId {
        let id = ApplicationId(self.next_application_id.max(1));
        self.next_application_id = id.0 + 1;
        id
    }

    pub(crate) fn insert_internship(&mut self, internship: Internship) {
        self.internships.insert(internship.id, internship);
    }

    pub(crate) fn remove_internship(&mut self, id: InternshipId) -> Option<Internship> {
        self.internships.remove(&id)
    }

    pub(crate) fn insert_application(&mut self, application: Application) {
        if let Some(internship) = self.internships.get_mut(&application.internship_id) {
            internship.applications.push(application.id);
        }
        self.applications.insert(application.id, application);
    }

    /// Force every other active application of `student_id` to `Withdrawn`. Returns the
    /// withdrawn ids with the internships they belonged to.
    pub(crate) fn withdraw_other_applications(
        &mut self,
        student_id: &UserId,
        keep: ApplicationId,
    ) -> Vec<(ApplicationId, InternshipId)> {
        let mut withdrawn = Vec::new();
        for application in self.applications.values_mut() {
            if application.id == keep
                || &application.student_id != student_id
                || application.status.is_terminal()
            {
                continue;
            }

            application.status = ApplicationStatus::Withdrawn;
            application.previous_status = None;
            application.withdrawal_reason = Some(format!("superseded by accepted application {keep}"));
            withdrawn.push((application.id, application.internship_id));
        }
        withdrawn
    }

    /// Recount slot occupancy from the application set and re-derive `Filled`.
    pub(crate) fn recompute_slots(&mut self, id: InternshipId) -> Option<SlotRecount> {
        let occupied = self.occupied_slots(id);
        let internship = self.internships.get_mut(&id)?;

        if occupied > internship.num_slots {
            warn!(
                internship_id = %id,
                occupied,
                num_slots = internship.num_slots,
                "more applications hold slots than the posting offers"
            );
        }

        let filled_slots = occupied.min(internship.num_slots);
        let status = match internship.status {
            InternshipStatus::Approved | InternshipStatus::Filled
                if filled_slots >= internship.num_slots =>
            {
                InternshipStatus::Filled
            }
            InternshipStatus::Filled => InternshipStatus::Approved,
            other => other,
        };

        let changed = filled_slots != internship.filled_slots || status != internship.status;
        internship.filled_slots = filled_slots;
        internship.status = status;

        Some(SlotRecount {
            filled_slots,
            status,
            changed,
        })
    }
}
