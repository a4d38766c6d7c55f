use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::workflows::placement::domain::{Application, ApplicationId, Internship, InternshipId};
use crate::workflows::placement::repository::{GatewayError, PlacementGateway, Snapshot};

#[derive(Debug, Default)]
struct MemoryState {
    internships: BTreeMap<InternshipId, Internship>,
    applications: BTreeMap<ApplicationId, Application>,
    last_internship_id: u64,
    last_application_id: u64,
    writes: usize,
}

/// Process-local gateway used by demos and tests.
#[derive(Debug, Default)]
pub struct MemoryPlacementStore {
    state: Mutex<MemoryState>,
}

impl MemoryPlacementStore {
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.last_internship_id = snapshot.last_internship_id;
            state.last_application_id = snapshot.last_application_id;
            for internship in snapshot.internships {
                state.last_internship_id = state.last_internship_id.max(internship.id.0);
                state.internships.insert(internship.id, internship);
            }
            for application in snapshot.applications {
                state.last_application_id = state.last_application_id.max(application.id.0);
                state.applications.insert(application.id, application);
            }
        }
        store
    }

    pub fn stored_internship(&self, id: InternshipId) -> Option<Internship> {
        self.state().internships.get(&id).cloned()
    }

    pub fn stored_application(&self, id: ApplicationId) -> Option<Application> {
        self.state().applications.get(&id).cloned()
    }

    /// Number of successful save/delete calls.
    pub fn writes(&self) -> usize {
        self.state().writes
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PlacementGateway for MemoryPlacementStore {
    fn load(&self) -> Result<Snapshot, GatewayError> {
        let state = self.state();
        Ok(Snapshot {
            internships: state.internships.values().cloned().collect(),
            applications: state.applications.values().cloned().collect(),
            last_internship_id: state.last_internship_id,
            last_application_id: state.last_application_id,
        })
    }

    fn save_internship(&self, internship: &Internship) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.internships.insert(internship.id, internship.clone());
        state.last_internship_id = state.last_internship_id.max(internship.id.0);
        state.writes += 1;
        Ok(())
    }

    fn save_application(&self, application: &Application) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.applications.insert(application.id, application.clone());
        state.last_application_id = state.last_application_id.max(application.id.0);
        state.writes += 1;
        Ok(())
    }

    fn delete_internship(&self, internship: &Internship) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.internships.remove(&internship.id);
        state.writes += 1;
        Ok(())
    }
}
