use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::placement::domain::{
    Application, Internship, InternshipDraft, InternshipId, InternshipLevel, User, UserId,
};
use crate::workflows::placement::policy::PlacementPolicy;
use crate::workflows::placement::repository::{
    GatewayError, InMemoryUserDirectory, PlacementGateway, Snapshot,
};
use crate::workflows::placement::service::PlacementService;
use crate::workflows::placement::store::MemoryPlacementStore;

pub(super) type MemoryService = PlacementService<MemoryPlacementStore, InMemoryUserDirectory>;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn today() -> NaiveDate {
    date(2025, 3, 10)
}

pub(super) fn rep() -> UserId {
    UserId::new("rep@acme.example")
}

pub(super) fn other_rep() -> UserId {
    UserId::new("rep@globex.example")
}

pub(super) fn staff() -> UserId {
    UserId::new("staff01")
}

pub(super) fn senior() -> UserId {
    UserId::new("U2310001A")
}

pub(super) fn junior() -> UserId {
    UserId::new("U2410002B")
}

pub(super) fn directory() -> InMemoryUserDirectory {
    [
        User::company_representative(rep().0, "Avery Tan", "Acme Robotics"),
        User::company_representative(other_rep().0, "Jordan Lim", "Globex"),
        User::staff(staff().0, "Career Office"),
        User::student(senior().0, "Sam Lee", "Computer Science", 3),
        User::student(junior().0, "Riley Ong", "Computer Science", 1),
    ]
    .into_iter()
    .collect()
}

pub(super) fn draft(title: &str) -> InternshipDraft {
    InternshipDraft {
        title: title.to_string(),
        description: "Build internal tooling".to_string(),
        level: InternshipLevel::Basic,
        preferred_major: "Computer Science".to_string(),
        open_date: date(2025, 3, 1),
        close_date: date(2025, 4, 30),
        num_slots: 2,
    }
}

pub(super) fn build_service() -> (MemoryService, Arc<MemoryPlacementStore>) {
    build_service_with(MemoryPlacementStore::default())
}

pub(super) fn build_service_with(
    store: MemoryPlacementStore,
) -> (MemoryService, Arc<MemoryPlacementStore>) {
    let store = Arc::new(store);
    let service = PlacementService::open(
        store.clone(),
        Arc::new(directory()),
        PlacementPolicy::default(),
    )
    .expect("service opens");
    (service, store)
}

/// Create a posting owned by `owner` and approve it.
pub(super) fn approved_internship(
    service: &MemoryService,
    owner: &UserId,
    title: &str,
    num_slots: u32,
) -> InternshipId {
    let mut draft = draft(title);
    draft.num_slots = num_slots;
    let created = service
        .create_internship(owner, draft)
        .expect("internship created");
    service
        .approve_internship(&staff(), created.id)
        .expect("internship approved");
    created.id
}

/// Gateway whose writes fail after loading an optional snapshot.
#[derive(Default)]
pub(super) struct ReadOnlyStore {
    pub(super) snapshot: Snapshot,
}

impl PlacementGateway for ReadOnlyStore {
    fn load(&self) -> Result<Snapshot, GatewayError> {
        Ok(self.snapshot.clone())
    }

    fn save_internship(&self, _internship: &Internship) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable("read only".to_string()))
    }

    fn save_application(&self, _application: &Application) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable("read only".to_string()))
    }

    fn delete_internship(&self, _internship: &Internship) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable("read only".to_string()))
    }
}

pub(super) struct OfflineStore;

impl PlacementGateway for OfflineStore {
    fn load(&self) -> Result<Snapshot, GatewayError> {
        Err(GatewayError::Unavailable("disk offline".to_string()))
    }

    fn save_internship(&self, _internship: &Internship) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable("disk offline".to_string()))
    }

    fn save_application(&self, _application: &Application) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable("disk offline".to_string()))
    }

    fn delete_internship(&self, _internship: &Internship) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable("disk offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
