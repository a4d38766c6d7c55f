//! Internship posting and application lifecycle.
//!
//! The [`PlacementService`] is the only writer: it validates each operation against the
//! transition tables in [`transitions`], mutates the in-memory registry, recounts slots,
//! and persists every touched record through a [`PlacementGateway`].

pub mod domain;
pub mod policy;
pub mod registry;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;
pub mod transitions;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationId, ApplicationStatus, Internship, InternshipDraft, InternshipEdit,
    InternshipId, InternshipLevel, InternshipStatus, User, UserId, UserRole,
};
pub use policy::{check_visibility, Ineligibility, PlacementPolicy, ValidationError};
pub use registry::{PlacementRegistry, SlotRecount};
pub use repository::{GatewayError, InMemoryUserDirectory, PlacementGateway, Snapshot, UserDirectory};
pub use router::placement_router;
pub use service::{PlacementError, PlacementService};
pub use store::{CsvPlacementStore, MemoryPlacementStore};
pub use transitions::{ApplicationAction, InternshipAction};
pub use views::{ApplicationSummary, InternshipSummary, PlacementOutcome};
