use std::collections::BTreeMap;

use super::domain::{Application, Internship, User, UserId};

/// Full persisted state returned by [`PlacementGateway::load`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub internships: Vec<Internship>,
    pub applications: Vec<Application>,
    /// Highest internship id ever written, deleted postings included.
    pub last_internship_id: u64,
    /// Highest application id ever written.
    pub last_application_id: u64,
}

/// Synchronous storage boundary. Every `save_*` must complete before the triggering
/// operation returns; there is no rollback if it fails.
pub trait PlacementGateway: Send + Sync {
    fn load(&self) -> Result<Snapshot, GatewayError>;
    fn save_internship(&self, internship: &Internship) -> Result<(), GatewayError>;
    fn save_application(&self, application: &Application) -> Result<(), GatewayError>;
    fn delete_internship(&self, internship: &Internship) -> Result<(), GatewayError>;
}

/// Read-only lookup of the people referenced by postings and applications.
pub trait UserDirectory: Send + Sync {
    fn find_by_id(&self, id: &UserId) -> Option<User>;
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("storage io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid record data: {0}")]
    Csv(#[from] csv::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: BTreeMap<UserId, User>,
}

impl InMemoryUserDirectory {
    pub fn insert(&mut self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl FromIterator<User> for InMemoryUserDirectory {
    fn from_iter<I: IntoIterator<Item = User>>(iter: I) -> Self {
        let mut directory = Self::default();
        for user in iter {
            directory.insert(user);
        }
        directory
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn find_by_id(&self, id: &UserId) -> Option<User> {
        self.users.get(id).cloned()
    }
}
