mod csv_log;
mod memory;
mod users;

pub use csv_log::{CompactionReport, CsvPlacementStore, APPLICATIONS_FILE, INTERNSHIPS_FILE};
pub use memory::MemoryPlacementStore;
pub use users::{load_user_directory, read_user_directory, USERS_FILE};
