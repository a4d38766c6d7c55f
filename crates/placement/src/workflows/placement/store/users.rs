use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::workflows::placement::domain::User;
use crate::workflows::placement::repository::{GatewayError, InMemoryUserDirectory};

pub const USERS_FILE: &str = "users.csv";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRow {
    id: String,
    name: String,
    role: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    major: Option<String>,
    #[serde(default)]
    year_of_study: Option<u8>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    company_name: Option<String>,
}

impl UserRow {
    fn into_user(self) -> Result<User, GatewayError> {
        match self.role.trim().to_ascii_lowercase().as_str() {
            "student" => {
                let major = self.major.ok_or_else(|| missing(&self.id, "major"))?;
                let year = self
                    .year_of_study
                    .ok_or_else(|| missing(&self.id, "yearOfStudy"))?;
                Ok(User::student(self.id, self.name, major, year))
            }
            "company" | "company_representative" | "representative" => {
                let company = self
                    .company_name
                    .ok_or_else(|| missing(&self.id, "companyName"))?;
                Ok(User::company_representative(self.id, self.name, company))
            }
            "staff" => Ok(User::staff(self.id, self.name)),
            other => Err(GatewayError::Corrupt(format!(
                "user {} has unknown role '{other}'",
                self.id
            ))),
        }
    }
}

fn missing(id: &str, column: &str) -> GatewayError {
    GatewayError::Corrupt(format!("user {id} is missing {column}"))
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Load the user directory from a `users.csv` export
/// (`id,name,role,major,yearOfStudy,companyName`).
pub fn load_user_directory<P: AsRef<Path>>(path: P) -> Result<InMemoryUserDirectory, GatewayError> {
    let file = std::fs::File::open(path)?;
    read_user_directory(file)
}

pub fn read_user_directory<R: Read>(reader: R) -> Result<InMemoryUserDirectory, GatewayError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut directory = InMemoryUserDirectory::default();
    for row in csv_reader.deserialize::<UserRow>() {
        directory.insert(row?.into_user()?);
    }
    Ok(directory)
}
