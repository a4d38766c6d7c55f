use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use placement::config::AppConfig;
use placement::error::AppError;
use placement::workflows::placement::store::load_user_directory;
use placement::workflows::placement::{
    CsvPlacementStore, InMemoryUserDirectory, PlacementService,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type CsvService = PlacementService<CsvPlacementStore, InMemoryUserDirectory>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Open the CSV logs and user export named by `config` and load the working set.
pub(crate) fn open_csv_service(
    config: &AppConfig,
) -> Result<Arc<CsvService>, AppError> {
    let store = Arc::new(CsvPlacementStore::open(&config.storage.data_dir)?);
    let users = load_user_directory(&config.storage.users_file)?;
    info!(
        users = users.len(),
        users_file = %config.storage.users_file.display(),
        "user directory loaded"
    );

    let service = PlacementService::open(store, Arc::new(users), config.policy)?;
    Ok(Arc::new(service))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use placement::config::{AppEnvironment, ServerConfig, StorageConfig, TelemetryConfig};
    use placement::workflows::placement::{PlacementPolicy, UserId};
    use tempfile::TempDir;

    fn config_for(dir: &TempDir) -> AppConfig {
        AppConfig {
            environment: AppEnvironment::Test,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            telemetry: TelemetryConfig {
                log_level: "info".to_string(),
            },
            storage: StorageConfig {
                data_dir: dir.path().join("data"),
                users_file: dir.path().join("users.csv"),
            },
            policy: PlacementPolicy::default(),
        }
    }

    #[test]
    fn open_csv_service_loads_users_and_logs() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join("users.csv"),
            "id,name,role,major,yearOfStudy,companyName\n\
             staff01,Career Office,staff,,,\n",
        )
        .expect("seed users");

        let service = open_csv_service(&config_for(&dir)).expect("service opens");

        assert!(service.internships().is_empty());
        assert!(dir.path().join("data").join("internships.csv").exists());
        let staff = UserId::new("staff01");
        assert!(service.pending_withdrawals(&staff).expect("staff listing").is_empty());
    }

    #[test]
    fn open_csv_service_requires_the_user_export() {
        let dir = TempDir::new().expect("tempdir");

        match open_csv_service(&config_for(&dir)) {
            Err(AppError::Storage(_)) => {}
            Err(other) => panic!("expected storage error, got {other}"),
            Ok(_) => panic!("expected missing user export to fail"),
        }
    }

    #[test]
    fn parse_date_accepts_iso_dates() {
        assert_eq!(
            parse_date(" 2025-03-10 "),
            Ok(NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date"))
        );
        let err = parse_date("10/03/2025").expect_err("non-iso date rejected");
        assert!(err.contains("YYYY-MM-DD"));
    }
}
