//! Append-only CSV log keyed by record id.
//!
//! Each file starts with a header row and holds one row per write. Replaying a file keeps
//! the last row per id; a `delete` row removes the id. `compact` rewrites the log to one
//! `upsert` row per live record through a temp file and a rename. When the highest id in
//! the log was deleted, its tombstone survives compaction so the id is never reissued.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use crate::workflows::placement::domain::{
    Application, ApplicationId, ApplicationStatus, Internship, InternshipId, InternshipLevel,
    InternshipStatus, UserId,
};
use crate::workflows::placement::repository::{GatewayError, PlacementGateway, Snapshot};

pub const INTERNSHIPS_FILE: &str = "internships.csv";
pub const APPLICATIONS_FILE: &str = "applications.csv";

const INTERNSHIP_HEADER: [&str; 14] = [
    "id",
    "title",
    "description",
    "level",
    "preferredMajor",
    "openDate",
    "closeDate",
    "companyName",
    "creatorId",
    "visibilityFlag",
    "numSlots",
    "filledSlots",
    "status",
    "op",
];

const APPLICATION_HEADER: [&str; 8] = [
    "id",
    "internshipId",
    "studentId",
    "dateApplied",
    "status",
    "previousStatus",
    "withdrawalReason",
    "op",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RowOp {
    Upsert,
    Delete,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InternshipRow {
    id: u64,
    title: String,
    description: String,
    level: InternshipLevel,
    preferred_major: String,
    open_date: NaiveDate,
    close_date: NaiveDate,
    company_name: String,
    creator_id: String,
    visibility_flag: bool,
    num_slots: u32,
    filled_slots: u32,
    status: InternshipStatus,
    op: RowOp,
}

impl InternshipRow {
    fn new(internship: &Internship, op: RowOp) -> Self {
        Self {
            id: internship.id.0,
            title: internship.title.clone(),
            description: internship.description.clone(),
            level: internship.level,
            preferred_major: internship.preferred_major.clone(),
            open_date: internship.open_date,
            close_date: internship.close_date,
            company_name: internship.company_name.clone(),
            creator_id: internship.creator_id.0.clone(),
            visibility_flag: internship.visible,
            num_slots: internship.num_slots,
            filled_slots: internship.filled_slots,
            status: internship.status,
            op,
        }
    }

    fn into_internship(self) -> Internship {
        Internship {
            id: InternshipId(self.id),
            title: self.title,
            description: self.description,
            level: self.level,
            preferred_major: self.preferred_major,
            open_date: self.open_date,
            close_date: self.close_date,
            company_name: self.company_name,
            creator_id: UserId(self.creator_id),
            visible: self.visibility_flag,
            num_slots: self.num_slots,
            filled_slots: self.filled_slots,
            status: self.status,
            applications: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationRow {
    id: u64,
    internship_id: u64,
    student_id: String,
    date_applied: NaiveDate,
    status: ApplicationStatus,
    previous_status: Option<ApplicationStatus>,
    withdrawal_reason: Option<String>,
    op: RowOp,
}

impl ApplicationRow {
    fn new(application: &Application) -> Self {
        Self {
            id: application.id.0,
            internship_id: application.internship_id.0,
            student_id: application.student_id.0.clone(),
            date_applied: application.date_applied,
            status: application.status,
            previous_status: application.previous_status,
            withdrawal_reason: application.withdrawal_reason.clone(),
            op: RowOp::Upsert,
        }
    }

    fn into_application(self) -> Application {
        Application {
            id: ApplicationId(self.id),
            internship_id: InternshipId(self.internship_id),
            student_id: UserId(self.student_id),
            date_applied: self.date_applied,
            status: self.status,
            previous_status: self.previous_status,
            withdrawal_reason: self.withdrawal_reason.filter(|reason| !reason.is_empty()),
        }
    }
}

trait LogRow: Serialize + DeserializeOwned {
    fn key(&self) -> u64;
    fn op(&self) -> RowOp;
}

impl LogRow for InternshipRow {
    fn key(&self) -> u64 {
        self.id
    }

    fn op(&self) -> RowOp {
        self.op
    }
}

impl LogRow for ApplicationRow {
    fn key(&self) -> u64 {
        self.id
    }

    fn op(&self) -> RowOp {
        self.op
    }
}

/// Row counts before and after a compaction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompactionReport {
    pub internship_rows_before: usize,
    pub internship_rows_after: usize,
    pub application_rows_before: usize,
    pub application_rows_after: usize,
}

/// File-backed [`PlacementGateway`] writing one CSV row per save.
#[derive(Debug)]
pub struct CsvPlacementStore {
    internships_path: PathBuf,
    applications_path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvPlacementStore {
    /// Open (and if needed create) the log files under `data_dir`.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, GatewayError> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)?;

        let store = Self {
            internships_path: data_dir.join(INTERNSHIPS_FILE),
            applications_path: data_dir.join(APPLICATIONS_FILE),
            write_lock: Mutex::new(()),
        };
        ensure_header(&store.internships_path, &INTERNSHIP_HEADER)?;
        ensure_header(&store.applications_path, &APPLICATION_HEADER)?;
        Ok(store)
    }

    pub fn internships_path(&self) -> &Path {
        &self.internships_path
    }

    pub fn applications_path(&self) -> &Path {
        &self.applications_path
    }

    /// Rewrite both logs to a single row per live record.
    pub fn compact(&self) -> Result<CompactionReport, GatewayError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let internships = replay::<InternshipRow>(&self.internships_path)?;
        let applications = replay::<ApplicationRow>(&self.applications_path)?;

        let report = CompactionReport {
            internship_rows_before: internships.rows,
            internship_rows_after: internships.compacted().count(),
            application_rows_before: applications.rows,
            application_rows_after: applications.compacted().count(),
        };

        rewrite(&self.internships_path, &INTERNSHIP_HEADER, internships.compacted())?;
        rewrite(&self.applications_path, &APPLICATION_HEADER, applications.compacted())?;

        info!(
            internships = report.internship_rows_after,
            applications = report.application_rows_after,
            "compacted placement logs"
        );
        Ok(report)
    }

    fn append<R: Serialize>(&self, path: &Path, row: &R) -> Result<(), GatewayError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let file = OpenOptions::new().append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|err| GatewayError::Io(err.into_error()))?;
        file.sync_data()?;
        Ok(())
    }
}

impl PlacementGateway for CsvPlacementStore {
    fn load(&self) -> Result<Snapshot, GatewayError> {
        let internships = replay::<InternshipRow>(&self.internships_path)?;
        let applications = replay::<ApplicationRow>(&self.applications_path)?;

        Ok(Snapshot {
            last_internship_id: internships.last_key,
            last_application_id: applications.last_key,
            internships: internships
                .live
                .into_values()
                .map(InternshipRow::into_internship)
                .collect(),
            applications: applications
                .live
                .into_values()
                .map(ApplicationRow::into_application)
                .collect(),
        })
    }

    fn save_internship(&self, internship: &Internship) -> Result<(), GatewayError> {
        debug!(internship_id = %internship.id, "appending internship row");
        self.append(
            &self.internships_path,
            &InternshipRow::new(internship, RowOp::Upsert),
        )
    }

    fn save_application(&self, application: &Application) -> Result<(), GatewayError> {
        debug!(application_id = %application.id, "appending application row");
        self.append(&self.applications_path, &ApplicationRow::new(application))
    }

    fn delete_internship(&self, internship: &Internship) -> Result<(), GatewayError> {
        debug!(internship_id = %internship.id, "appending internship tombstone");
        self.append(
            &self.internships_path,
            &InternshipRow::new(internship, RowOp::Delete),
        )
    }
}

fn ensure_header(path: &Path, header: &[&str]) -> Result<(), GatewayError> {
    let empty = match fs::metadata(path) {
        Ok(metadata) => metadata.len() == 0,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => true,
        Err(err) => return Err(err.into()),
    };
    if !empty {
        return Ok(());
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    writer.flush()?;
    Ok(())
}

/// Result of replaying one log file.
struct Replay<R> {
    live: BTreeMap<u64, R>,
    /// Tombstone carrying the highest deleted id.
    last_tombstone: Option<R>,
    /// Highest id seen in any row, deleted or not.
    last_key: u64,
    rows: usize,
}

impl<R: LogRow> Replay<R> {
    /// Rows a compacted log keeps: every live record, plus the last tombstone when it
    /// holds the highest id.
    fn compacted(&self) -> impl Iterator<Item = &R> {
        let highest_live = self.live.keys().next_back().copied();
        let tombstone = self
            .last_tombstone
            .as_ref()
            .filter(move |row| highest_live.map_or(true, |key| row.key() > key));
        self.live.values().chain(tombstone)
    }
}

/// Replay a log with last-write-wins per id.
fn replay<R: LogRow>(path: &Path) -> Result<Replay<R>, GatewayError> {
    let mut reader = csv::ReaderBuilder::new().from_path(path)?;
    let mut replay = Replay {
        live: BTreeMap::new(),
        last_tombstone: None,
        last_key: 0,
        rows: 0,
    };

    for row in reader.deserialize::<R>() {
        let row: R = row?;
        replay.rows += 1;
        replay.last_key = replay.last_key.max(row.key());
        match row.op() {
            RowOp::Upsert => {
                replay.live.insert(row.key(), row);
            }
            RowOp::Delete => {
                replay.live.remove(&row.key());
                let newer = replay
                    .last_tombstone
                    .as_ref()
                    .map_or(true, |tombstone| row.key() >= tombstone.key());
                if newer {
                    replay.last_tombstone = Some(row);
                }
            }
        }
    }

    Ok(replay)
}

fn rewrite<'a, R, I>(path: &Path, header: &[&str], rows: I) -> Result<(), GatewayError>
where
    R: LogRow + 'a,
    I: Iterator<Item = &'a R>,
{
    let tmp_path = path.with_extension("csv.tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(header)?;
        for row in rows {
            writer.serialize(row)?;
        }
        let mut file = writer
            .into_inner()
            .map_err(|err| GatewayError::Io(err.into_error()))?;
        file.flush()?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}
