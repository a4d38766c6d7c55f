use crate::infra::{open_csv_service, parse_date};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use placement::config::AppConfig;
use placement::error::AppError;
use placement::workflows::placement::{
    ApplicationSummary, CsvPlacementStore, InMemoryUserDirectory, InternshipDraft,
    InternshipLevel, InternshipSummary, MemoryPlacementStore, PlacementError, PlacementPolicy,
    PlacementService, User, UserId,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Date the scripted applications are submitted on (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ReportArgs {
    /// Override the directory holding the CSV logs
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Override the path of the users.csv export
    #[arg(long)]
    pub(crate) users_file: Option<PathBuf>,
    /// Only list postings and applications visible to this student
    #[arg(long)]
    pub(crate) student: Option<String>,
    /// Date used for student visibility (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) on: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CompactArgs {
    /// Override the directory holding the CSV logs
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
}

type DemoService = PlacementService<MemoryPlacementStore, InMemoryUserDirectory>;

fn demo_users() -> InMemoryUserDirectory {
    [
        User::company_representative("hr@lumen.example", "Dana Koh", "Lumen Analytics"),
        User::company_representative("talent@orbit.example", "Eli Wong", "Orbit Labs"),
        User::staff("career-office", "Career Office"),
        User::student("U2210001A", "Priya Nair", "Computer Science", 3),
        User::student("U2210002B", "Marcus Goh", "Computer Science", 4),
        User::student("U2410003C", "Hana Sato", "Computer Science", 1),
    ]
    .into_iter()
    .collect()
}

fn demo_draft(
    title: &str,
    level: InternshipLevel,
    today: NaiveDate,
    num_slots: u32,
) -> InternshipDraft {
    InternshipDraft {
        title: title.to_string(),
        description: format!("{title} for the summer cohort"),
        level,
        preferred_major: "Computer Science".to_string(),
        open_date: today - Duration::days(7),
        close_date: today + Duration::days(30),
        num_slots,
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let service: DemoService = PlacementService::open(
        Arc::new(MemoryPlacementStore::default()),
        Arc::new(demo_users()),
        PlacementPolicy::default(),
    )?;

    let lumen = UserId::new("hr@lumen.example");
    let orbit = UserId::new("talent@orbit.example");
    let staff = UserId::new("career-office");
    let priya = UserId::new("U2210001A");
    let marcus = UserId::new("U2210002B");
    let hana = UserId::new("U2410003C");

    println!("Internship placement demo ({today})");

    let contested = service.create_internship(
        &lumen,
        demo_draft("Data Platform Intern", InternshipLevel::Intermediate, today, 1),
    )?;
    let backup = service.create_internship(
        &orbit,
        demo_draft("Frontend Intern", InternshipLevel::Basic, today, 2),
    )?;
    service.approve_internship(&staff, contested.id)?;
    service.approve_internship(&staff, backup.id)?;
    println!("\nPostings after review");
    print_internships(&service.internships());

    println!("\nEligibility");
    for student in [&priya, &hana] {
        let visible = service.visible_internships(student, today)?;
        let titles: Vec<_> = visible.iter().map(|internship| internship.title.as_str()).collect();
        println!("- {student} sees {}", titles.join(", "));
    }
    report_refusal(
        "Hana applies to the intermediate posting",
        service.submit_application(&hana, contested.id, today),
    );

    let priya_main = service.submit_application(&priya, contested.id, today)?;
    let priya_backup = service.submit_application(&priya, backup.id, today)?;
    let marcus_main = service.submit_application(&marcus, contested.id, today)?;
    service.approve_application(&lumen, priya_main.id)?;
    service.approve_application(&lumen, marcus_main.id)?;
    service.approve_application(&orbit, priya_backup.id)?;

    println!("\nPriya accepts the Lumen offer");
    let outcome = service.accept_application(&priya, priya_main.id)?;
    println!(
        "- {} is now {} ({} of {} slots filled)",
        outcome.internship.title,
        outcome.internship.status_label,
        outcome.internship.filled_slots,
        outcome.internship.num_slots
    );
    for withdrawn in &outcome.withdrawn {
        println!("- application {withdrawn} withdrawn automatically");
    }
    report_refusal(
        "Marcus accepts the same posting",
        service.accept_application(&marcus, marcus_main.id),
    );

    println!("\nPriya asks to withdraw; staff approve");
    service.request_withdrawal(&priya, priya_main.id, Some("relocating overseas".to_string()))?;
    print_applications(&service.pending_withdrawals(&staff)?);
    service.approve_withdrawal(&staff, priya_main.id)?;
    let outcome = service.accept_application(&marcus, marcus_main.id)?;
    println!(
        "- Marcus takes the freed slot: {} is {}",
        outcome.internship.title, outcome.internship.status_label
    );

    println!("\nFinal state");
    print_internships(&service.internships());
    print_applications(&service.applications());
    Ok(())
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }
    if let Some(users_file) = args.users_file {
        config.storage.users_file = users_file;
    }

    let service = open_csv_service(&config)?;
    match args.student {
        Some(student) => {
            let student = UserId::new(student);
            let on = args.on.unwrap_or_else(|| Local::now().date_naive());
            println!("Postings open to {student} on {on}");
            print_internships(&service.visible_internships(&student, on)?);
            println!("\nApplications by {student}");
            print_applications(&service.student_applications(&student)?);
        }
        None => {
            println!("Postings");
            print_internships(&service.internships());
            println!("\nApplications");
            print_applications(&service.applications());
        }
    }
    Ok(())
}

pub(crate) fn run_compact(args: CompactArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }

    let store = CsvPlacementStore::open(&config.storage.data_dir)?;
    let report = store.compact()?;
    println!(
        "internships.csv: {} -> {} rows",
        report.internship_rows_before, report.internship_rows_after
    );
    println!(
        "applications.csv: {} -> {} rows",
        report.application_rows_before, report.application_rows_after
    );
    Ok(())
}

fn report_refusal<T>(label: &str, result: Result<T, PlacementError>) {
    match result {
        Ok(_) => println!("- {label}: allowed"),
        Err(err) => println!("- {label}: refused ({err})"),
    }
}

fn print_internships(internships: &[InternshipSummary]) {
    if internships.is_empty() {
        println!("  (none)");
        return;
    }
    for internship in internships {
        println!(
            "  #{:<3} {:<24} {:<16} {:<12} {:<9} {}/{} slots{}",
            internship.id.0,
            internship.title,
            internship.company_name,
            internship.level_label,
            internship.status_label,
            internship.filled_slots,
            internship.num_slots,
            if internship.visible { "" } else { " (hidden)" }
        );
    }
}

fn print_applications(applications: &[ApplicationSummary]) {
    if applications.is_empty() {
        println!("  (none)");
        return;
    }
    for application in applications {
        let title = application.internship_title.as_deref().unwrap_or("unknown posting");
        print!(
            "  #{:<3} {:<10} -> {:<24} {}",
            application.id.0,
            application.student_id.as_str(),
            title,
            application.status_label
        );
        match &application.withdrawal_reason {
            Some(reason) => println!(" ({reason})"),
            None => println!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_runs_to_completion() {
        let args = DemoArgs {
            today: NaiveDate::from_ymd_opt(2025, 3, 10),
        };
        run_demo(args).expect("demo completes");
    }
}
