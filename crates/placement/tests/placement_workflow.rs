//! End-to-end placement scenarios driven through the public service facade.
//!
//! Each scenario checks the slot and acceptance guarantees after every step rather than
//! only at the end, so an intermediate violation cannot hide behind a later correction.

mod common {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use placement::workflows::placement::{
        ApplicationStatus, InMemoryUserDirectory, InternshipDraft, InternshipId, InternshipLevel,
        MemoryPlacementStore, PlacementPolicy, PlacementService, User, UserId,
    };

    pub(super) type Service = PlacementService<MemoryPlacementStore, InMemoryUserDirectory>;

    pub(super) fn on(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).expect("valid date")
    }

    pub(super) fn rep() -> UserId {
        UserId::new("hiring@northwind.example")
    }

    pub(super) fn staff() -> UserId {
        UserId::new("careers01")
    }

    pub(super) fn student(index: usize) -> UserId {
        UserId::new(format!("S{index:03}"))
    }

    pub(super) fn service() -> Service {
        let mut users: InMemoryUserDirectory = [
            User::company_representative(rep().0, "Morgan Chua", "Northwind"),
            User::staff(staff().0, "Career Centre"),
        ]
        .into_iter()
        .collect();
        for index in 0..6 {
            users.insert(User::student(
                student(index).0,
                format!("Student {index}"),
                "Electrical Engineering",
                3,
            ));
        }

        PlacementService::open(
            Arc::new(MemoryPlacementStore::default()),
            Arc::new(users),
            PlacementPolicy::default(),
        )
        .expect("service opens")
    }

    pub(super) fn posting(service: &Service, title: &str, num_slots: u32) -> InternshipId {
        let created = service
            .create_internship(
                &rep(),
                InternshipDraft {
                    title: title.to_string(),
                    description: String::new(),
                    level: InternshipLevel::Intermediate,
                    preferred_major: "any".to_string(),
                    open_date: on(1),
                    close_date: on(30),
                    num_slots,
                },
            )
            .expect("posting created");
        service
            .approve_internship(&staff(), created.id)
            .expect("posting approved");
        created.id
    }

    /// Slot bound, filled-iff-full, and at most one acceptance per student.
    pub(super) fn assert_invariants(service: &Service) {
        for internship in service.internships() {
            let accepted = service
                .applications()
                .into_iter()
                .filter(|application| application.internship_id == internship.id)
                .filter(|application| {
                    application.status == ApplicationStatus::Accepted
                        || (application.status == ApplicationStatus::WithdrawalRequested
                            && application.previous_status == Some(ApplicationStatus::Accepted))
                })
                .count();
            assert!(internship.filled_slots <= internship.num_slots);
            assert_eq!(internship.filled_slots as usize, accepted);
            assert_eq!(
                internship.status == placement::workflows::placement::InternshipStatus::Filled,
                internship.filled_slots == internship.num_slots,
                "posting {} status out of sync with its slots",
                internship.id
            );
        }

        for index in 0..6 {
            let accepted = service
                .student_applications(&student(index))
                .expect("student exists")
                .into_iter()
                .filter(|application| application.status == ApplicationStatus::Accepted)
                .count();
            assert!(accepted <= 1, "student {index} holds {accepted} placements");
        }
    }
}

use common::*;
use placement::workflows::placement::{
    ApplicationStatus, InternshipStatus, PlacementError, ValidationError,
};

#[test]
fn competitive_posting_fills_and_reopens() {
    let service = service();
    let id = posting(&service, "Power Systems Intern", 2);

    let applications: Vec<_> = (0..4)
        .map(|index| {
            let application = service
                .submit_application(&student(index), id, on(3))
                .expect("application accepted");
            service
                .approve_application(&rep(), application.id)
                .expect("offer made");
            application.id
        })
        .collect();
    assert_invariants(&service);

    service
        .accept_application(&student(0), applications[0])
        .expect("first acceptance");
    assert_invariants(&service);
    let outcome = service
        .accept_application(&student(1), applications[1])
        .expect("second acceptance");
    assert_eq!(outcome.internship.status, InternshipStatus::Filled);
    assert_invariants(&service);

    match service.accept_application(&student(2), applications[2]) {
        Err(PlacementError::Validation(ValidationError::NoRemainingSlots { .. })) => {}
        other => panic!("expected full posting, got {other:?}"),
    }
    assert_invariants(&service);

    service
        .request_withdrawal(&student(0), applications[0], Some("family relocation".into()))
        .expect("withdrawal requested");
    assert_invariants(&service);
    assert_eq!(
        service.internship(id).expect("exists").status,
        InternshipStatus::Filled
    );

    service
        .approve_withdrawal(&staff(), applications[0])
        .expect("withdrawal approved");
    assert_invariants(&service);
    assert_eq!(
        service.internship(id).expect("exists").status,
        InternshipStatus::Approved
    );

    service
        .accept_application(&student(2), applications[2])
        .expect("freed slot taken");
    assert_invariants(&service);
}

#[test]
fn acceptance_cascades_across_postings() {
    let service = service();
    let postings = [
        posting(&service, "Controls Intern", 1),
        posting(&service, "Embedded Intern", 1),
        posting(&service, "Test Intern", 1),
    ];

    let mut mine = Vec::new();
    for id in postings {
        let application = service
            .submit_application(&student(4), id, on(5))
            .expect("applied");
        mine.push(application.id);
    }
    let rival = service
        .submit_application(&student(5), postings[1], on(5))
        .expect("rival applied");

    service.approve_application(&rep(), mine[1]).expect("offer");
    service
        .request_withdrawal(&student(4), mine[2], None)
        .expect("withdrawal requested");

    let outcome = service
        .accept_application(&student(4), mine[1])
        .expect("accepted");
    assert_eq!(outcome.withdrawn, vec![mine[0], mine[2]]);
    assert_invariants(&service);

    let statuses: Vec<_> = service
        .student_applications(&student(4))
        .expect("listing")
        .into_iter()
        .map(|application| application.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            ApplicationStatus::Withdrawn,
            ApplicationStatus::Accepted,
            ApplicationStatus::Withdrawn,
        ]
    );
    assert!(service
        .pending_withdrawals(&staff())
        .expect("staff listing")
        .is_empty());

    let rival = service.application(rival.id).expect("exists");
    assert_eq!(rival.status, ApplicationStatus::Pending);
}

#[test]
fn withdrawal_round_trip_is_lossless() {
    let service = service();
    let id = posting(&service, "Grid Analytics Intern", 3);

    let application = service
        .submit_application(&student(0), id, on(2))
        .expect("applied");
    service
        .approve_application(&rep(), application.id)
        .expect("offer");
    service
        .accept_application(&student(0), application.id)
        .expect("accepted");
    let before = service.internship(id).expect("exists");

    service
        .request_withdrawal(&student(0), application.id, Some("exam clash".into()))
        .expect("requested");
    let restored = service
        .reject_withdrawal(&staff(), application.id)
        .expect("rejected");

    assert_eq!(restored.status, ApplicationStatus::Accepted);
    assert_eq!(service.internship(id).expect("exists"), before);
    assert_invariants(&service);
}
