use super::common::*;
use crate::workflows::placement::domain::{InternshipId, UserRole};
use crate::workflows::placement::repository::{GatewayError, PlacementGateway, UserDirectory};
use crate::workflows::placement::store::{read_user_directory, MemoryPlacementStore};

const USERS: &str = "\
id,name,role,major,yearOfStudy,companyName
U2310001A, Sam Lee ,student,Computer Science,3,
rep@acme.example,Avery Tan,company,,,Acme Robotics
staff01,Career Office,Staff,,,
";

#[test]
fn user_export_is_parsed_by_role() {
    let directory = read_user_directory(USERS.as_bytes()).expect("valid export");
    assert_eq!(directory.len(), 3);

    let student = directory.find_by_id(&senior()).expect("student present");
    assert_eq!(student.name, "Sam Lee");
    assert_eq!(
        student.role,
        UserRole::Student {
            major: "Computer Science".to_string(),
            year_of_study: 3,
        }
    );

    let representative = directory.find_by_id(&rep()).expect("rep present");
    assert_eq!(
        representative.role,
        UserRole::CompanyRepresentative {
            company_name: "Acme Robotics".to_string(),
        }
    );
    assert_eq!(
        directory.find_by_id(&staff()).map(|user| user.role),
        Some(UserRole::Staff)
    );
}

#[test]
fn students_without_a_year_are_rejected() {
    let export = "id,name,role,major,yearOfStudy,companyName\nU1,Ash,student,Biology,,\n";
    match read_user_directory(export.as_bytes()) {
        Err(GatewayError::Corrupt(message)) => assert!(message.contains("yearOfStudy")),
        other => panic!("expected corrupt export, got {other:?}"),
    }
}

#[test]
fn unknown_roles_are_rejected() {
    let export = "id,name,role,major,yearOfStudy,companyName\nX1,Pat,alumni,,,\n";
    assert!(matches!(
        read_user_directory(export.as_bytes()),
        Err(GatewayError::Corrupt(_))
    ));
}

#[test]
fn memory_store_tracks_saves_and_deletes() {
    let (service, store) = build_service_with(MemoryPlacementStore::default());
    assert!(store.load().expect("empty load").internships.is_empty());

    let id = approved_internship(&service, &rep(), "Platform Intern", 1);
    assert_eq!(id, InternshipId(1));
    assert_eq!(store.writes(), 2);
    assert!(store.stored_internship(id).expect("stored").is_visible());

    let pending = service
        .create_internship(&rep(), draft("Data Intern"))
        .expect("created");
    service
        .delete_internship(&rep(), pending.id)
        .expect("deleted");
    assert!(store.stored_internship(pending.id).is_none());
    assert_eq!(store.load().expect("load").internships.len(), 1);
}
