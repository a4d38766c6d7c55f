use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Method, Request, StatusCode};
use axum::Json;
use chrono::{Days, Local};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::placement::domain::InternshipId;
use crate::workflows::placement::router::{self, placement_router, ActorRequest};
use crate::workflows::placement::store::MemoryPlacementStore;
use crate::workflows::placement::repository::InMemoryUserDirectory;

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn draft_body(actor: &str, title: &str) -> Value {
    json!({
        "actor": actor,
        "title": title,
        "description": "Build internal tooling",
        "level": "Basic",
        "preferred_major": "Computer Science",
        "open_date": "2025-03-01",
        "close_date": "2025-04-30",
        "num_slots": 1
    })
}

/// Approved posting whose application window surrounds the server's current date.
fn currently_open_internship(service: &MemoryService, title: &str) -> InternshipId {
    let today = Local::now().date_naive();
    let mut draft = draft(title);
    draft.num_slots = 1;
    draft.open_date = today.checked_sub_days(Days::new(7)).expect("open date");
    draft.close_date = today.checked_add_days(Days::new(30)).expect("close date");
    let created = service
        .create_internship(&rep(), draft)
        .expect("internship created");
    service
        .approve_internship(&staff(), created.id)
        .expect("internship approved");
    created.id
}

#[tokio::test]
async fn create_route_returns_created_posting() {
    let (service, _) = build_service();
    let app = placement_router(Arc::new(service));

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/internships",
            draft_body(rep().as_str(), "Platform Intern"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "Pending");
    assert_eq!(body["company_name"], "Acme Robotics");
    assert_eq!(body["visible"], false);
}

#[tokio::test]
async fn create_route_maps_validation_failures() {
    let (service, _) = build_service();
    let app = placement_router(Arc::new(service));

    let mut body = draft_body(rep().as_str(), "Platform Intern");
    body["num_slots"] = json!(42);
    let response = app
        .oneshot(json_request(Method::POST, "/api/v1/internships", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("between 1 and 10"));
}

#[tokio::test]
async fn placement_lifecycle_over_http() {
    let (service, _) = build_service();
    let service = Arc::new(service);
    let id = currently_open_internship(&service, "Platform Intern");
    let app = placement_router(service.clone());

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/applications",
            json!({
                "actor": senior().as_str(),
                "internship_id": id.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let application_id = read_json_body(response).await["id"].as_u64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/applications/{application_id}/approve"),
            json!({ "actor": rep().as_str() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/applications/{application_id}/accept"),
            json!({ "actor": senior().as_str() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = read_json_body(response).await;
    assert_eq!(outcome["accepted"]["status"], "Accepted");
    assert_eq!(outcome["internship"]["status"], "Filled");

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/applications/{application_id}/accept"),
            json!({ "actor": senior().as_str() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(
            Request::get(format!("/api/v1/withdrawals?actor={}", rep()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn submission_route_uses_the_server_date() {
    let (service, _) = build_service();
    let service = Arc::new(service);
    let closed = approved_internship(&service, &rep(), "Platform Intern", 1);
    let app = placement_router(service.clone());

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/applications",
            json!({
                "actor": senior().as_str(),
                "internship_id": closed.0,
                "applied_on": "2025-03-10"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("applications are open 2025-03-01 to 2025-04-30"));
    assert!(service
        .internship_applications(&rep(), closed)
        .expect("owner listing")
        .is_empty());
}

#[tokio::test]
async fn unknown_records_map_to_not_found() {
    let (service, _) = build_service();
    let app = placement_router(Arc::new(service));

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/v1/internships/41")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/applications/9/withdrawal/approve",
            json!({ "actor": staff().as_str() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_route_returns_no_content() {
    let (service, _) = build_service();
    let service = Arc::new(service);
    let created = service
        .create_internship(&rep(), draft("Platform Intern"))
        .expect("created");
    let app = placement_router(service.clone());

    let response = app
        .oneshot(json_request(
            Method::DELETE,
            &format!("/api/v1/internships/{}", created.id),
            json!({ "actor": rep().as_str() }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(service.internships().is_empty());
}

#[tokio::test]
async fn student_listing_filters_by_date() {
    let (service, _) = build_service();
    let service = Arc::new(service);
    approved_internship(&service, &rep(), "Platform Intern", 1);
    let app = placement_router(service);

    let response = app
        .clone()
        .oneshot(
            Request::get(format!(
                "/api/v1/students/{}/internships?on=2025-03-10",
                senior()
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = read_json_body(response).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let response = app
        .oneshot(
            Request::get(format!(
                "/api/v1/students/{}/internships?on=2025-06-01",
                senior()
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    let listed = read_json_body(response).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn handler_surfaces_persistence_failures() {
    let (seed, seed_store) = build_service();
    let id = approved_internship(&seed, &rep(), "Platform Intern", 1);
    let snapshot = crate::workflows::placement::repository::PlacementGateway::load(
        seed_store.as_ref(),
    )
    .expect("memory load");
    let service = Arc::new(
        crate::workflows::placement::service::PlacementService::open(
            Arc::new(ReadOnlyStore { snapshot }),
            Arc::new(directory()),
            Default::default(),
        )
        .expect("load succeeds"),
    );

    let response = router::toggle_visibility::<ReadOnlyStore, InMemoryUserDirectory>(
        State(service),
        Path(id.0),
        Json(ActorRequest { actor: rep() }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn approve_handler_requires_staff() {
    let (service, _) = build_service();
    let service: Arc<MemoryService> = Arc::new(service);
    let created = service
        .create_internship(&rep(), draft("Platform Intern"))
        .expect("created");

    let response = router::approve_internship::<MemoryPlacementStore, InMemoryUserDirectory>(
        State(service),
        Path(created.id.0),
        Json(ActorRequest { actor: rep() }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
