use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{ApplicationId, InternshipDraft, InternshipEdit, InternshipId, UserId};
use super::repository::{PlacementGateway, UserDirectory};
use super::service::{PlacementError, PlacementService};

type SharedService<G, U> = Arc<PlacementService<G, U>>;

/// Router builder exposing every lifecycle operation over JSON.
pub fn placement_router<G, U>(service: SharedService<G, U>) -> Router
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/internships",
            post(create_internship::<G, U>).get(list_internships::<G, U>),
        )
        .route(
            "/api/v1/internships/:internship_id",
            get(get_internship::<G, U>)
                .put(edit_internship::<G, U>)
                .delete(delete_internship::<G, U>),
        )
        .route(
            "/api/v1/internships/:internship_id/approve",
            post(approve_internship::<G, U>),
        )
        .route(
            "/api/v1/internships/:internship_id/reject",
            post(reject_internship::<G, U>),
        )
        .route(
            "/api/v1/internships/:internship_id/resubmit",
            post(resubmit_internship::<G, U>),
        )
        .route(
            "/api/v1/internships/:internship_id/visibility",
            post(toggle_visibility::<G, U>),
        )
        .route(
            "/api/v1/internships/:internship_id/applications",
            get(internship_applications::<G, U>),
        )
        .route(
            "/api/v1/students/:student_id/internships",
            get(visible_internships::<G, U>),
        )
        .route(
            "/api/v1/students/:student_id/applications",
            get(student_applications::<G, U>),
        )
        .route("/api/v1/applications", post(submit_application::<G, U>))
        .route(
            "/api/v1/applications/:application_id",
            get(get_application::<G, U>),
        )
        .route(
            "/api/v1/applications/:application_id/approve",
            post(approve_application::<G, U>),
        )
        .route(
            "/api/v1/applications/:application_id/reject",
            post(reject_application::<G, U>),
        )
        .route(
            "/api/v1/applications/:application_id/accept",
            post(accept_application::<G, U>),
        )
        .route(
            "/api/v1/applications/:application_id/confirm",
            post(confirm_placement::<G, U>),
        )
        .route(
            "/api/v1/applications/:application_id/decline",
            post(reject_placement::<G, U>),
        )
        .route(
            "/api/v1/applications/:application_id/withdrawal",
            post(request_withdrawal::<G, U>),
        )
        .route(
            "/api/v1/applications/:application_id/withdrawal/approve",
            post(approve_withdrawal::<G, U>),
        )
        .route(
            "/api/v1/applications/:application_id/withdrawal/reject",
            post(reject_withdrawal::<G, U>),
        )
        .route("/api/v1/withdrawals", get(pending_withdrawals::<G, U>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct ActorRequest {
    pub actor: UserId,
}

#[derive(Debug, Deserialize)]
pub struct CreateInternshipRequest {
    pub actor: UserId,
    #[serde(flatten)]
    pub draft: InternshipDraft,
}

#[derive(Debug, Deserialize)]
pub struct EditInternshipRequest {
    pub actor: UserId,
    #[serde(flatten)]
    pub edit: InternshipEdit,
}

#[derive(Debug, Deserialize)]
pub struct SubmitApplicationRequest {
    pub actor: UserId,
    pub internship_id: InternshipId,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalRequest {
    pub actor: UserId,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityQuery {
    #[serde(default)]
    pub on: Option<NaiveDate>,
}

/// HTTP status for each error class.
pub fn error_status(error: &PlacementError) -> StatusCode {
    match error {
        PlacementError::NotFound { .. } => StatusCode::NOT_FOUND,
        PlacementError::InvalidTransition { .. } => StatusCode::CONFLICT,
        PlacementError::Unauthorized(_) => StatusCode::FORBIDDEN,
        PlacementError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PlacementError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for PlacementError {
    fn into_response(self) -> Response {
        let status = error_status(&self);
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, PlacementError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn create_internship<G, U>(
    State(service): State<SharedService<G, U>>,
    Json(request): Json<CreateInternshipRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::CREATED,
        service.create_internship(&request.actor, request.draft),
    )
}

pub(crate) async fn list_internships<G, U>(State(service): State<SharedService<G, U>>) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    (StatusCode::OK, Json(service.internships())).into_response()
}

pub(crate) async fn get_internship<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(internship_id): Path<u64>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(StatusCode::OK, service.internship(InternshipId(internship_id)))
}

pub(crate) async fn edit_internship<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(internship_id): Path<u64>,
    Json(request): Json<EditInternshipRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::OK,
        service.edit_internship(&request.actor, InternshipId(internship_id), request.edit),
    )
}

pub(crate) async fn delete_internship<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(internship_id): Path<u64>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    match service.delete_internship(&request.actor, InternshipId(internship_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn approve_internship<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(internship_id): Path<u64>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::OK,
        service.approve_internship(&request.actor, InternshipId(internship_id)),
    )
}

pub(crate) async fn reject_internship<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(internship_id): Path<u64>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::OK,
        service.reject_internship(&request.actor, InternshipId(internship_id)),
    )
}

pub(crate) async fn resubmit_internship<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(internship_id): Path<u64>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::OK,
        service.resubmit_internship(&request.actor, InternshipId(internship_id)),
    )
}

pub(crate) async fn toggle_visibility<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(internship_id): Path<u64>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::OK,
        service.toggle_visibility(&request.actor, InternshipId(internship_id)),
    )
}

pub(crate) async fn internship_applications<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(internship_id): Path<u64>,
    Query(request): Query<ActorRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::OK,
        service.internship_applications(&request.actor, InternshipId(internship_id)),
    )
}

pub(crate) async fn visible_internships<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(student_id): Path<String>,
    Query(query): Query<VisibilityQuery>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    let on = query.on.unwrap_or_else(|| Local::now().date_naive());
    respond(
        StatusCode::OK,
        service.visible_internships(&UserId(student_id), on),
    )
}

pub(crate) async fn student_applications<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(student_id): Path<String>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::OK,
        service.student_applications(&UserId(student_id)),
    )
}

pub(crate) async fn submit_application<G, U>(
    State(service): State<SharedService<G, U>>,
    Json(request): Json<SubmitApplicationRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::CREATED,
        service.submit_application(
            &request.actor,
            request.internship_id,
            Local::now().date_naive(),
        ),
    )
}

pub(crate) async fn get_application<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(application_id): Path<u64>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(StatusCode::OK, service.application(ApplicationId(application_id)))
}

pub(crate) async fn approve_application<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(application_id): Path<u64>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::OK,
        service.approve_application(&request.actor, ApplicationId(application_id)),
    )
}

pub(crate) async fn reject_application<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(application_id): Path<u64>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::OK,
        service.reject_application(&request.actor, ApplicationId(application_id)),
    )
}

pub(crate) async fn accept_application<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(application_id): Path<u64>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::OK,
        service.accept_application(&request.actor, ApplicationId(application_id)),
    )
}

pub(crate) async fn confirm_placement<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(application_id): Path<u64>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::OK,
        service.confirm_placement(&request.actor, ApplicationId(application_id)),
    )
}

pub(crate) async fn reject_placement<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(application_id): Path<u64>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::OK,
        service.reject_placement(&request.actor, ApplicationId(application_id)),
    )
}

pub(crate) async fn request_withdrawal<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(application_id): Path<u64>,
    Json(request): Json<WithdrawalRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::OK,
        service.request_withdrawal(
            &request.actor,
            ApplicationId(application_id),
            request.reason,
        ),
    )
}

pub(crate) async fn approve_withdrawal<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(application_id): Path<u64>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::OK,
        service.approve_withdrawal(&request.actor, ApplicationId(application_id)),
    )
}

pub(crate) async fn reject_withdrawal<G, U>(
    State(service): State<SharedService<G, U>>,
    Path(application_id): Path<u64>,
    Json(request): Json<ActorRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(
        StatusCode::OK,
        service.reject_withdrawal(&request.actor, ApplicationId(application_id)),
    )
}

pub(crate) async fn pending_withdrawals<G, U>(
    State(service): State<SharedService<G, U>>,
    Query(request): Query<ActorRequest>,
) -> Response
where
    G: PlacementGateway + 'static,
    U: UserDirectory + 'static,
{
    respond(StatusCode::OK, service.pending_withdrawals(&request.actor))
}
