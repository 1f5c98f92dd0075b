use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    ApplicationId, ApplicationStatus, ApplicationStatusView, CandidateId, CandidateProfile,
    DecisionDomain, EducationLevel, LetterGrade, OfferTarget, Opening,
};
use super::repository::{
    ApplicationRepository, BookmarkRepository, CatalogRepository, NotificationPublisher,
    RepositoryError,
};
use super::resolver::{ResolutionError, ResolverError};
use super::service::{ApplicationOutcome, PlacementService, PlacementServiceError};

type SharedService<R, C, B, N> = Arc<PlacementService<R, C, B, N>>;

/// Profile body; the candidate id comes from the path.
#[derive(Debug, Deserialize)]
pub(crate) struct ProfilePayload {
    #[serde(default)]
    pub(crate) gpa: Option<f32>,
    #[serde(default)]
    pub(crate) experience_years: u32,
    #[serde(default)]
    pub(crate) skills: BTreeSet<String>,
    #[serde(default)]
    pub(crate) education_level: Option<EducationLevel>,
    #[serde(default)]
    pub(crate) subject_grades: BTreeMap<String, LetterGrade>,
    #[serde(default)]
    pub(crate) field_of_study: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidateTargetRequest {
    pub(crate) candidate_id: String,
    pub(crate) target: OfferTarget,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusRequest {
    pub(crate) status: ApplicationStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    pub(crate) domain: DecisionDomain,
    pub(crate) application_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidateRef {
    pub(crate) candidate_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BookmarkRequest {
    pub(crate) company_id: String,
    pub(crate) job_id: String,
}

/// Router builder exposing matching, intake, and offer-resolution endpoints.
pub fn placement_router<R, C, B, N>(service: SharedService<R, C, B, N>) -> Router
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/openings",
            get(list_openings_handler::<R, C, B, N>).post(publish_opening_handler::<R, C, B, N>),
        )
        .route("/api/v1/match", post(preview_handler::<R, C, B, N>))
        .route("/api/v1/applications", post(apply_handler::<R, C, B, N>))
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler::<R, C, B, N>).delete(withdraw_handler::<R, C, B, N>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            post(status_handler::<R, C, B, N>),
        )
        .route(
            "/api/v1/applications/:application_id/decline",
            post(decline_handler::<R, C, B, N>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/profile",
            put(profile_handler::<R, C, B, N>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/applications",
            get(candidate_applications_handler::<R, C, B, N>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/decisions",
            get(prompts_handler::<R, C, B, N>).post(select_handler::<R, C, B, N>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/bookmarks",
            get(list_bookmarks_handler::<R, C, B, N>).post(add_bookmark_handler::<R, C, B, N>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/bookmarks/:company_id/:job_id",
            delete(remove_bookmark_handler::<R, C, B, N>),
        )
        .with_state(service)
}

fn error_payload(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

pub(crate) fn error_response(error: PlacementServiceError) -> Response {
    let status = match &error {
        PlacementServiceError::Validation(_) | PlacementServiceError::NotBookmarkable(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PlacementServiceError::ProfileNotFound(_)
        | PlacementServiceError::OpeningNotFound(_)
        | PlacementServiceError::ApplicationNotFound(_)
        | PlacementServiceError::Repository(RepositoryError::NotFound)
        | PlacementServiceError::Resolver(ResolverError::NotFound(_))
        | PlacementServiceError::Resolver(ResolverError::Repository(RepositoryError::NotFound)) => {
            StatusCode::NOT_FOUND
        }
        PlacementServiceError::DuplicateApplication(_)
        | PlacementServiceError::PendingLimit { .. }
        | PlacementServiceError::InvalidTransition { .. }
        | PlacementServiceError::Repository(RepositoryError::Conflict)
        | PlacementServiceError::Resolver(ResolverError::Plan(
            ResolutionError::NotInGroup(_)
            | ResolutionError::NotOffered { .. }
            | ResolutionError::AlreadyDecided(_),
        )) => StatusCode::CONFLICT,
        PlacementServiceError::Forbidden(_)
        | PlacementServiceError::Resolver(ResolverError::Plan(ResolutionError::WrongCandidate(
            _,
        ))) => StatusCode::FORBIDDEN,
        PlacementServiceError::Resolver(ResolverError::PartialCascade(report)) => {
            let payload = json!({
                "error": error.to_string(),
                "report": report,
            });
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response();
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_payload(status, error.to_string())
}

fn views(applications: &[super::domain::Application]) -> Vec<ApplicationStatusView> {
    applications
        .iter()
        .map(super::domain::Application::status_view)
        .collect()
}

pub(crate) async fn profile_handler<R, C, B, N>(
    State(service): State<SharedService<R, C, B, N>>,
    Path(candidate_id): Path<String>,
    Json(payload): Json<ProfilePayload>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let profile = CandidateProfile {
        candidate_id: CandidateId(candidate_id),
        gpa: payload.gpa,
        experience_years: payload.experience_years,
        skills: payload.skills,
        education_level: payload.education_level,
        subject_grades: payload.subject_grades,
        field_of_study: payload.field_of_study,
    };
    match service.save_profile(profile) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn publish_opening_handler<R, C, B, N>(
    State(service): State<SharedService<R, C, B, N>>,
    Json(opening): Json<Opening>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.publish_opening(opening) {
        Ok(opening) => (StatusCode::CREATED, Json(opening)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_openings_handler<R, C, B, N>(
    State(service): State<SharedService<R, C, B, N>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.openings() {
        Ok(openings) => (StatusCode::OK, Json(openings)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn preview_handler<R, C, B, N>(
    State(service): State<SharedService<R, C, B, N>>,
    Json(request): Json<CandidateTargetRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let candidate_id = CandidateId(request.candidate_id);
    match service.preview(&candidate_id, &request.target) {
        Ok(preview) => (StatusCode::OK, Json(preview)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn apply_handler<R, C, B, N>(
    State(service): State<SharedService<R, C, B, N>>,
    Json(request): Json<CandidateTargetRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let candidate_id = CandidateId(request.candidate_id);
    match service.apply(&candidate_id, &request.target) {
        Ok(ApplicationOutcome::Submitted(application)) => {
            (StatusCode::CREATED, Json(application.status_view())).into_response()
        }
        Ok(ApplicationOutcome::Ineligible(report)) => {
            let payload = json!({
                "eligible": false,
                "reasons": report.reasons(),
                "failures": report.failures,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn application_handler<R, C, B, N>(
    State(service): State<SharedService<R, C, B, N>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.application(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, Json(application.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn withdraw_handler<R, C, B, N>(
    State(service): State<SharedService<R, C, B, N>>,
    Path(application_id): Path<String>,
    Query(candidate): Query<CandidateRef>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let candidate_id = CandidateId(candidate.candidate_id);
    match service.withdraw(&candidate_id, &ApplicationId(application_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, C, B, N>(
    State(service): State<SharedService<R, C, B, N>>,
    Path(application_id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.update_status(&ApplicationId(application_id), request.status) {
        Ok(change) => {
            let payload = json!({
                "application": change.application.status_view(),
                "prompt": change.prompt,
                "notification": change.notification,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn decline_handler<R, C, B, N>(
    State(service): State<SharedService<R, C, B, N>>,
    Path(application_id): Path<String>,
    Json(candidate): Json<CandidateRef>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let candidate_id = CandidateId(candidate.candidate_id);
    match service.decline_offer(&candidate_id, &ApplicationId(application_id)) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn candidate_applications_handler<R, C, B, N>(
    State(service): State<SharedService<R, C, B, N>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.applications_for(&CandidateId(candidate_id)) {
        Ok(applications) => (StatusCode::OK, Json(views(&applications))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn prompts_handler<R, C, B, N>(
    State(service): State<SharedService<R, C, B, N>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let candidate_id = CandidateId(candidate_id);
    let course = service.prompt(&candidate_id, DecisionDomain::CourseAdmission);
    let job = service.prompt(&candidate_id, DecisionDomain::JobOffer);
    match (course, job) {
        (Ok(course), Ok(job)) => {
            let payload = json!({
                "course_admission": course,
                "job_offer": job,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        (Err(error), _) | (_, Err(error)) => error_response(error),
    }
}

pub(crate) async fn select_handler<R, C, B, N>(
    State(service): State<SharedService<R, C, B, N>>,
    Path(candidate_id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let candidate_id = CandidateId(candidate_id);
    let application_id = ApplicationId(request.application_id);
    match service.select_offer(&candidate_id, request.domain, &application_id) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_bookmarks_handler<R, C, B, N>(
    State(service): State<SharedService<R, C, B, N>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.bookmarks(&CandidateId(candidate_id)) {
        Ok(bookmarks) => (StatusCode::OK, Json(bookmarks)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn add_bookmark_handler<R, C, B, N>(
    State(service): State<SharedService<R, C, B, N>>,
    Path(candidate_id): Path<String>,
    Json(request): Json<BookmarkRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let target = OfferTarget::job(request.company_id, request.job_id);
    match service.bookmark(&CandidateId(candidate_id), &target) {
        Ok(bookmark) => (StatusCode::CREATED, Json(bookmark)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remove_bookmark_handler<R, C, B, N>(
    State(service): State<SharedService<R, C, B, N>>,
    Path((candidate_id, company_id, job_id)): Path<(String, String, String)>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CatalogRepository + 'static,
    B: BookmarkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.remove_bookmark(&CandidateId(candidate_id), &company_id, &job_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}
