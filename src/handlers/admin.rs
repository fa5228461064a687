// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    models::{
        admin::AdminLoginRequest,
        case::CreateCaseRequest,
        submission::{ApproveRequest, SubmissionListParams, SubmissionStatus},
    },
    services,
    store::Store,
    utils::jwt::Claims,
};

/// Authenticates an admin account and returns a session token.
pub async fn login(
    State(store): State<Arc<dyn Store>>,
    State(config): State<Config>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = services::auth::admin_login(store.as_ref(), &config, payload).await?;
    Ok(Json(session))
}

/// Lists submissions with player and case details.
/// Admin only. Defaults to pending; `?status=all` lists everything.
pub async fn list_submissions(
    State(store): State<Arc<dyn Store>>,
    Query(params): Query<SubmissionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let status = match params.status.as_deref() {
        None => Some(SubmissionStatus::Pending),
        Some(raw) => SubmissionStatus::parse_filter(raw).map_err(AppError::BadRequest)?,
    };

    let submissions = services::review::list_by_status(store.as_ref(), status).await?;
    Ok(Json(submissions))
}

/// Retrieves one submission with player and case details.
/// Admin only.
pub async fn get_submission(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let submission = services::review::get_submission(store.as_ref(), id).await?;
    Ok(Json(submission))
}

/// Approves a pending submission and credits the player.
/// Admin only. The score is clamped to the case's maximum.
pub async fn approve_submission(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApproveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let submission = services::review::approve(
        store.as_ref(),
        id,
        claims.subject_id()?,
        payload.score,
        Utc::now(),
    )
    .await?;

    Ok(Json(submission))
}

/// Rejects a pending submission. The player's score is unchanged.
/// Admin only.
pub async fn reject_submission(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let submission =
        services::review::reject(store.as_ref(), id, claims.subject_id()?, Utc::now()).await?;
    Ok(Json(submission))
}

/// Creates a new case.
/// Admin only.
pub async fn create_case(
    State(store): State<Arc<dyn Store>>,
    Json(payload): Json<CreateCaseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let case = services::cases::create_case(store.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(case)))
}
