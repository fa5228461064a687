// src/handlers/cases.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::submission::SubmitAnswersRequest,
    services,
    store::Store,
    utils::jwt::Claims,
};

/// Lists every case with its lock state and the player's progress on it.
pub async fn list_cases(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let board =
        services::cases::case_board(store.as_ref(), claims.subject_id()?, Utc::now()).await?;
    Ok(Json(board))
}

/// Opens a case for answering.
/// 409 if already attempted, 403 while still locked.
pub async fn open_case(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(case_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let case =
        services::submission::open_case(store.as_ref(), claims.subject_id()?, case_id, Utc::now())
            .await?;
    Ok(Json(case))
}

/// Reports whether the player has already submitted this case.
pub async fn attempt_status(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(case_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let submitted =
        services::submission::has_submitted(store.as_ref(), claims.subject_id()?, case_id).await?;
    Ok(Json(serde_json::json!({ "submitted": submitted })))
}

/// Submits the player's answers for review.
pub async fn submit_case(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(case_id): Path<Uuid>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    let submission = services::submission::submit(
        store.as_ref(),
        claims.subject_id()?,
        case_id,
        payload.answers,
        Utc::now(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": submission.id,
            "status": submission.status,
            "message": "Your answers have been submitted for review!"
        })),
    ))
}
