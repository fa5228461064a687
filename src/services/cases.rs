// src/services/cases.rs

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::case::{Case, CaseSummary, CreateCaseRequest},
    store::Store,
    utils::time_gate,
};

/// Fetches one case or fails with `NotFound`.
pub async fn get_case(store: &dyn Store, id: Uuid) -> Result<Case, AppError> {
    store
        .get_case(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Case not found".to_string()))
}

/// All cases, earliest unlock first.
pub async fn list_cases(store: &dyn Store) -> Result<Vec<Case>, AppError> {
    store.list_cases().await
}

/// The player's view of every case: gate state plus attempt/completion flags.
pub async fn case_board(
    store: &dyn Store,
    player_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<CaseSummary>, AppError> {
    let player = store
        .get_player(player_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;

    let cases = store.list_cases().await?;
    let mut board = Vec::with_capacity(cases.len());

    for case in cases {
        let gate = time_gate::evaluate(case.unlock_time, now);
        let attempted = store.find_submission(player.id, case.id).await?.is_some();

        board.push(CaseSummary {
            id: case.id,
            question_count: case.question_count(),
            unlocked: gate.is_unlocked(),
            time_until_unlock: gate.label().to_string(),
            attempted,
            completed: player.has_completed(case.id),
            title: case.title,
            brief: case.brief,
            unlock_time: case.unlock_time,
            max_score: case.max_score,
        });
    }

    Ok(board)
}

/// Validates and stores a new case.
pub async fn create_case(store: &dyn Store, req: CreateCaseRequest) -> Result<Case, AppError> {
    req.validate()?;

    let new_case = req.into_new_case()?;
    if new_case.title.is_empty() {
        return Err(AppError::BadRequest("Title cannot be blank".to_string()));
    }

    let case = store.create_case(new_case).await?;
    if i64::from(case.max_score) != case.points_total() {
        tracing::warn!(
            case_id = %case.id,
            max_score = case.max_score,
            points_total = case.points_total(),
            "Case max score differs from the sum of question points"
        );
    }
    tracing::info!(case_id = %case.id, title = %case.title, "Case created");
    Ok(case)
}
