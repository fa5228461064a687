// src/services/review.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    config::{UNKNOWN_CASE_TITLE, UNKNOWN_PLAYER_NAME, UNKNOWN_PLAYER_NUMBER},
    error::AppError,
    models::{
        case::Case,
        player::Player,
        submission::{Answer, AnswerCheck, Submission, SubmissionStatus, SubmissionWithDetails},
    },
    services::cases,
    store::{Review, Store, already_reviewed, submission_not_found},
};

/// Clamps an admin-entered score into `[0, max_score]`.
pub fn clamp_score(requested: i64, max_score: i32) -> i32 {
    requested.clamp(0, i64::from(max_score.max(0))) as i32
}

/// Per-slot comparison of a submission's answers against the case's keys.
/// Slots without a matching question are reported as incorrect.
pub fn answer_checks(submission: &Submission, case: Option<&Case>) -> Vec<AnswerCheck> {
    submission
        .answers
        .iter()
        .enumerate()
        .map(|(idx, answer)| match case.and_then(|c| c.questions.get(idx)) {
            Some(question) => question.check(answer),
            None if *answer == Answer::Unanswered => AnswerCheck::Unanswered,
            None => AnswerCheck::Incorrect,
        })
        .collect()
}

pub async fn list_pending(store: &dyn Store) -> Result<Vec<SubmissionWithDetails>, AppError> {
    list_by_status(store, Some(SubmissionStatus::Pending)).await
}

pub async fn list_all(store: &dyn Store) -> Result<Vec<SubmissionWithDetails>, AppError> {
    list_by_status(store, None).await
}

/// Lists submissions newest first, joined with player and case display data.
/// Missing or unreadable player/case records degrade to placeholders.
pub async fn list_by_status(
    store: &dyn Store,
    status: Option<SubmissionStatus>,
) -> Result<Vec<SubmissionWithDetails>, AppError> {
    let submissions = store.list_submissions(status).await?;

    let mut players: HashMap<Uuid, Option<Player>> = HashMap::new();
    let mut cases: HashMap<Uuid, Option<Case>> = HashMap::new();
    let mut details = Vec::with_capacity(submissions.len());

    for submission in submissions {
        if !players.contains_key(&submission.player_id) {
            let player = lookup_player(store, submission.player_id).await;
            players.insert(submission.player_id, player);
        }
        if !cases.contains_key(&submission.case_id) {
            let case = lookup_case(store, submission.case_id).await;
            cases.insert(submission.case_id, case);
        }

        let player = players.get(&submission.player_id).and_then(Option::as_ref);
        let case = cases.get(&submission.case_id).and_then(Option::as_ref);
        details.push(with_details(submission, player, case));
    }

    Ok(details)
}

/// One submission with the same joined view as the listings.
pub async fn get_submission(
    store: &dyn Store,
    id: Uuid,
) -> Result<SubmissionWithDetails, AppError> {
    let submission = store
        .get_submission(id)
        .await?
        .ok_or_else(submission_not_found)?;

    let player = lookup_player(store, submission.player_id).await;
    let case = lookup_case(store, submission.case_id).await;
    Ok(with_details(submission, player.as_ref(), case.as_ref()))
}

/// Approves a pending submission.
///
/// The requested score is clamped to the case's range, then the status change
/// and the player credit are written as one transaction by the store.
pub async fn approve(
    store: &dyn Store,
    submission_id: Uuid,
    reviewer_id: Uuid,
    requested_score: i64,
    now: DateTime<Utc>,
) -> Result<Submission, AppError> {
    let submission = store
        .get_submission(submission_id)
        .await?
        .ok_or_else(submission_not_found)?;
    if !submission.is_pending() {
        return Err(already_reviewed(submission.status));
    }

    let case = cases::get_case(store, submission.case_id).await?;
    let score = clamp_score(requested_score, case.max_score);

    let approved = store
        .approve_submission(
            submission_id,
            score,
            Review {
                reviewer_id,
                reviewed_at: now,
            },
        )
        .await?;

    tracing::info!(
        submission_id = %submission_id,
        reviewer_id = %reviewer_id,
        requested_score,
        score,
        "Submission approved"
    );
    Ok(approved)
}

/// Rejects a pending submission. The player's total is left untouched.
pub async fn reject(
    store: &dyn Store,
    submission_id: Uuid,
    reviewer_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Submission, AppError> {
    let rejected = store
        .reject_submission(
            submission_id,
            Review {
                reviewer_id,
                reviewed_at: now,
            },
        )
        .await?;

    tracing::info!(submission_id = %submission_id, reviewer_id = %reviewer_id, "Submission rejected");
    Ok(rejected)
}

async fn lookup_player(store: &dyn Store, id: Uuid) -> Option<Player> {
    match store.get_player(id).await {
        Ok(player) => player,
        Err(e) => {
            tracing::warn!(player_id = %id, "Player lookup failed, showing placeholder: {}", e);
            None
        }
    }
}

async fn lookup_case(store: &dyn Store, id: Uuid) -> Option<Case> {
    match store.get_case(id).await {
        Ok(case) => case,
        Err(e) => {
            tracing::warn!(case_id = %id, "Case lookup failed, showing placeholder: {}", e);
            None
        }
    }
}

fn with_details(
    submission: Submission,
    player: Option<&Player>,
    case: Option<&Case>,
) -> SubmissionWithDetails {
    let checks = answer_checks(&submission, case);
    SubmissionWithDetails {
        player_name: player.map_or_else(|| UNKNOWN_PLAYER_NAME.to_string(), |p| p.name.clone()),
        player_number: player
            .map_or_else(|| UNKNOWN_PLAYER_NUMBER.to_string(), |p| p.number.clone()),
        case_title: case.map_or_else(|| UNKNOWN_CASE_TITLE.to_string(), |c| c.title.clone()),
        case_questions: case.map(|c| c.questions.0.clone()).unwrap_or_default(),
        max_score: case.map_or(0, |c| c.max_score),
        checks,
        submission,
    }
}
