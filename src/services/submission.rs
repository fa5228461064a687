// src/services/submission.rs

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        case::{Case, PublicCase},
        submission::{Answer, Submission},
    },
    services::cases,
    store::{Store, duplicate_submission},
    utils::time_gate::{self, Gate},
};

/// Whether the player already has a submission (of any status) for the case.
pub async fn has_submitted(
    store: &dyn Store,
    player_id: Uuid,
    case_id: Uuid,
) -> Result<bool, AppError> {
    Ok(store.find_submission(player_id, case_id).await?.is_some())
}

/// Entry into the question flow.
///
/// A case can only be attempted once, and never before it unlocks. The
/// returned view carries no answer keys.
pub async fn open_case(
    store: &dyn Store,
    player_id: Uuid,
    case_id: Uuid,
    now: DateTime<Utc>,
) -> Result<PublicCase, AppError> {
    if has_submitted(store, player_id, case_id).await? {
        return Err(duplicate_submission());
    }

    let case = cases::get_case(store, case_id).await?;
    ensure_unlocked(&case, now)?;

    Ok(PublicCase::from(&case))
}

/// Records the player's answer set as a pending submission.
pub async fn submit(
    store: &dyn Store,
    player_id: Uuid,
    case_id: Uuid,
    answers: Vec<Answer>,
    now: DateTime<Utc>,
) -> Result<Submission, AppError> {
    store
        .get_player(player_id)
        .await?
        .ok_or_else(|| AppError::AuthError("Session expired. Please login again.".to_string()))?;

    let case = cases::get_case(store, case_id).await?;
    ensure_unlocked(&case, now)?;
    check_answers(&case, &answers)?;

    let submission = store.insert_submission(player_id, case_id, answers).await?;
    tracing::info!(
        submission_id = %submission.id,
        player_id = %player_id,
        case_id = %case_id,
        "Submission recorded for review"
    );
    Ok(submission)
}

fn ensure_unlocked(case: &Case, now: DateTime<Utc>) -> Result<(), AppError> {
    match time_gate::evaluate(case.unlock_time, now) {
        Gate::Unlocked => Ok(()),
        Gate::Locked { remaining } => Err(AppError::Locked(format!(
            "Case is locked. Unlocks in {}",
            remaining
        ))),
    }
}

/// One slot per question, each slot shaped for its question.
fn check_answers(case: &Case, answers: &[Answer]) -> Result<(), AppError> {
    if answers.len() != case.question_count() {
        return Err(AppError::BadRequest(format!(
            "Expected {} answers, got {}",
            case.question_count(),
            answers.len()
        )));
    }

    for (idx, (question, answer)) in case.questions.iter().zip(answers).enumerate() {
        if !question.accepts(answer) {
            return Err(AppError::BadRequest(format!(
                "Answer {} does not fit question {}",
                idx + 1,
                idx + 1
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::case::{Question, QuestionKind};
    use sqlx::types::Json;

    fn case() -> Case {
        Case {
            id: Uuid::new_v4(),
            title: "C1".into(),
            brief: String::new(),
            unlock_time: Utc::now(),
            questions: Json(vec![
                Question {
                    prompt: "Pick".into(),
                    kind: QuestionKind::Mcq {
                        options: vec!["a".into(), "b".into()],
                        answer: 1,
                    },
                    points: 10,
                },
                Question {
                    prompt: "Type".into(),
                    kind: QuestionKind::Text { answer: "paris".into() },
                    points: 10,
                },
            ]),
            max_score: 20,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn answers_must_match_question_count() {
        let err = check_answers(&case(), &[Answer::Choice(0)]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn unanswered_slots_are_accepted() {
        assert!(check_answers(&case(), &[Answer::Unanswered, Answer::Unanswered]).is_ok());
    }

    #[test]
    fn out_of_range_choice_is_rejected() {
        let err = check_answers(&case(), &[Answer::Choice(5), Answer::Unanswered]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn locked_case_is_refused() {
        let mut c = case();
        c.unlock_time = Utc::now() + chrono::Duration::hours(3);
        assert!(matches!(
            ensure_unlocked(&c, Utc::now()),
            Err(AppError::Locked(_))
        ));
    }
}
