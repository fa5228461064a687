// src/models/case.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::submission::{Answer, AnswerCheck},
};

/// Represents the 'cases' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    pub title: String,

    /// Narrative shown before the questions.
    pub brief: String,

    /// The case cannot be opened before this instant.
    pub unlock_time: chrono::DateTime<chrono::Utc>,

    /// Ordered question set, stored as a JSON array.
    pub questions: Json<Vec<Question>>,

    /// Highest score an admin may award for this case.
    pub max_score: i32,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Case {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Sum of per-question points. Not required to equal `max_score`.
    pub fn points_total(&self) -> i64 {
        self.questions.iter().map(|q| i64::from(q.points)).sum()
    }
}

/// Sum of question points, or `None` if it does not fit a score column.
pub fn checked_points_total(questions: &[Question]) -> Option<i32> {
    questions
        .iter()
        .try_fold(0i32, |total, q| total.checked_add(q.points))
}

/// A single question inside a case.
///
/// Decoding also accepts the legacy shape: `q` for the prompt, and no `type`
/// key, in which case a question with `options` is multiple choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuestion")]
pub struct Question {
    pub prompt: String,

    #[serde(flatten)]
    pub kind: QuestionKind,

    pub points: i32,
}

/// Question type together with its answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuestionKind {
    /// Multiple choice; `answer` is an index into `options`.
    Mcq { options: Vec<String>, answer: usize },
    /// Free text; matched case-insensitively after trimming.
    Text { answer: String },
}

#[derive(Deserialize)]
struct RawQuestion {
    #[serde(alias = "q")]
    prompt: String,
    #[serde(rename = "type", default)]
    question_type: Option<String>,
    #[serde(default)]
    options: Option<Vec<String>>,
    answer: serde_json::Value,
    points: i32,
}

impl TryFrom<RawQuestion> for Question {
    type Error = String;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        let is_mcq = match raw.question_type.as_deref() {
            Some("mcq") => true,
            Some("text") => false,
            Some(other) => return Err(format!("unknown question type '{}'", other)),
            None => raw.options.is_some(),
        };

        let kind = if is_mcq {
            let answer = raw
                .answer
                .as_u64()
                .ok_or("multiple choice answer must be an option index")?;
            QuestionKind::Mcq {
                options: raw.options.unwrap_or_default(),
                answer: answer as usize,
            }
        } else {
            let answer = match raw.answer {
                serde_json::Value::String(text) => text,
                serde_json::Value::Number(n) => n.to_string(),
                _ => return Err("text answer must be a string".to_string()),
            };
            QuestionKind::Text { answer }
        };

        Ok(Question {
            prompt: raw.prompt,
            kind,
            points: raw.points,
        })
    }
}

impl Question {
    /// Compares a submitted answer with the stored key.
    /// The result is shown to reviewers only; it never sets a score.
    /// A blank text answer counts as unanswered.
    pub fn check(&self, answer: &Answer) -> AnswerCheck {
        let correct = match (&self.kind, answer) {
            (_, Answer::Unanswered) => return AnswerCheck::Unanswered,
            (_, Answer::Text(text)) if text.trim().is_empty() => return AnswerCheck::Unanswered,
            (QuestionKind::Mcq { answer: key, .. }, Answer::Choice(idx)) => key == idx,
            (QuestionKind::Text { answer: key }, Answer::Text(text)) => {
                normalize(key) == normalize(text)
            }
            _ => false,
        };

        if correct {
            AnswerCheck::Correct
        } else {
            AnswerCheck::Incorrect
        }
    }

    /// Whether `answer` has a shape this question can accept.
    pub fn accepts(&self, answer: &Answer) -> bool {
        match (&self.kind, answer) {
            (_, Answer::Unanswered) => true,
            (QuestionKind::Mcq { options, .. }, Answer::Choice(idx)) => *idx < options.len(),
            (QuestionKind::Text { .. }, Answer::Text(_)) => true,
            _ => false,
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// DTO for sending a question to players (excludes the answer key).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub prompt: String,
    #[serde(rename = "type")]
    pub question_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub points: i32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        let (question_type, options) = match &q.kind {
            QuestionKind::Mcq { options, .. } => ("mcq", Some(options.clone())),
            QuestionKind::Text { .. } => ("text", None),
        };
        Self {
            prompt: q.prompt.clone(),
            question_type,
            options,
            points: q.points,
        }
    }
}

/// DTO for an opened case on the player side.
#[derive(Debug, Serialize)]
pub struct PublicCase {
    pub id: Uuid,
    pub title: String,
    pub brief: String,
    pub unlock_time: chrono::DateTime<chrono::Utc>,
    pub max_score: i32,
    pub questions: Vec<PublicQuestion>,
}

impl From<&Case> for PublicCase {
    fn from(c: &Case) -> Self {
        Self {
            id: c.id,
            title: c.title.clone(),
            brief: c.brief.clone(),
            unlock_time: c.unlock_time,
            max_score: c.max_score,
            questions: c.questions.iter().map(PublicQuestion::from).collect(),
        }
    }
}

/// One row of the player's case board.
#[derive(Debug, Serialize)]
pub struct CaseSummary {
    pub id: Uuid,
    pub title: String,
    pub brief: String,
    pub unlock_time: chrono::DateTime<chrono::Utc>,
    pub max_score: i32,
    pub question_count: usize,
    pub unlocked: bool,
    /// "Unlocked" or a remaining-time label such as "2d 5h".
    pub time_until_unlock: String,
    /// A submission of any status exists for this player.
    pub attempted: bool,
    /// The case has been approved for this player.
    pub completed: bool,
}

/// Fields needed to insert a case.
#[derive(Debug, Clone)]
pub struct NewCase {
    pub title: String,
    pub brief: String,
    pub unlock_time: chrono::DateTime<chrono::Utc>,
    pub questions: Vec<Question>,
    pub max_score: i32,
}

/// DTO for creating a new case.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCaseRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 chars"))]
    pub title: String,
    #[validate(length(max = 20000))]
    pub brief: String,
    pub unlock_time: chrono::DateTime<chrono::Utc>,
    #[validate(custom(function = validate_questions))]
    pub questions: Vec<Question>,
    /// Defaults to the sum of question points when omitted.
    #[validate(range(min = 0))]
    pub max_score: Option<i32>,
}

impl CreateCaseRequest {
    /// Fails if the question points do not sum to a representable score.
    pub fn into_new_case(self) -> Result<NewCase, AppError> {
        let points_total = checked_points_total(&self.questions).ok_or_else(|| {
            AppError::BadRequest("Question points add up to more than the maximum score".to_string())
        })?;

        Ok(NewCase {
            title: self.title.trim().to_string(),
            brief: self.brief,
            unlock_time: self.unlock_time,
            max_score: self.max_score.unwrap_or(points_total),
            questions: self.questions,
        })
    }
}

fn validate_questions(questions: &[Question]) -> Result<(), validator::ValidationError> {
    if questions.is_empty() {
        return Err(validator::ValidationError::new("questions_cannot_be_empty"));
    }
    for q in questions {
        if q.prompt.trim().is_empty() {
            return Err(validator::ValidationError::new("prompt_cannot_be_empty"));
        }
        if q.points < 0 {
            return Err(validator::ValidationError::new("points_cannot_be_negative"));
        }
        if let QuestionKind::Text { answer } = &q.kind {
            if answer.trim().is_empty() {
                return Err(validator::ValidationError::new("answer_cannot_be_empty"));
            }
        }
        if let QuestionKind::Mcq { options, answer } = &q.kind {
            if options.is_empty() {
                return Err(validator::ValidationError::new("options_cannot_be_empty"));
            }
            if *answer >= options.len() {
                return Err(validator::ValidationError::new("answer_out_of_bounds"));
            }
        }
    }
    if checked_points_total(questions).is_none() {
        return Err(validator::ValidationError::new("points_total_overflow"));
    }
    Ok(())
}
