// src/models/submission.rs

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::{FromRow, Type, types::Json};
use uuid::Uuid;

use crate::models::case::Question;

/// Review state of a submission. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "submission_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a status filter. `None` means no filter ("all").
    pub fn parse_filter(s: &str) -> Result<Option<Self>, String> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(None),
            "pending" => Ok(Some(Self::Pending)),
            "approved" => Ok(Some(Self::Approved)),
            "rejected" => Ok(Some(Self::Rejected)),
            other => Err(format!("Unknown status filter '{}'", other)),
        }
    }
}

/// One answer slot. Positions line up 1:1 with the case's questions.
///
/// On the wire an answer is a bare JSON value: a non-negative integer is an
/// option index, a string is free text, and `-1` (or `null`) is unanswered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Choice(usize),
    Text(String),
    Unanswered,
}

impl Serialize for Answer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Answer::Choice(idx) => serializer.serialize_u64(*idx as u64),
            Answer::Text(text) => serializer.serialize_str(text),
            Answer::Unanswered => serializer.serialize_i64(-1),
        }
    }
}

impl<'de> Deserialize<'de> for Answer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Index(i64),
            Text(String),
            Null(()),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Index(idx) if idx >= 0 => Answer::Choice(idx as usize),
            Raw::Index(_) | Raw::Null(()) => Answer::Unanswered,
            Raw::Text(text) => Answer::Text(text),
        })
    }
}

/// Display-only comparison of one answer against its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerCheck {
    Correct,
    Incorrect,
    Unanswered,
}

/// Represents the 'submissions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub player_id: Uuid,
    pub case_id: Uuid,
    pub answers: Json<Vec<Answer>>,
    /// 0 until approved.
    pub score: i32,
    pub status: SubmissionStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Submission {
    pub fn is_pending(&self) -> bool {
        self.status == SubmissionStatus::Pending
    }
}

/// Submission joined with the player's and case's display fields.
#[derive(Debug, Serialize)]
pub struct SubmissionWithDetails {
    #[serde(flatten)]
    pub submission: Submission,
    pub player_name: String,
    pub player_number: String,
    pub case_title: String,
    pub case_questions: Vec<Question>,
    pub max_score: i32,
    /// One entry per answer slot.
    pub checks: Vec<AnswerCheck>,
}

/// DTO for a player's answer set.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswersRequest {
    pub answers: Vec<Answer>,
}

/// DTO for approving a submission.
#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    /// Requested score; clamped to the case's range before it is stored.
    pub score: i64,
}

/// Query parameters for listing submissions.
#[derive(Debug, Deserialize)]
pub struct SubmissionListParams {
    /// 'all', 'pending' (default), 'approved' or 'rejected'.
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_decode_from_mixed_legacy_array() {
        let answers: Vec<Answer> = serde_json::from_str(r#"[1, "paris", -1, null]"#).unwrap();
        assert_eq!(
            answers,
            vec![
                Answer::Choice(1),
                Answer::Text("paris".into()),
                Answer::Unanswered,
                Answer::Unanswered,
            ]
        );
    }

    #[test]
    fn unanswered_encodes_as_minus_one() {
        let json = serde_json::to_string(&vec![
            Answer::Choice(0),
            Answer::Text("x".into()),
            Answer::Unanswered,
        ])
        .unwrap();
        assert_eq!(json, r#"[0,"x",-1]"#);
    }

    #[test]
    fn status_filter_parsing() {
        assert_eq!(SubmissionStatus::parse_filter("all"), Ok(None));
        assert_eq!(
            SubmissionStatus::parse_filter("Pending"),
            Ok(Some(SubmissionStatus::Pending))
        );
        assert!(SubmissionStatus::parse_filter("graded").is_err());
    }
}
