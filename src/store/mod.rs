// src/store/mod.rs

//! Storage seam between the services and the record backend.
//!
//! Every method is one atomic unit against the backend. In particular
//! `insert_submission` must reject a second row for the same
//! (player, case) pair, and `approve_submission` must apply the status change
//! and the player credit together or not at all.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        admin::AdminUser,
        case::{Case, NewCase},
        player::Player,
        submission::{Answer, Submission, SubmissionStatus},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Capacity of the player change channel. Slow listeners just lag and recompute.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Review outcome written by `approve_submission` / `reject_submission`.
#[derive(Debug, Clone)]
pub struct Review {
    pub reviewer_id: Uuid,
    pub reviewed_at: DateTime<Utc>,
}

#[async_trait]
pub trait Store: Send + Sync {
    // Players
    async fn find_player_by_number(&self, number: &str) -> Result<Option<Player>, AppError>;
    async fn get_player(&self, id: Uuid) -> Result<Option<Player>, AppError>;
    /// Fails with `Conflict` if the badge number is taken.
    async fn create_player(&self, name: &str, number: &str) -> Result<Player, AppError>;
    async fn list_players(&self) -> Result<Vec<Player>, AppError>;

    // Cases
    async fn get_case(&self, id: Uuid) -> Result<Option<Case>, AppError>;
    /// Ordered by unlock time, earliest first.
    async fn list_cases(&self) -> Result<Vec<Case>, AppError>;
    async fn create_case(&self, new_case: NewCase) -> Result<Case, AppError>;

    // Submissions
    async fn find_submission(
        &self,
        player_id: Uuid,
        case_id: Uuid,
    ) -> Result<Option<Submission>, AppError>;
    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, AppError>;
    /// Newest first; `None` lists every status.
    async fn list_submissions(
        &self,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<Submission>, AppError>;
    /// Inserts a pending submission with score 0.
    /// Fails with `DuplicateSubmission` if the pair already has one.
    async fn insert_submission(
        &self,
        player_id: Uuid,
        case_id: Uuid,
        answers: Vec<Answer>,
    ) -> Result<Submission, AppError>;
    /// Marks a pending submission approved with `score` and credits the
    /// owning player in the same transaction.
    async fn approve_submission(
        &self,
        id: Uuid,
        score: i32,
        review: Review,
    ) -> Result<Submission, AppError>;
    /// Marks a pending submission rejected with score 0.
    async fn reject_submission(&self, id: Uuid, review: Review) -> Result<Submission, AppError>;

    // Admins
    async fn find_admin_by_username(&self, username: &str) -> Result<Option<AdminUser>, AppError>;
    async fn create_admin(&self, username: &str, password_hash: &str)
    -> Result<AdminUser, AppError>;

    /// Notifications carrying the id of every player record that changed.
    fn player_changes(&self) -> broadcast::Receiver<Uuid>;
}

/// Error for a review attempted on a submission that is no longer pending.
pub(crate) fn already_reviewed(status: SubmissionStatus) -> AppError {
    AppError::Conflict(format!(
        "Submission has already been reviewed ({})",
        status.as_str()
    ))
}

pub(crate) fn submission_not_found() -> AppError {
    AppError::NotFound("Submission not found".to_string())
}

pub(crate) fn duplicate_submission() -> AppError {
    AppError::DuplicateSubmission(
        "You have already attempted this case. Each case can only be attempted once.".to_string(),
    )
}
