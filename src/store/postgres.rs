// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgListener, types::Json};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{
    CHANGE_CHANNEL_CAPACITY, Review, Store, already_reviewed, duplicate_submission,
    submission_not_found,
};
use crate::{
    error::{AppError, is_unique_violation},
    models::{
        admin::AdminUser,
        case::{Case, NewCase},
        player::Player,
        submission::{Answer, Submission, SubmissionStatus},
    },
};

/// Channel raised by the `players` trigger (see migrations).
pub const PLAYER_CHANGES_CHANNEL: &str = "players_changed";

const PLAYER_COLUMNS: &str = "id, name, number, score, completed_cases, created_at";
const CASE_COLUMNS: &str = "id, title, brief, unlock_time, questions, max_score, created_at";
const SUBMISSION_COLUMNS: &str =
    "id, player_id, case_id, answers, score, status, reviewed_by, reviewed_at, created_at";

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    changes: broadcast::Sender<Uuid>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { pool, changes }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Spawns a task that forwards `players_changed` notifications to
    /// `player_changes()` subscribers.
    pub async fn start_change_listener(&self) -> Result<(), AppError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(PLAYER_CHANGES_CHANNEL).await?;

        let changes = self.changes.clone();
        tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => match Uuid::parse_str(notification.payload()) {
                        Ok(player_id) => {
                            let _ = changes.send(player_id);
                        }
                        Err(e) => {
                            tracing::warn!("Ignoring malformed player notification: {}", e)
                        }
                    },
                    Err(e) => {
                        // PgListener reconnects on the next recv.
                        tracing::error!("Player change listener error: {:?}", e);
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    }
                }
            }
        });

        tracing::info!("Listening for player changes on '{}'", PLAYER_CHANGES_CHANNEL);
        Ok(())
    }

    /// Loads the status of an existing submission to explain why a guarded
    /// update touched no rows.
    async fn review_miss<'e, E>(executor: E, id: Uuid) -> AppError
    where
        E: sqlx::PgExecutor<'e>,
    {
        match sqlx::query_scalar::<_, SubmissionStatus>(
            "SELECT status FROM submissions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
        {
            Ok(Some(status)) => already_reviewed(status),
            Ok(None) => submission_not_found(),
            Err(e) => AppError::from(e),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_player_by_number(&self, number: &str) -> Result<Option<Player>, AppError> {
        let player = sqlx::query_as::<_, Player>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE number = $1"
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(player)
    }

    async fn get_player(&self, id: Uuid) -> Result<Option<Player>, AppError> {
        let player =
            sqlx::query_as::<_, Player>(&format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(player)
    }

    async fn create_player(&self, name: &str, number: &str) -> Result<Player, AppError> {
        sqlx::query_as::<_, Player>(&format!(
            r#"
            INSERT INTO players (id, name, number)
            VALUES ($1, $2, $3)
            RETURNING {PLAYER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(number)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Badge number '{}' is already registered", number))
            } else {
                tracing::error!("Failed to create player: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn list_players(&self) -> Result<Vec<Player>, AppError> {
        let players = sqlx::query_as::<_, Player>(&format!("SELECT {PLAYER_COLUMNS} FROM players"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list players: {:?}", e);
                AppError::from(e)
            })?;
        Ok(players)
    }

    async fn get_case(&self, id: Uuid) -> Result<Option<Case>, AppError> {
        let case = sqlx::query_as::<_, Case>(&format!("SELECT {CASE_COLUMNS} FROM cases WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(case)
    }

    async fn list_cases(&self) -> Result<Vec<Case>, AppError> {
        let cases = sqlx::query_as::<_, Case>(&format!(
            "SELECT {CASE_COLUMNS} FROM cases ORDER BY unlock_time ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list cases: {:?}", e);
            AppError::from(e)
        })?;
        Ok(cases)
    }

    async fn create_case(&self, new_case: NewCase) -> Result<Case, AppError> {
        sqlx::query_as::<_, Case>(&format!(
            r#"
            INSERT INTO cases (id, title, brief, unlock_time, questions, max_score)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CASE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_case.title)
        .bind(&new_case.brief)
        .bind(new_case.unlock_time)
        .bind(Json(&new_case.questions))
        .bind(new_case.max_score)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create case: {:?}", e);
            AppError::from(e)
        })
    }

    async fn find_submission(
        &self,
        player_id: Uuid,
        case_id: Uuid,
    ) -> Result<Option<Submission>, AppError> {
        let submission = sqlx::query_as::<_, Submission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE player_id = $1 AND case_id = $2"
        ))
        .bind(player_id)
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(submission)
    }

    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, AppError> {
        let submission = sqlx::query_as::<_, Submission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(submission)
    }

    async fn list_submissions(
        &self,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<Submission>, AppError> {
        let submissions = sqlx::query_as::<_, Submission>(&format!(
            r#"
            SELECT {SUBMISSION_COLUMNS}
            FROM submissions
            WHERE ($1::submission_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list submissions: {:?}", e);
            AppError::from(e)
        })?;
        Ok(submissions)
    }

    async fn insert_submission(
        &self,
        player_id: Uuid,
        case_id: Uuid,
        answers: Vec<Answer>,
    ) -> Result<Submission, AppError> {
        // The UNIQUE (player_id, case_id) constraint is the real guard here.
        sqlx::query_as::<_, Submission>(&format!(
            r#"
            INSERT INTO submissions (id, player_id, case_id, answers)
            VALUES ($1, $2, $3, $4)
            RETURNING {SUBMISSION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(player_id)
        .bind(case_id)
        .bind(Json(&answers))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                duplicate_submission()
            } else {
                tracing::error!("Failed to insert submission: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn approve_submission(
        &self,
        id: Uuid,
        score: i32,
        review: Review,
    ) -> Result<Submission, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Flip the status, guarded on it still being pending
        let approved = sqlx::query_as::<_, Submission>(&format!(
            r#"
            UPDATE submissions
            SET status = 'approved', score = $2, reviewed_by = $3, reviewed_at = $4
            WHERE id = $1 AND status = 'pending'
            RETURNING {SUBMISSION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(score)
        .bind(review.reviewer_id)
        .bind(review.reviewed_at)
        .fetch_optional(&mut *tx)
        .await?;

        let approved = match approved {
            Some(s) => s,
            None => return Err(Self::review_miss(&mut *tx, id).await),
        };

        // 2. Credit the player in the same transaction
        let result = sqlx::query(
            r#"
            UPDATE players
            SET score = score + $2,
                completed_cases = CASE
                    WHEN $3 = ANY(completed_cases) THEN completed_cases
                    ELSE array_append(completed_cases, $3)
                END
            WHERE id = $1
            "#,
        )
        .bind(approved.player_id)
        .bind(score)
        .bind(approved.case_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to credit player: {:?}", e);
            AppError::from(e)
        })?;

        if result.rows_affected() == 0 {
            // Dropping `tx` rolls the status change back.
            return Err(AppError::NotFound("Player not found".to_string()));
        }

        tx.commit().await?;
        Ok(approved)
    }

    async fn reject_submission(&self, id: Uuid, review: Review) -> Result<Submission, AppError> {
        let rejected = sqlx::query_as::<_, Submission>(&format!(
            r#"
            UPDATE submissions
            SET status = 'rejected', score = 0, reviewed_by = $2, reviewed_at = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING {SUBMISSION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(review.reviewer_id)
        .bind(review.reviewed_at)
        .fetch_optional(&self.pool)
        .await?;

        match rejected {
            Some(s) => Ok(s),
            None => Err(Self::review_miss(&self.pool, id).await),
        }
    }

    async fn find_admin_by_username(&self, username: &str) -> Result<Option<AdminUser>, AppError> {
        let admin = sqlx::query_as::<_, AdminUser>(
            "SELECT id, username, password_hash, created_at FROM admin_users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Admin lookup failed: {:?}", e);
            AppError::from(e)
        })?;
        Ok(admin)
    }

    async fn create_admin(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<AdminUser, AppError> {
        sqlx::query_as::<_, AdminUser>(
            r#"
            INSERT INTO admin_users (id, username, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Admin '{}' already exists", username))
            } else {
                tracing::error!("Failed to create admin: {:?}", e);
                AppError::from(e)
            }
        })
    }

    fn player_changes(&self) -> broadcast::Receiver<Uuid> {
        self.changes.subscribe()
    }
}
