// src/store/memory.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use super::{
    CHANGE_CHANNEL_CAPACITY, Review, Store, already_reviewed, duplicate_submission,
    submission_not_found,
};
use crate::{
    error::AppError,
    models::{
        admin::AdminUser,
        case::{Case, NewCase},
        player::Player,
        submission::{Answer, Submission, SubmissionStatus},
    },
};

#[derive(Default)]
struct Tables {
    players: Vec<Player>,
    cases: Vec<Case>,
    submissions: Vec<Submission>,
    admins: Vec<AdminUser>,
}

/// Process-local store. One lock guards all tables, so every trait method is
/// atomic with respect to the others.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    changes: broadcast::Sender<Uuid>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            tables: RwLock::new(Tables::default()),
            changes,
        }
    }

    /// Drops a player record while leaving its submissions behind.
    pub async fn remove_player(&self, id: Uuid) -> bool {
        let mut tables = self.tables.write().await;
        let before = tables.players.len();
        tables.players.retain(|p| p.id != id);
        let removed = tables.players.len() != before;
        drop(tables);
        if removed {
            self.notify(id);
        }
        removed
    }

    /// Drops a case record while leaving its submissions behind.
    pub async fn remove_case(&self, id: Uuid) -> bool {
        let mut tables = self.tables.write().await;
        let before = tables.cases.len();
        tables.cases.retain(|c| c.id != id);
        tables.cases.len() != before
    }

    fn notify(&self, player_id: Uuid) {
        // No subscribers is fine.
        let _ = self.changes.send(player_id);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_player_by_number(&self, number: &str) -> Result<Option<Player>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.players.iter().find(|p| p.number == number).cloned())
    }

    async fn get_player(&self, id: Uuid) -> Result<Option<Player>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.players.iter().find(|p| p.id == id).cloned())
    }

    async fn create_player(&self, name: &str, number: &str) -> Result<Player, AppError> {
        let mut tables = self.tables.write().await;
        if tables.players.iter().any(|p| p.number == number) {
            return Err(AppError::Conflict(format!(
                "Badge number '{}' is already registered",
                number
            )));
        }

        let player = Player {
            id: Uuid::new_v4(),
            name: name.to_string(),
            number: number.to_string(),
            score: 0,
            completed_cases: Vec::new(),
            created_at: Utc::now(),
        };
        tables.players.push(player.clone());
        drop(tables);

        self.notify(player.id);
        Ok(player)
    }

    async fn list_players(&self) -> Result<Vec<Player>, AppError> {
        Ok(self.tables.read().await.players.clone())
    }

    async fn get_case(&self, id: Uuid) -> Result<Option<Case>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.cases.iter().find(|c| c.id == id).cloned())
    }

    async fn list_cases(&self) -> Result<Vec<Case>, AppError> {
        let mut cases = self.tables.read().await.cases.clone();
        cases.sort_by_key(|c| c.unlock_time);
        Ok(cases)
    }

    async fn create_case(&self, new_case: NewCase) -> Result<Case, AppError> {
        let case = Case {
            id: Uuid::new_v4(),
            title: new_case.title,
            brief: new_case.brief,
            unlock_time: new_case.unlock_time,
            questions: Json(new_case.questions),
            max_score: new_case.max_score,
            created_at: Utc::now(),
        };
        self.tables.write().await.cases.push(case.clone());
        Ok(case)
    }

    async fn find_submission(
        &self,
        player_id: Uuid,
        case_id: Uuid,
    ) -> Result<Option<Submission>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .submissions
            .iter()
            .find(|s| s.player_id == player_id && s.case_id == case_id)
            .cloned())
    }

    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.submissions.iter().find(|s| s.id == id).cloned())
    }

    async fn list_submissions(
        &self,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<Submission>, AppError> {
        let tables = self.tables.read().await;
        // Walk newest inserts first so equal timestamps still come out newest first.
        let mut list: Vec<Submission> = tables
            .submissions
            .iter()
            .rev()
            .filter(|s| status.is_none_or(|wanted| s.status == wanted))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn insert_submission(
        &self,
        player_id: Uuid,
        case_id: Uuid,
        answers: Vec<Answer>,
    ) -> Result<Submission, AppError> {
        let mut tables = self.tables.write().await;
        if tables
            .submissions
            .iter()
            .any(|s| s.player_id == player_id && s.case_id == case_id)
        {
            return Err(duplicate_submission());
        }

        let submission = Submission {
            id: Uuid::new_v4(),
            player_id,
            case_id,
            answers: Json(answers),
            score: 0,
            status: SubmissionStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
        };
        tables.submissions.push(submission.clone());
        Ok(submission)
    }

    async fn approve_submission(
        &self,
        id: Uuid,
        score: i32,
        review: Review,
    ) -> Result<Submission, AppError> {
        let mut tables = self.tables.write().await;
        let Tables {
            players,
            submissions,
            ..
        } = &mut *tables;

        let submission = submissions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(submission_not_found)?;
        if !submission.is_pending() {
            return Err(already_reviewed(submission.status));
        }

        // Resolve the player before touching anything so a failure leaves no trace.
        let player = players
            .iter_mut()
            .find(|p| p.id == submission.player_id)
            .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;

        submission.status = SubmissionStatus::Approved;
        submission.score = score;
        submission.reviewed_by = Some(review.reviewer_id);
        submission.reviewed_at = Some(review.reviewed_at);

        player.score = player.score.saturating_add(score);
        if !player.has_completed(submission.case_id) {
            player.completed_cases.push(submission.case_id);
        }

        let approved = submission.clone();
        drop(tables);

        self.notify(approved.player_id);
        Ok(approved)
    }

    async fn reject_submission(&self, id: Uuid, review: Review) -> Result<Submission, AppError> {
        let mut tables = self.tables.write().await;
        let submission = tables
            .submissions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(submission_not_found)?;
        if !submission.is_pending() {
            return Err(already_reviewed(submission.status));
        }

        submission.status = SubmissionStatus::Rejected;
        submission.score = 0;
        submission.reviewed_by = Some(review.reviewer_id);
        submission.reviewed_at = Some(review.reviewed_at);
        Ok(submission.clone())
    }

    async fn find_admin_by_username(&self, username: &str) -> Result<Option<AdminUser>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.admins.iter().find(|a| a.username == username).cloned())
    }

    async fn create_admin(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<AdminUser, AppError> {
        let mut tables = self.tables.write().await;
        if tables.admins.iter().any(|a| a.username == username) {
            return Err(AppError::Conflict(format!(
                "Admin '{}' already exists",
                username
            )));
        }
        let admin = AdminUser {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        tables.admins.push(admin.clone());
        Ok(admin)
    }

    fn player_changes(&self) -> broadcast::Receiver<Uuid> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::case::{Question, QuestionKind};

    fn review() -> Review {
        Review {
            reviewer_id: Uuid::new_v4(),
            reviewed_at: Utc::now(),
        }
    }

    async fn seeded() -> (MemoryStore, Player, Case) {
        let store = MemoryStore::new();
        let player = store.create_player("Alice", "A1").await.unwrap();
        let case = store
            .create_case(NewCase {
                title: "C1".into(),
                brief: String::new(),
                unlock_time: Utc::now(),
                questions: vec![Question {
                    prompt: "?".into(),
                    kind: QuestionKind::Text { answer: "x".into() },
                    points: 10,
                }],
                max_score: 10,
            })
            .await
            .unwrap();
        (store, player, case)
    }

    #[tokio::test]
    async fn second_insert_for_same_pair_is_duplicate() {
        let (store, player, case) = seeded().await;
        store
            .insert_submission(player.id, case.id, vec![Answer::Unanswered])
            .await
            .unwrap();
        let err = store
            .insert_submission(player.id, case.id, vec![Answer::Unanswered])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateSubmission(_)));
    }

    #[tokio::test]
    async fn approve_with_missing_player_changes_nothing() {
        let (store, player, case) = seeded().await;
        let sub = store
            .insert_submission(player.id, case.id, vec![Answer::Unanswered])
            .await
            .unwrap();
        store.remove_player(player.id).await;

        let err = store.approve_submission(sub.id, 5, review()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let after = store.get_submission(sub.id).await.unwrap().unwrap();
        assert!(after.is_pending());
        assert_eq!(after.score, 0);
        assert!(after.reviewed_by.is_none());
    }

    #[tokio::test]
    async fn approve_publishes_player_change() {
        let (store, player, case) = seeded().await;
        let mut rx = store.player_changes();
        let sub = store
            .insert_submission(player.id, case.id, vec![Answer::Unanswered])
            .await
            .unwrap();
        store.approve_submission(sub.id, 7, review()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), player.id);
    }

    #[tokio::test]
    async fn duplicate_badge_number_conflicts() {
        let (store, _, _) = seeded().await;
        let err = store.create_player("Mallory", "A1").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
