// src/models/player.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the 'players' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,

    /// Display name, sanitized on registration.
    pub name: String,

    /// Unique badge number; doubles as the login key.
    pub number: String,

    /// Cumulative approved score.
    pub score: i32,

    /// Ids of cases whose submission was approved.
    pub completed_cases: Vec<Uuid>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Player {
    pub fn has_completed(&self, case_id: Uuid) -> bool {
        self.completed_cases.contains(&case_id)
    }
}

/// DTO for player login (registers the badge number on first use).
#[derive(Debug, Deserialize, Validate)]
pub struct PlayerLoginRequest {
    #[validate(length(min = 1, max = 100, message = "Please fill in all fields"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "Please fill in all fields"))]
    pub number: String,
}

impl PlayerLoginRequest {
    /// Trims both fields so whitespace-only input fails validation.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            number: self.number.trim().to_string(),
        }
    }
}
