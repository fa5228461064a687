// src/models/session.rs

use serde::Serialize;
use uuid::Uuid;

/// Returned on player login; `token` is presented as a Bearer credential.
#[derive(Debug, Serialize)]
pub struct PlayerSession {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub expires_in: u64,
    pub player_id: Uuid,
    pub player_name: String,
    pub player_number: String,
}

/// Returned on admin login.
#[derive(Debug, Serialize)]
pub struct AdminSession {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub expires_in: u64,
    pub admin_id: Uuid,
    pub username: String,
}
