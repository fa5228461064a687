// src/models/leaderboard.rs

use serde::Serialize;

/// One ranked row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based row position; equal scores still get distinct ranks.
    pub rank: usize,
    pub name: String,
    pub number: String,
    pub score: i32,
}
