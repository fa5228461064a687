// src/services/leaderboard.rs

use crate::{
    error::AppError,
    models::{leaderboard::LeaderboardEntry, player::Player},
    store::Store,
};

/// Ranks players by score (highest first), earlier registration winning ties.
/// Rank is the 1-based row position, so tied scores still get distinct ranks.
pub fn project(mut players: Vec<Player>) -> Vec<LeaderboardEntry> {
    players.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });

    players
        .into_iter()
        .enumerate()
        .map(|(idx, p)| LeaderboardEntry {
            rank: idx + 1,
            name: p.name,
            number: p.number,
            score: p.score,
        })
        .collect()
}

/// Full recompute from the current player records.
pub async fn leaderboard(store: &dyn Store) -> Result<Vec<LeaderboardEntry>, AppError> {
    Ok(project(store.list_players().await?))
}
