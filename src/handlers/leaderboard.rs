// src/handlers/leaderboard.rs

use std::{convert::Infallible, sync::Arc};

use axum::{
    Json,
    extract::State,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, stream};
use tokio::sync::broadcast::error::RecvError;

use crate::{error::AppError, services, store::Store};

/// Retrieves the full ranked leaderboard.
pub async fn get_leaderboard(
    State(store): State<Arc<dyn Store>>,
) -> Result<impl IntoResponse, AppError> {
    let board = services::leaderboard::leaderboard(store.as_ref()).await?;
    Ok(Json(board))
}

/// Streams the leaderboard as server-sent events.
///
/// Sends the current board on connect, then a freshly recomputed board after
/// every player change published by the store.
pub async fn stream_leaderboard(
    State(store): State<Arc<dyn Store>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let changes = store.player_changes();

    let events = stream::unfold(
        (store, changes, true),
        |(store, mut changes, first)| async move {
            if !first {
                match changes.recv().await {
                    Ok(_) => {}
                    // Missed some notifications; one recompute covers them all.
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("Leaderboard stream lagged by {} changes", skipped)
                    }
                    Err(RecvError::Closed) => return None,
                }
            }

            let event = leaderboard_event(store.as_ref()).await;
            Some((Ok(event), (store, changes, false)))
        },
    );

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn leaderboard_event(store: &dyn Store) -> Event {
    let board = match services::leaderboard::leaderboard(store).await {
        Ok(board) => board,
        Err(e) => {
            tracing::error!("Failed to recompute leaderboard: {:?}", e);
            return Event::default()
                .event("error")
                .data("Failed to load leaderboard");
        }
    };

    match serde_json::to_string(&board) {
        Ok(json) => Event::default().event("leaderboard").data(json),
        Err(e) => {
            tracing::error!("Failed to encode leaderboard: {:?}", e);
            Event::default()
                .event("error")
                .data("Failed to load leaderboard")
        }
    }
}
