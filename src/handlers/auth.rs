// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{
    config::Config,
    error::AppError,
    models::player::PlayerLoginRequest,
    services,
    store::Store,
    utils::jwt::Claims,
};

/// Logs a player in by badge number, registering it on first use.
///
/// Returns a Bearer session token plus the player's identity.
pub async fn login(
    State(store): State<Arc<dyn Store>>,
    State(config): State<Config>,
    Json(payload): Json<PlayerLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = services::auth::player_login(store.as_ref(), &config, payload).await?;
    Ok(Json(session))
}

/// Returns the current player's record (score, completed cases).
pub async fn me(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let player = store
        .get_player(claims.subject_id()?)
        .await?
        .ok_or(AppError::NotFound("Player not found".to_string()))?;

    Ok(Json(player))
}

/// Echoes the verified session of any role.
pub async fn session(Extension(claims): Extension<Claims>) -> impl IntoResponse {
    Json(claims)
}
