// src/services/auth.rs

use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        admin::AdminLoginRequest,
        player::PlayerLoginRequest,
        session::{AdminSession, PlayerSession},
    },
    store::Store,
    utils::{
        hash::{hash_password, verify_password},
        html::sanitize_display_name,
        jwt::{Role, sign_jwt},
    },
};

/// Restores the session of an existing badge number, or registers a new
/// player with score 0 under that number.
pub async fn player_login(
    store: &dyn Store,
    config: &Config,
    req: PlayerLoginRequest,
) -> Result<PlayerSession, AppError> {
    let req = req.normalized();
    req.validate()?;

    let player = match store.find_player_by_number(&req.number).await? {
        Some(existing) => existing,
        None => {
            let name = sanitize_display_name(&req.name);
            if name.is_empty() {
                return Err(AppError::BadRequest("Please fill in all fields".to_string()));
            }
            match store.create_player(&name, &req.number).await {
                Ok(created) => {
                    tracing::info!(player_id = %created.id, number = %created.number, "Player registered");
                    created
                }
                // Another login registered this badge first.
                Err(AppError::Conflict(msg)) => store
                    .find_player_by_number(&req.number)
                    .await?
                    .ok_or(AppError::Conflict(msg))?,
                Err(e) => return Err(e),
            }
        }
    };

    let token = sign_jwt(
        player.id,
        Role::Player,
        &player.name,
        Some(&player.number),
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(PlayerSession {
        token,
        token_type: "Bearer",
        expires_in: config.jwt_expiration,
        player_id: player.id,
        player_name: player.name,
        player_number: player.number,
    })
}

/// Verifies admin credentials against the stored argon2 hash.
pub async fn admin_login(
    store: &dyn Store,
    config: &Config,
    req: AdminLoginRequest,
) -> Result<AdminSession, AppError> {
    req.validate()?;

    let admin = store
        .find_admin_by_username(req.username.trim())
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&req.password, &admin.password_hash)? {
        tracing::warn!(username = %admin.username, "Admin login with wrong password");
        return Err(AppError::AuthError(
            "Invalid username or password".to_string(),
        ));
    }

    let token = sign_jwt(
        admin.id,
        Role::Admin,
        &admin.username,
        None,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(AdminSession {
        token,
        token_type: "Bearer",
        expires_in: config.jwt_expiration,
        admin_id: admin.id,
        username: admin.username,
    })
}

/// Creates the configured seed admin accounts that do not exist yet.
/// Returns how many accounts were created.
pub async fn seed_admins(store: &dyn Store, config: &Config) -> Result<usize, AppError> {
    let Some(password) = &config.admin_seed_password else {
        tracing::info!("No ADMIN_SEED_PASSWORD set, skipping admin seeding");
        return Ok(0);
    };

    let mut created = 0;
    for username in &config.admin_seed_usernames {
        if store.find_admin_by_username(username).await?.is_some() {
            continue;
        }
        tracing::info!("Seeding admin user: {}", username);
        let hashed_password = hash_password(password)?;
        store.create_admin(username, &hashed_password).await?;
        created += 1;
    }
    Ok(created)
}
