// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Placeholder shown for a submission whose player record is gone.
pub const UNKNOWN_PLAYER_NAME: &str = "Unknown";
pub const UNKNOWN_PLAYER_NUMBER: &str = "N/A";
/// Placeholder shown for a submission whose case record is gone.
pub const UNKNOWN_CASE_TITLE: &str = "Unknown Case";

/// Default lifetime of a session token (one day).
pub const DEFAULT_JWT_EXPIRATION: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Session token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    /// Admin accounts created at startup when a seed password is present.
    pub admin_seed_usernames: Vec<String>,
    pub admin_seed_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_JWT_EXPIRATION);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let admin_seed_usernames = parse_usernames(
            &env::var("ADMIN_SEED_USERNAMES").unwrap_or_else(|_| "admin1,admin2".to_string()),
        );

        let admin_seed_password = env::var("ADMIN_SEED_PASSWORD")
            .ok()
            .filter(|p| !p.is_empty());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            admin_seed_usernames,
            admin_seed_password,
        }
    }
}

/// Splits a comma separated list, dropping blanks.
fn parse_usernames(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_usernames_trims_and_skips_blanks() {
        assert_eq!(
            parse_usernames(" admin1, ,admin2 ,"),
            vec!["admin1".to_string(), "admin2".to_string()]
        );
        assert!(parse_usernames("").is_empty());
    }
}
