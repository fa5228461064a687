// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod cases;
pub mod leaderboard;
