// src/services/mod.rs

//! Gameplay and grading operations, independent of HTTP.

pub mod auth;
pub mod cases;
pub mod leaderboard;
pub mod review;
pub mod submission;
