// src/models/mod.rs

pub mod admin;
pub mod case;
pub mod leaderboard;
pub mod player;
pub mod session;
pub mod submission;
