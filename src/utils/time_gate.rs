// src/utils/time_gate.rs

use chrono::{DateTime, Utc};

/// Label returned once a case is open.
pub const UNLOCKED_LABEL: &str = "Unlocked";

/// Accessibility of a case at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Unlocked,
    Locked { remaining: String },
}

impl Gate {
    pub fn is_unlocked(&self) -> bool {
        matches!(self, Gate::Unlocked)
    }

    pub fn label(&self) -> &str {
        match self {
            Gate::Unlocked => UNLOCKED_LABEL,
            Gate::Locked { remaining } => remaining,
        }
    }
}

pub fn is_unlocked(unlock_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= unlock_time
}

pub fn evaluate(unlock_time: DateTime<Utc>, now: DateTime<Utc>) -> Gate {
    if is_unlocked(unlock_time, now) {
        Gate::Unlocked
    } else {
        Gate::Locked {
            remaining: time_until_unlock(unlock_time, now),
        }
    }
}

/// Remaining time truncated to whole minutes, e.g. "2d 5h", "3h 12m", "45m".
pub fn time_until_unlock(unlock_time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if is_unlocked(unlock_time, now) {
        return UNLOCKED_LABEL.to_string();
    }

    let diff = unlock_time - now;
    let days = diff.num_days();
    let hours = diff.num_hours() % 24;
    let minutes = diff.num_minutes() % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
