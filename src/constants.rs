use crate::types::{Difficulty, DifficultyProfile};

pub const TICK_MS: u64 = 100;

pub const START_LIVES: u32 = 3;
pub const DOT_SCORE: u32 = 10;
pub const POWER_PELLET_SCORE: u32 = 50;
pub const GHOST_SCORE: u32 = 200;

/// One second of suppressed ticks after a life is lost.
pub const LIFE_LOSS_PAUSE_TICKS: u32 = 10;

/// Power visuals start blinking once the remaining timer drops below
/// `1 / POWER_NEAR_EXPIRY_DIVISOR` of the full duration.
pub const POWER_NEAR_EXPIRY_DIVISOR: u32 = 5;

pub const STATS_SAMPLE_INTERVAL_TICKS: u64 = 100;
pub const STATS_MAX_SAMPLES: usize = 600;

pub fn get_difficulty_profile(difficulty: Difficulty) -> DifficultyProfile {
    match difficulty {
        Difficulty::Easy => DifficultyProfile {
            pursuer_count: 2,
            pursuer_move_interval: 4,
            power_duration: 100,
        },
        Difficulty::Normal => DifficultyProfile {
            pursuer_count: 3,
            pursuer_move_interval: 3,
            power_duration: 60,
        },
        Difficulty::Hard => DifficultyProfile {
            pursuer_count: 4,
            pursuer_move_interval: 3,
            power_duration: 40,
        },
    }
}

pub fn is_power_near_expiry(timer: u32, duration: u32) -> bool {
    timer > 0 && timer.saturating_mul(POWER_NEAR_EXPIRY_DIVISOR) < duration
}
