use serde::Serialize;

use crate::constants::{DOT_SCORE, GHOST_SCORE, POWER_PELLET_SCORE};

/// Monotone counters for one session. Only ever grows; a new session gets a
/// new tracker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScoreTracker {
    score: u32,
    dots: u32,
    pellets: u32,
    ghosts_eaten: u32,
    lives_lost: u32,
}

/// Read-only copy handed to collaborators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScoreSnapshot {
    pub score: u32,
    pub dots: u32,
    pub pellets: u32,
    #[serde(rename = "ghostsEaten")]
    pub ghosts_eaten: u32,
    #[serde(rename = "livesLost")]
    pub lives_lost: u32,
}

impl ScoreTracker {
    pub fn record_dot(&mut self) {
        self.score = self.score.saturating_add(DOT_SCORE);
        self.dots += 1;
    }

    pub fn record_pellet(&mut self) {
        self.score = self.score.saturating_add(POWER_PELLET_SCORE);
        self.pellets += 1;
    }

    pub fn record_ghost(&mut self) {
        self.score = self.score.saturating_add(GHOST_SCORE);
        self.ghosts_eaten += 1;
    }

    pub fn record_life_lost(&mut self) {
        self.lives_lost += 1;
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            score: self.score,
            dots: self.dots,
            pellets: self.pellets,
            ghosts_eaten: self.ghosts_eaten,
            lives_lost: self.lives_lost,
        }
    }
}
