use crate::constants::is_power_near_expiry;
use crate::maze::GridMaze;
use crate::types::{Direction, PlayerView, Position, PowerState, Tile};

use super::score::{ScoreSnapshot, ScoreTracker};

/// Normal/Powered state machine. `timer > 0` exactly when Powered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PowerMeter {
    state: PowerState,
    timer: u32,
    duration: u32,
}

/// What a `decay` call did to the meter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerTransition {
    Idle,
    Counting,
    Expired,
}

impl PowerMeter {
    pub fn new(duration: u32) -> Self {
        Self {
            state: PowerState::Normal,
            timer: 0,
            duration,
        }
    }

    /// Re-triggering while Powered restarts the full duration.
    pub fn power_up(&mut self) {
        if self.duration == 0 {
            return;
        }
        self.state = PowerState::Powered;
        self.timer = self.duration;
    }

    pub fn decay(&mut self) -> PowerTransition {
        if self.state != PowerState::Powered {
            return PowerTransition::Idle;
        }
        self.timer = self.timer.saturating_sub(1);
        if self.timer == 0 {
            self.state = PowerState::Normal;
            return PowerTransition::Expired;
        }
        PowerTransition::Counting
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn timer(&self) -> u32 {
        self.timer
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn is_powered(&self) -> bool {
        self.state == PowerState::Powered
    }

    pub fn near_expiry(&self) -> bool {
        self.is_powered() && is_power_near_expiry(self.timer, self.duration)
    }
}

/// Result of a single player step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Blocked,
    Moved { consumed: Tile },
    Paused,
}

#[derive(Clone, Debug)]
pub struct PlayerAgent {
    position: Position,
    spawn: Position,
    lives: u32,
    power: PowerMeter,
    tracker: ScoreTracker,
}

impl PlayerAgent {
    pub fn new(spawn: Position, lives: u32, power_duration: u32) -> Self {
        Self {
            position: spawn,
            spawn,
            lives,
            power: PowerMeter::new(power_duration),
            tracker: ScoreTracker::default(),
        }
    }

    /// Walls and off-grid targets leave the player untouched.
    pub fn attempt_move(&mut self, maze: &mut GridMaze, dir: Direction) -> MoveOutcome {
        if dir == Direction::None {
            return MoveOutcome::Blocked;
        }
        let target = self.position.step(dir);
        if maze.is_wall(target.x, target.y) {
            return MoveOutcome::Blocked;
        }

        let consumed = maze.consume(target.x, target.y);
        match consumed {
            Tile::Dot => self.tracker.record_dot(),
            Tile::PowerPellet => {
                self.tracker.record_pellet();
                self.power_up();
            }
            _ => {}
        }
        self.position = target;
        MoveOutcome::Moved { consumed }
    }

    pub fn power_up(&mut self) {
        self.power.power_up();
    }

    pub fn decay_power(&mut self) -> PowerTransition {
        self.power.decay()
    }

    pub fn eat_ghost(&mut self) -> bool {
        if !self.power.is_powered() {
            return false;
        }
        self.tracker.record_ghost();
        true
    }

    pub fn lose_life(&mut self) {
        if self.lives > 0 {
            self.lives -= 1;
            self.tracker.record_life_lost();
        }
        self.position = self.spawn;
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn score(&self) -> u32 {
        self.tracker.score()
    }

    pub fn power(&self) -> &PowerMeter {
        &self.power
    }

    pub fn is_powered(&self) -> bool {
        self.power.is_powered()
    }

    pub fn stats(&self) -> ScoreSnapshot {
        self.tracker.snapshot()
    }

    pub fn view(&self) -> PlayerView {
        let stats = self.tracker.snapshot();
        PlayerView {
            x: self.position.x,
            y: self.position.y,
            lives: self.lives,
            score: stats.score,
            dots_collected: stats.dots,
            power_pellets_collected: stats.pellets,
            ghosts_eaten: stats.ghosts_eaten,
            power_state: self.power.state(),
            power_timer: self.power.timer(),
        }
    }

    #[cfg(test)]
    pub(super) fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}
