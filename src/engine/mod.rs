use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::constants::TICK_MS;
use crate::error::{EngineError, StateError};
use crate::maze::GridMaze;
use crate::render::{NullRender, RenderSink};
use crate::stats::{NullStats, StatsSink};
use crate::types::{
    AgentId, Difficulty, DifficultyProfile, Direction, GameOverReason, RuntimeEvent,
    SessionState, SessionSummary, Snapshot, Tile, TickStatus,
};

mod autopilot;
mod pathfinder;
mod player;
mod pursuer;
mod score;

pub use self::autopilot::Autopilot;
pub use self::pathfinder::search;
pub use self::player::{MoveOutcome, PlayerAgent, PowerMeter, PowerTransition};
pub use self::pursuer::{farthest_free_cell, select_target, spawn_pursuers, PursuerAgent};
pub use self::score::{ScoreSnapshot, ScoreTracker};

/// Everything that lives and dies with one play-through.
#[derive(Clone, Debug)]
struct Session {
    difficulty: Difficulty,
    profile: DifficultyProfile,
    maze: GridMaze,
    player: PlayerAgent,
    pursuers: Vec<PursuerAgent>,
    tick_counter: u64,
    pause_ticks: u32,
    end_reason: Option<GameOverReason>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CollisionOutcome {
    None,
    PursuersEaten,
    LifeLost,
}

impl Session {
    fn build(config: &EngineConfig, difficulty: Difficulty) -> Result<Self, EngineError> {
        let profile = config.profile(difficulty)?;
        let maze = GridMaze::load(config.layout(difficulty)?)?;
        let player = PlayerAgent::new(
            maze.player_spawn(),
            config.lives()?,
            profile.power_duration,
        );
        let pursuers = spawn_pursuers(&maze, profile.pursuer_count as usize);
        Ok(Self {
            difficulty,
            profile,
            maze,
            player,
            pursuers,
            tick_counter: 0,
            pause_ticks: 0,
            end_reason: None,
        })
    }

    fn elapsed_ms(&self) -> u64 {
        self.tick_counter.saturating_mul(TICK_MS)
    }

    fn move_pursuers(&mut self) {
        let target = self.player.position();
        let powered = self.player.is_powered();
        for pursuer in &mut self.pursuers {
            pursuer.move_toward(&self.maze, target, powered);
        }
    }

    /// At most one life-loss per call; a loss sends every pursuer home, so
    /// nothing is left colocated afterwards.
    fn resolve_collisions(&mut self, events: &mut Vec<RuntimeEvent>) -> CollisionOutcome {
        let mut outcome = CollisionOutcome::None;
        for idx in 0..self.pursuers.len() {
            if self.pursuers[idx].position() != self.player.position() {
                continue;
            }
            if self.player.is_powered() && self.player.eat_ghost() {
                self.pursuers[idx].respawn();
                events.push(RuntimeEvent::PursuerEaten {
                    pursuer_id: self.pursuers[idx].id(),
                });
                debug!(pursuer = idx, score = self.player.score(), "pursuer eaten");
                outcome = CollisionOutcome::PursuersEaten;
                continue;
            }

            self.player.lose_life();
            for pursuer in &mut self.pursuers {
                pursuer.respawn();
            }
            events.push(RuntimeEvent::LifeLost {
                lives_left: self.player.lives(),
            });
            debug!(pursuer = idx, lives = self.player.lives(), "life lost");
            return CollisionOutcome::LifeLost;
        }
        outcome
    }

    fn terminal_reason(&self) -> Option<GameOverReason> {
        if !self.maze.has_remaining_items() {
            Some(GameOverReason::Victory)
        } else if self.player.lives() == 0 {
            Some(GameOverReason::OutOfLives)
        } else {
            None
        }
    }

    fn summary(&self, start_lives: u32) -> SessionSummary {
        let stats = self.player.stats();
        SessionSummary {
            reason: self.end_reason.unwrap_or(GameOverReason::OutOfLives),
            difficulty: self.difficulty,
            score: stats.score,
            dots: stats.dots,
            ghosts_eaten: stats.ghosts_eaten,
            pellets: stats.pellets,
            lives_lost: start_lives.saturating_sub(self.player.lives()),
            ticks: self.tick_counter,
            duration_ms: self.elapsed_ms(),
        }
    }
}

/// Single-threaded tick engine. One `tick` call advances exactly one
/// discrete step; nothing blocks.
pub struct SimulationEngine<R = NullRender, S = NullStats> {
    config: EngineConfig,
    state: SessionState,
    session: Option<Session>,
    events: Vec<RuntimeEvent>,
    render: R,
    stats: S,
    collaborator_failures: u64,
}

impl SimulationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_sinks(config, NullRender, NullStats)
    }
}

impl<R: RenderSink, S: StatsSink> SimulationEngine<R, S> {
    pub fn with_sinks(config: EngineConfig, render: R, stats: S) -> Self {
        Self {
            config,
            state: SessionState::Menu,
            session: None,
            events: Vec::new(),
            render,
            stats,
            collaborator_failures: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        self.session.as_ref().map(|session| session.difficulty)
    }

    pub fn profile(&self) -> Option<DifficultyProfile> {
        self.session.as_ref().map(|session| session.profile)
    }

    pub fn tick_count(&self) -> u64 {
        self.session.as_ref().map_or(0, |session| session.tick_counter)
    }

    pub fn maze(&self) -> Option<&GridMaze> {
        self.session.as_ref().map(|session| &session.maze)
    }

    pub fn player(&self) -> Option<&PlayerAgent> {
        self.session.as_ref().map(|session| &session.player)
    }

    pub fn pursuers(&self) -> &[PursuerAgent] {
        self.session
            .as_ref()
            .map(|session| session.pursuers.as_slice())
            .unwrap_or_default()
    }

    pub fn render_sink(&self) -> &R {
        &self.render
    }

    pub fn render_sink_mut(&mut self) -> &mut R {
        &mut self.render
    }

    pub fn stats_sink(&self) -> &S {
        &self.stats
    }

    pub fn stats_sink_mut(&mut self) -> &mut S {
        &mut self.stats
    }

    pub fn collaborator_failures(&self) -> u64 {
        self.collaborator_failures
    }

    pub fn start(&mut self, difficulty: Difficulty) -> Result<(), EngineError> {
        self.require(SessionState::Menu, "start")?;
        self.begin_session(difficulty)
    }

    pub fn restart(&mut self, difficulty: Difficulty) -> Result<(), EngineError> {
        self.require(SessionState::GameOver, "restart")?;
        self.begin_session(difficulty)
    }

    pub fn return_to_menu(&mut self) -> Result<(), StateError> {
        self.require(SessionState::GameOver, "return_to_menu")?;
        self.teardown();
        Ok(())
    }

    /// Drops any session regardless of state.
    pub fn teardown(&mut self) {
        self.session = None;
        self.events.clear();
        self.state = SessionState::Menu;
    }

    pub fn attempt_move(&mut self, dir: Direction) -> Result<MoveOutcome, StateError> {
        self.require(SessionState::Running, "attempt_move")?;
        let state = self.state;
        let Some(session) = self.session.as_mut() else {
            return Err(StateError {
                operation: "attempt_move",
                state,
            });
        };
        if session.pause_ticks > 0 {
            return Ok(MoveOutcome::Paused);
        }

        let outcome = session.player.attempt_move(&mut session.maze, dir);
        if let MoveOutcome::Moved { consumed } = outcome {
            let pos = session.player.position();
            match consumed {
                Tile::Dot => self.events.push(RuntimeEvent::DotEaten { x: pos.x, y: pos.y }),
                Tile::PowerPellet => {
                    self.events.push(RuntimeEvent::PelletTaken { x: pos.x, y: pos.y });
                    debug!(x = pos.x, y = pos.y, "power pellet taken");
                }
                _ => {}
            }
            if consumed.is_item() {
                self.render.draw_tile(Tile::Consumed, pos.x, pos.y);
            }
            self.render.place_agent(AgentId::Player, pos.x, pos.y);
        }
        Ok(outcome)
    }

    pub fn tick(&mut self) -> Result<SessionState, StateError> {
        self.require(SessionState::Running, "tick")?;
        let state = self.state;
        let Some(session) = self.session.as_mut() else {
            return Err(StateError {
                operation: "tick",
                state,
            });
        };

        session.tick_counter += 1;

        if session.player.decay_power() == PowerTransition::Expired {
            self.events.push(RuntimeEvent::PowerExpired);
            debug!(tick = session.tick_counter, "power expired");
        }

        if session.pause_ticks > 0 {
            session.pause_ticks -= 1;
        } else {
            let interval = u64::from(session.profile.pursuer_move_interval.max(1));
            if session.tick_counter % interval == 0 {
                session.move_pursuers();
            }
            if session.resolve_collisions(&mut self.events) == CollisionOutcome::LifeLost {
                session.pause_ticks = self.config.life_loss_pause_ticks;
            }
        }

        sync_agents(&mut self.render, session);

        if let Some(reason) = session.terminal_reason() {
            session.end_reason = Some(reason);
            self.state = SessionState::GameOver;
            self.events.push(RuntimeEvent::SessionEnded { reason });
            let summary = session.summary(self.config.start_lives);
            info!(
                reason = ?reason,
                difficulty = %summary.difficulty,
                score = summary.score,
                ticks = summary.ticks,
                "session ended"
            );
            if let Err(error) = self.stats.record_session(&summary) {
                self.collaborator_failures += 1;
                warn!(%error, "stats collaborator failed to record session");
            }
            return Ok(self.state);
        }

        let status = TickStatus {
            tick: session.tick_counter,
            score: session.player.score(),
            lives: session.player.lives(),
            elapsed_ms: session.elapsed_ms(),
        };
        if let Err(error) = self.stats.record_tick(&status) {
            self.collaborator_failures += 1;
            warn!(%error, tick = status.tick, "stats collaborator failed to record tick");
        }
        Ok(self.state)
    }

    pub fn build_snapshot(&mut self, drain_events: bool) -> Option<Snapshot> {
        let session = self.session.as_ref()?;
        let snapshot = Snapshot {
            tick: session.tick_counter,
            elapsed_ms: session.elapsed_ms(),
            state: self.state,
            difficulty: session.difficulty,
            player: session.player.view(),
            pursuers: session.pursuers.iter().map(PursuerAgent::view).collect(),
            remaining_items: session.maze.remaining_items(),
            pause_ticks: session.pause_ticks,
            events: self.events.clone(),
        };
        if drain_events {
            self.events.clear();
        }
        Some(snapshot)
    }

    /// Available once the session has ended.
    pub fn build_summary(&self) -> Option<SessionSummary> {
        let session = self.session.as_ref()?;
        session.end_reason?;
        Some(session.summary(self.config.start_lives))
    }

    fn begin_session(&mut self, difficulty: Difficulty) -> Result<(), EngineError> {
        let session = Session::build(&self.config, difficulty)?;
        self.events.clear();
        draw_full(&mut self.render, &session);
        info!(
            difficulty = %difficulty,
            pursuers = session.pursuers.len(),
            items = session.maze.remaining_items(),
            "session started"
        );
        self.session = Some(session);
        self.state = SessionState::Running;
        Ok(())
    }

    fn require(&self, expected: SessionState, operation: &'static str) -> Result<(), StateError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.state_error(operation))
        }
    }

    fn state_error(&self, operation: &'static str) -> StateError {
        StateError {
            operation,
            state: self.state,
        }
    }
}

fn draw_full<R: RenderSink>(render: &mut R, session: &Session) {
    for (pos, tile) in session.maze.cells() {
        render.draw_tile(tile, pos.x, pos.y);
    }
    sync_agents(render, session);
}

fn sync_agents<R: RenderSink>(render: &mut R, session: &Session) {
    let player = session.player.position();
    render.place_agent(AgentId::Player, player.x, player.y);
    let power = session.player.power();
    for pursuer in &session.pursuers {
        let id = AgentId::Pursuer(pursuer.id());
        let pos = pursuer.position();
        render.place_agent(id, pos.x, pos.y);
        render.set_power_visual(id, power.is_powered(), power.near_expiry());
    }
}
