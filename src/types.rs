use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    pub const CARDINAL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" | "w" => Some(Self::Up),
            "down" | "s" => Some(Self::Down),
            "left" | "a" => Some(Self::Left),
            "right" | "d" => Some(Self::Right),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::None => (0, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "normal" => Some(Self::Normal),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Semantic kind of one maze cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tile {
    Wall,
    Empty,
    Dot,
    PowerPellet,
    Consumed,
    PlayerSpawn,
    PursuerSpawn,
}

impl Tile {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Tile::Wall),
            1 => Some(Tile::Dot),
            2 => Some(Tile::PowerPellet),
            3 => Some(Tile::Empty),
            4 => Some(Tile::PlayerSpawn),
            5 => Some(Tile::PursuerSpawn),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Tile::Wall => 0,
            Tile::Dot => 1,
            Tile::PowerPellet => 2,
            Tile::Empty | Tile::Consumed => 3,
            Tile::PlayerSpawn => 4,
            Tile::PursuerSpawn => 5,
        }
    }

    pub fn is_item(self) -> bool {
        matches!(self, Tile::Dot | Tile::PowerPellet)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn manhattan(self, other: Position) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    Normal,
    Powered,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Menu,
    Running,
    GameOver,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SessionState::Menu => "menu",
            SessionState::Running => "running",
            SessionState::GameOver => "game_over",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    Victory,
    OutOfLives,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PursuerColor {
    Red,
    Cyan,
    Orange,
    Pink,
}

impl PursuerColor {
    pub fn for_index(index: usize) -> Self {
        match index % 4 {
            0 => PursuerColor::Red,
            1 => PursuerColor::Cyan,
            2 => PursuerColor::Orange,
            _ => PursuerColor::Pink,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum AgentId {
    Player,
    Pursuer(usize),
}

/// Read-only per-session tuning selected at start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    #[serde(rename = "pursuerCount")]
    pub pursuer_count: u32,
    #[serde(rename = "pursuerMoveInterval")]
    pub pursuer_move_interval: u32,
    #[serde(rename = "powerDuration")]
    pub power_duration: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub x: i32,
    pub y: i32,
    pub lives: u32,
    pub score: u32,
    #[serde(rename = "dotsCollected")]
    pub dots_collected: u32,
    #[serde(rename = "powerPelletsCollected")]
    pub power_pellets_collected: u32,
    #[serde(rename = "ghostsEaten")]
    pub ghosts_eaten: u32,
    #[serde(rename = "powerState")]
    pub power_state: PowerState,
    #[serde(rename = "powerTimer")]
    pub power_timer: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct PursuerView {
    pub id: usize,
    pub x: i32,
    pub y: i32,
    pub color: PursuerColor,
    #[serde(rename = "homeX")]
    pub home_x: i32,
    #[serde(rename = "homeY")]
    pub home_y: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    DotEaten {
        x: i32,
        y: i32,
    },
    PelletTaken {
        x: i32,
        y: i32,
    },
    PowerExpired,
    PursuerEaten {
        #[serde(rename = "pursuerId")]
        pursuer_id: usize,
    },
    LifeLost {
        #[serde(rename = "livesLeft")]
        lives_left: u32,
    },
    SessionEnded {
        reason: GameOverReason,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub state: SessionState,
    pub difficulty: Difficulty,
    pub player: PlayerView,
    pub pursuers: Vec<PursuerView>,
    #[serde(rename = "remainingItems")]
    pub remaining_items: usize,
    #[serde(rename = "pauseTicks")]
    pub pause_ticks: u32,
    pub events: Vec<RuntimeEvent>,
}

/// Per-tick status handed to the stats collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickStatus {
    pub tick: u64,
    pub score: u32,
    pub lives: u32,
    #[serde(rename = "elapsedMs", alias = "elapsed_ms")]
    pub elapsed_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub reason: GameOverReason,
    pub difficulty: Difficulty,
    pub score: u32,
    pub dots: u32,
    #[serde(rename = "ghostsEaten")]
    pub ghosts_eaten: u32,
    pub pellets: u32,
    #[serde(rename = "livesLost")]
    pub lives_lost: u32,
    pub ticks: u64,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_codes_follow_layout_table() {
        for code in 0..=5u8 {
            let tile = Tile::from_code(code).expect("known code");
            assert_eq!(tile.code(), code);
        }
        assert_eq!(Tile::Consumed.code(), 3);
        assert_eq!(Tile::from_code(6), None);
    }

    #[test]
    fn difficulty_parse_is_case_insensitive() {
        assert_eq!(Difficulty::parse(" Hard "), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse("nightmare"), None);
    }

    #[test]
    fn runtime_event_serializes_with_type_tag() {
        let text = serde_json::to_string(&RuntimeEvent::LifeLost { lives_left: 2 })
            .expect("event should serialize");
        assert_eq!(text, r#"{"type":"life_lost","livesLeft":2}"#);
    }
}
