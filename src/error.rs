use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Difficulty, SessionState};

/// Fatal problems with layouts or profiles; a session cannot start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("layout has no rows")]
    EmptyLayout,

    #[error("layout is not rectangular: row {row} has {found} cells, expected {expected}")]
    NonRectangular {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("unknown tile code {code} at ({x}, {y})")]
    UnknownTileCode { code: u8, x: usize, y: usize },

    #[error("cannot parse cell '{value}' at row {row}, column {col}")]
    BadCell {
        row: usize,
        col: usize,
        value: String,
    },

    #[error("layout has no player spawn tile")]
    MissingPlayerSpawn,

    #[error("layout has no pursuer spawn tile")]
    MissingPursuerSpawn,

    #[error("profile '{difficulty}' has non-positive {field}")]
    InvalidProfile {
        difficulty: Difficulty,
        field: &'static str,
    },

    #[error("config has non-positive {field}")]
    InvalidSetting { field: &'static str },

    #[error("no layout configured for difficulty '{difficulty}'")]
    MissingLayout { difficulty: Difficulty },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// An engine entry point was called in a session state that does not accept it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("operation '{operation}' is not valid in state '{state}'")]
pub struct StateError {
    pub operation: &'static str,
    pub state: SessionState,
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("stats i/o failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize stats: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    State(#[from] StateError),
}
