use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::constants::{get_difficulty_profile, LIFE_LOSS_PAUSE_TICKS, START_LIVES};
use crate::error::ConfigError;
use crate::maze::{builtin_layout, GridMaze};
use crate::types::{Difficulty, DifficultyProfile};

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub start_lives: u32,
    pub life_loss_pause_ticks: u32,
    pub profiles: BTreeMap<Difficulty, DifficultyProfile>,
    pub layouts: BTreeMap<Difficulty, Vec<Vec<u8>>>,
}

/// On-disk shape; every key is optional and overrides the default.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EngineConfigFile {
    start_lives: Option<u32>,
    life_loss_pause_ticks: Option<u32>,
    #[serde(default)]
    profiles: BTreeMap<Difficulty, DifficultyProfile>,
    #[serde(default)]
    layouts: BTreeMap<Difficulty, Vec<Vec<u8>>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            start_lives: START_LIVES,
            life_loss_pause_ticks: LIFE_LOSS_PAUSE_TICKS,
            profiles: Difficulty::ALL
                .into_iter()
                .map(|difficulty| (difficulty, get_difficulty_profile(difficulty)))
                .collect(),
            layouts: Difficulty::ALL
                .into_iter()
                .map(|difficulty| (difficulty, builtin_layout(difficulty)))
                .collect(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: EngineConfigFile =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::default().merged(file);
        config.validate()?;
        Ok(config)
    }

    fn merged(mut self, file: EngineConfigFile) -> Self {
        if let Some(lives) = file.start_lives {
            self.start_lives = lives;
        }
        if let Some(ticks) = file.life_loss_pause_ticks {
            self.life_loss_pause_ticks = ticks;
        }
        self.profiles.extend(file.profiles);
        self.layouts.extend(file.layouts);
        self
    }

    pub fn with_layout(mut self, difficulty: Difficulty, layout: Vec<Vec<u8>>) -> Self {
        self.layouts.insert(difficulty, layout);
        self
    }

    pub fn with_profile(mut self, difficulty: Difficulty, profile: DifficultyProfile) -> Self {
        self.profiles.insert(difficulty, profile);
        self
    }

    pub fn profile(&self, difficulty: Difficulty) -> Result<DifficultyProfile, ConfigError> {
        let profile = self
            .profiles
            .get(&difficulty)
            .copied()
            .unwrap_or_else(|| get_difficulty_profile(difficulty));
        validate_profile(difficulty, &profile)?;
        Ok(profile)
    }

    pub fn layout(&self, difficulty: Difficulty) -> Result<&[Vec<u8>], ConfigError> {
        self.layouts
            .get(&difficulty)
            .map(Vec::as_slice)
            .ok_or(ConfigError::MissingLayout { difficulty })
    }

    /// A session needs at least one life to play.
    pub fn lives(&self) -> Result<u32, ConfigError> {
        if self.start_lives == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "startLives",
            });
        }
        Ok(self.start_lives)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lives()?;
        for difficulty in Difficulty::ALL {
            self.profile(difficulty)?;
            GridMaze::load(self.layout(difficulty)?)?;
        }
        Ok(())
    }
}

fn validate_profile(difficulty: Difficulty, profile: &DifficultyProfile) -> Result<(), ConfigError> {
    let field = if profile.pursuer_count == 0 {
        "pursuerCount"
    } else if profile.pursuer_move_interval == 0 {
        "pursuerMoveInterval"
    } else if profile.power_duration == 0 {
        "powerDuration"
    } else {
        return Ok(());
    };
    Err(ConfigError::InvalidProfile { difficulty, field })
}
