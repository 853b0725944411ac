use crate::error::ConfigError;
use crate::types::{Difficulty, Position, Tile};

const EASY_LAYOUT: [[u8; 18]; 10] = [
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 4, 1, 1, 1, 1, 1, 1, 2, 5, 1, 1, 1, 1, 1, 1, 1, 0],
    [0, 1, 0, 0, 1, 0, 1, 0, 1, 0, 0, 1, 0, 0, 1, 2, 1, 0],
    [0, 1, 0, 0, 1, 0, 1, 0, 1, 0, 0, 1, 0, 0, 1, 1, 1, 0],
    [0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 1, 0, 0, 0],
    [0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 0],
    [0, 1, 1, 1, 1, 1, 1, 1, 1, 0, 1, 0, 0, 1, 1, 1, 0, 0],
    [0, 5, 0, 0, 1, 0, 1, 1, 1, 1, 1, 0, 0, 0, 0, 1, 0, 0],
    [0, 2, 1, 1, 1, 0, 0, 1, 1, 2, 1, 1, 1, 1, 1, 1, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
];

const NORMAL_LAYOUT: [[u8; 18]; 10] = [
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 4, 1, 1, 1, 2, 1, 1, 1, 0, 1, 1, 1, 5, 2, 1, 1, 0],
    [0, 1, 0, 0, 1, 0, 1, 0, 1, 1, 1, 0, 1, 0, 1, 1, 1, 0],
    [0, 1, 0, 1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 0, 0, 0, 1, 0],
    [0, 1, 1, 1, 0, 0, 1, 0, 1, 0, 0, 0, 1, 1, 0, 1, 0, 0],
    [0, 0, 0, 1, 0, 1, 1, 0, 1, 1, 1, 1, 0, 1, 1, 1, 0, 0],
    [0, 1, 1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 0, 1, 1, 1, 0],
    [0, 1, 0, 0, 0, 0, 1, 0, 5, 0, 0, 0, 1, 1, 0, 0, 1, 0],
    [0, 2, 1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 2, 1, 1, 1, 1, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
];

const HARD_LAYOUT: [[u8; 20]; 10] = [
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 4, 1, 2, 1, 0, 1, 1, 1, 0, 1, 1, 1, 2, 5, 1, 1, 0, 1, 0],
    [0, 1, 0, 0, 1, 0, 1, 0, 1, 0, 1, 1, 0, 0, 0, 0, 1, 1, 1, 0],
    [0, 1, 0, 5, 1, 1, 1, 0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1, 0],
    [0, 1, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 0, 1, 1, 1, 0],
    [0, 0, 0, 0, 1, 0, 1, 1, 1, 1, 0, 1, 0, 1, 0, 0, 1, 0, 1, 0],
    [0, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 4, 0, 0, 0, 1, 0, 1, 0],
    [0, 1, 0, 0, 0, 0, 1, 0, 5, 0, 0, 0, 1, 1, 0, 1, 0, 0, 1, 0],
    [0, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 1, 1, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
];

/// Tile-code matrix of the layout shipped for `difficulty`.
pub fn builtin_layout(difficulty: Difficulty) -> Vec<Vec<u8>> {
    match difficulty {
        Difficulty::Easy => EASY_LAYOUT.iter().map(|row| row.to_vec()).collect(),
        Difficulty::Normal => NORMAL_LAYOUT.iter().map(|row| row.to_vec()).collect(),
        Difficulty::Hard => HARD_LAYOUT.iter().map(|row| row.to_vec()).collect(),
    }
}

/// Rectangular tile grid. The shape never changes after `load`; only items
/// flip to `Consumed`.
#[derive(Clone, Debug)]
pub struct GridMaze {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    player_spawn: Position,
    pursuer_spawns: Vec<Position>,
}

impl GridMaze {
    pub fn load(layout: &[Vec<u8>]) -> Result<Self, ConfigError> {
        let first = layout.first().ok_or(ConfigError::EmptyLayout)?;
        let width = first.len();
        let mut tiles = Vec::with_capacity(width * layout.len());
        let mut player_spawn = None;
        let mut pursuer_spawns = Vec::new();

        for (y, row) in layout.iter().enumerate() {
            if row.len() != width {
                return Err(ConfigError::NonRectangular {
                    row: y,
                    expected: width,
                    found: row.len(),
                });
            }
            for (x, &code) in row.iter().enumerate() {
                let tile = Tile::from_code(code).ok_or(ConfigError::UnknownTileCode { code, x, y })?;
                let pos = Position::new(x as i32, y as i32);
                match tile {
                    Tile::PlayerSpawn if player_spawn.is_none() => player_spawn = Some(pos),
                    Tile::PursuerSpawn => pursuer_spawns.push(pos),
                    _ => {}
                }
                tiles.push(tile);
            }
        }

        let player_spawn = player_spawn.ok_or(ConfigError::MissingPlayerSpawn)?;
        if pursuer_spawns.is_empty() {
            return Err(ConfigError::MissingPursuerSpawn);
        }

        Ok(Self {
            width: width as i32,
            height: layout.len() as i32,
            tiles,
            player_spawn,
            pursuer_spawns,
        })
    }

    /// Parses comma-separated rows of tile codes, one row per line.
    pub fn parse_csv(text: &str) -> Result<Self, ConfigError> {
        Self::load(&parse_csv_codes(text)?)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn player_spawn(&self) -> Position {
        self.player_spawn
    }

    pub fn pursuer_spawns(&self) -> &[Position] {
        &self.pursuer_spawns
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    /// Off-grid cells read as walls.
    pub fn tile(&self, x: i32, y: i32) -> Tile {
        match self.index_of(x, y) {
            Some(idx) => self.tiles[idx],
            None => Tile::Wall,
        }
    }

    pub fn is_wall(&self, x: i32, y: i32) -> bool {
        self.tile(x, y) == Tile::Wall
    }

    /// Flips an item to `Consumed` and returns what it was; anything else
    /// yields `Tile::Empty` and leaves the cell alone.
    pub fn consume(&mut self, x: i32, y: i32) -> Tile {
        let Some(idx) = self.index_of(x, y) else {
            return Tile::Empty;
        };
        let previous = self.tiles[idx];
        if !previous.is_item() {
            return Tile::Empty;
        }
        self.tiles[idx] = Tile::Consumed;
        previous
    }

    pub fn has_remaining_items(&self) -> bool {
        self.tiles.iter().any(|tile| tile.is_item())
    }

    pub fn remaining_items(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.is_item()).count()
    }

    /// Non-wall cells in row-major order.
    pub fn free_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.tiles.iter().enumerate().filter_map(|(idx, tile)| {
            if *tile == Tile::Wall {
                None
            } else {
                Some(self.position_of(idx))
            }
        })
    }

    /// Item cells in row-major order.
    pub fn item_cells(&self) -> impl Iterator<Item = (Position, Tile)> + '_ {
        self.tiles.iter().enumerate().filter_map(|(idx, tile)| {
            if tile.is_item() {
                Some((self.position_of(idx), *tile))
            } else {
                None
            }
        })
    }

    /// Every cell with its tile in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (Position, Tile)> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .map(|(idx, tile)| (self.position_of(idx), *tile))
    }

    pub fn tile_codes(&self) -> Vec<Vec<u8>> {
        self.tiles
            .chunks(self.width.max(1) as usize)
            .map(|row| row.iter().map(|tile| tile.code()).collect())
            .collect()
    }

    fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    fn position_of(&self, idx: usize) -> Position {
        let width = self.width.max(1) as usize;
        Position::new((idx % width) as i32, (idx / width) as i32)
    }
}

pub fn parse_csv_codes(text: &str) -> Result<Vec<Vec<u8>>, ConfigError> {
    let mut rows = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let row_idx = rows.len();
        let mut row = Vec::new();
        for (col, cell) in trimmed.split(',').enumerate() {
            let value = cell.trim();
            let code = value.parse::<u8>().map_err(|_| ConfigError::BadCell {
                row: row_idx,
                col,
                value: value.to_string(),
            })?;
            row.push(code);
        }
        rows.push(row);
    }
    Ok(rows)
}
