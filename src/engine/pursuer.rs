use crate::maze::GridMaze;
use crate::types::{Position, PursuerColor, PursuerView};

use super::pathfinder;

#[derive(Clone, Debug)]
pub struct PursuerAgent {
    id: usize,
    position: Position,
    home: Position,
    color: PursuerColor,
}

impl PursuerAgent {
    pub fn new(id: usize, home: Position) -> Self {
        Self {
            id,
            position: home,
            home,
            color: PursuerColor::for_index(id),
        }
    }

    /// Advances at most one cell along a freshly computed path. Returns
    /// whether the pursuer changed cells.
    pub fn move_toward(&mut self, maze: &GridMaze, player_pos: Position, powered: bool) -> bool {
        let Some(target) = select_target(maze, player_pos, powered) else {
            return false;
        };
        let path = pathfinder::search(maze, self.position, target);
        match path.first() {
            Some(next) => {
                self.position = *next;
                true
            }
            None => false,
        }
    }

    pub fn respawn(&mut self) {
        self.position = self.home;
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn home(&self) -> Position {
        self.home
    }

    pub fn color(&self) -> PursuerColor {
        self.color
    }

    pub fn view(&self) -> PursuerView {
        PursuerView {
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            color: self.color,
            home_x: self.home.x,
            home_y: self.home.y,
        }
    }

    #[cfg(test)]
    pub(super) fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}

/// Pursue the player normally; while the player is powered, flee to the
/// farthest free cell.
pub fn select_target(maze: &GridMaze, player_pos: Position, powered: bool) -> Option<Position> {
    if powered {
        farthest_free_cell(maze, player_pos)
    } else {
        Some(player_pos)
    }
}

/// First non-wall cell in row-major order with the largest Manhattan
/// distance from `from`.
pub fn farthest_free_cell(maze: &GridMaze, from: Position) -> Option<Position> {
    let mut best: Option<(i32, Position)> = None;
    for cell in maze.free_cells() {
        let distance = cell.manhattan(from);
        match best {
            Some((best_distance, _)) if distance <= best_distance => {}
            _ => best = Some((distance, cell)),
        }
    }
    best.map(|(_, cell)| cell)
}

/// Home spawns are handed out cyclically when there are more pursuers than
/// spawn points.
pub fn spawn_pursuers(maze: &GridMaze, count: usize) -> Vec<PursuerAgent> {
    let spawns = maze.pursuer_spawns();
    if spawns.is_empty() {
        return Vec::new();
    }
    (0..count)
        .map(|idx| PursuerAgent::new(idx, spawns[idx % spawns.len()]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::builtin_layout;
    use crate::types::Difficulty;

    #[test]
    fn chases_player_one_step_per_move() {
        let maze = GridMaze::load(&[vec![4, 1, 1, 1, 5]]).expect("corridor");
        let mut pursuer = spawn_pursuers(&maze, 1).remove(0);
        assert!(pursuer.move_toward(&maze, Position::new(0, 0), false));
        assert_eq!(pursuer.position(), Position::new(3, 0));
        assert!(pursuer.move_toward(&maze, Position::new(0, 0), false));
        assert_eq!(pursuer.position(), Position::new(2, 0));
    }

    #[test]
    fn holds_when_target_unreachable() {
        let maze = GridMaze::load(&[vec![4, 1, 0, 1, 5]]).expect("split corridor");
        let mut pursuer = spawn_pursuers(&maze, 1).remove(0);
        assert!(!pursuer.move_toward(&maze, Position::new(0, 0), false));
        assert_eq!(pursuer.position(), Position::new(4, 0));
    }

    #[test]
    fn holds_when_already_on_target() {
        let maze = GridMaze::load(&[vec![4, 1, 5]]).expect("corridor");
        let mut pursuer = spawn_pursuers(&maze, 1).remove(0);
        assert!(!pursuer.move_toward(&maze, Position::new(2, 0), false));
    }

    #[test]
    fn flees_toward_farthest_cell_when_powered() {
        let maze = GridMaze::load(&[vec![4, 1, 5, 1, 1]]).expect("corridor");
        let mut pursuer = spawn_pursuers(&maze, 1).remove(0);
        assert!(pursuer.move_toward(&maze, Position::new(1, 0), true));
        assert_eq!(pursuer.position(), Position::new(3, 0));
    }

    #[test]
    fn farthest_cell_is_maximal_and_first_in_scan_order() {
        let maze = GridMaze::load(&builtin_layout(Difficulty::Normal)).expect("normal");
        for from in maze.free_cells() {
            let chosen = farthest_free_cell(&maze, from).expect("some free cell");
            assert!(!maze.is_wall(chosen.x, chosen.y));
            let best = maze
                .free_cells()
                .map(|cell| cell.manhattan(from))
                .max()
                .expect("max");
            assert_eq!(chosen.manhattan(from), best);
            let first = maze
                .free_cells()
                .find(|cell| cell.manhattan(from) == best)
                .expect("first max");
            assert_eq!(chosen, first);
        }
    }

    #[test]
    fn farthest_cell_ties_pick_row_major_first() {
        let maze = GridMaze::load(&[vec![5, 3, 3], vec![3, 4, 3], vec![3, 3, 3]]).expect("open");
        assert_eq!(
            farthest_free_cell(&maze, Position::new(1, 1)),
            Some(Position::new(0, 0))
        );
    }

    #[test]
    fn spawns_cycle_through_spawn_points() {
        let maze = GridMaze::load(&builtin_layout(Difficulty::Easy)).expect("easy");
        let pursuers = spawn_pursuers(&maze, 5);
        assert_eq!(pursuers.len(), 5);
        assert_eq!(pursuers[0].home(), pursuers[2].home());
        assert_eq!(pursuers[1].home(), pursuers[3].home());
        assert_ne!(pursuers[0].home(), pursuers[1].home());
        assert_eq!(pursuers[4].color(), PursuerColor::Red);
    }

    #[test]
    fn respawn_returns_home() {
        let maze = GridMaze::load(&[vec![4, 1, 5]]).expect("corridor");
        let mut pursuer = spawn_pursuers(&maze, 1).remove(0);
        pursuer.set_position(Position::new(1, 0));
        pursuer.respawn();
        assert_eq!(pursuer.position(), pursuer.home());
    }
}
