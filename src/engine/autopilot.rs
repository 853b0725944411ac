use std::collections::{HashMap, VecDeque};

use crate::maze::GridMaze;
use crate::rng::Rng;
use crate::types::{Direction, Position};

use super::pathfinder;
use super::player::PlayerAgent;
use super::pursuer::PursuerAgent;

const DANGER_RADIUS: i32 = 2;
const WANDER_CHANCE: f32 = 0.05;

/// Scripted player used by the headless runner.
#[derive(Clone, Debug)]
pub struct Autopilot {
    rng: Rng,
}

impl Autopilot {
    pub fn new(seed: u32) -> Self {
        Self { rng: Rng::new(seed) }
    }

    pub fn choose(
        &mut self,
        maze: &GridMaze,
        player: &PlayerAgent,
        pursuers: &[PursuerAgent],
    ) -> Direction {
        let pos = player.position();
        let open = walkable_directions(maze, pos);
        if open.is_empty() {
            return Direction::None;
        }

        if player.is_powered() {
            if let Some(dir) = choose_chase_direction(maze, pos, pursuers) {
                return dir;
            }
        } else if distance_to_nearest_pursuer(pos, pursuers).unwrap_or(i32::MAX) <= DANGER_RADIUS {
            return self.choose_escape_direction(maze, pos, pursuers, &open);
        }

        if self.rng.bool(WANDER_CHANCE) {
            return self.rng.pick_direction(&open);
        }

        match first_step_to_nearest_item(maze, pos) {
            Some(step) => {
                let risky = !player.is_powered()
                    && distance_to_nearest_pursuer(step, pursuers).unwrap_or(i32::MAX) <= 1;
                if risky {
                    self.choose_escape_direction(maze, pos, pursuers, &open)
                } else {
                    direction_between(pos, step)
                }
            }
            None => self.rng.pick_direction(&open),
        }
    }

    fn choose_escape_direction(
        &mut self,
        maze: &GridMaze,
        pos: Position,
        pursuers: &[PursuerAgent],
        open: &[Direction],
    ) -> Direction {
        let mut best = Direction::None;
        let mut best_score = f32::NEG_INFINITY;
        for &dir in open {
            let next = pos.step(dir);
            let dist = distance_to_nearest_pursuer(next, pursuers).unwrap_or(99);
            // Dead ends are traps.
            let exits = walkable_directions(maze, next).len() as f32;
            let score = dist as f32 + exits * 0.2 + self.rng.next_f32() * 0.1;
            if score > best_score {
                best_score = score;
                best = dir;
            }
        }
        best
    }
}

fn choose_chase_direction(
    maze: &GridMaze,
    pos: Position,
    pursuers: &[PursuerAgent],
) -> Option<Direction> {
    let nearest = pursuers
        .iter()
        .min_by_key(|pursuer| pursuer.position().manhattan(pos))?;
    let path = pathfinder::search(maze, pos, nearest.position());
    path.first().map(|step| direction_between(pos, *step))
}

fn walkable_directions(maze: &GridMaze, pos: Position) -> Vec<Direction> {
    Direction::CARDINAL
        .into_iter()
        .filter(|dir| {
            let next = pos.step(*dir);
            !maze.is_wall(next.x, next.y)
        })
        .collect()
}

fn distance_to_nearest_pursuer(pos: Position, pursuers: &[PursuerAgent]) -> Option<i32> {
    pursuers
        .iter()
        .map(|pursuer| pursuer.position().manhattan(pos))
        .min()
}

fn direction_between(from: Position, to: Position) -> Direction {
    Direction::CARDINAL
        .into_iter()
        .find(|dir| from.step(*dir) == to)
        .unwrap_or(Direction::None)
}

/// Breadth-first search to the closest remaining item; returns the first
/// cell to step onto.
fn first_step_to_nearest_item(maze: &GridMaze, from: Position) -> Option<Position> {
    let mut queue = VecDeque::from([from]);
    let mut parents: HashMap<Position, Position> = HashMap::new();
    parents.insert(from, from);

    while let Some(current) = queue.pop_front() {
        if current != from && maze.tile(current.x, current.y).is_item() {
            let mut step = current;
            while let Some(&parent) = parents.get(&step) {
                if parent == from {
                    return Some(step);
                }
                step = parent;
            }
            return None;
        }
        for dir in Direction::CARDINAL {
            let next = current.step(dir);
            if maze.is_wall(next.x, next.y) || parents.contains_key(&next) {
                continue;
            }
            parents.insert(next, current);
            queue.push_back(next);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::pursuer::spawn_pursuers;

    #[test]
    fn walks_toward_nearest_item() {
        let maze = GridMaze::load(&[
            vec![0, 0, 0, 0, 0, 0, 0],
            vec![0, 3, 3, 4, 3, 1, 0],
            vec![0, 0, 0, 0, 0, 0, 0],
            vec![5, 0, 0, 0, 0, 0, 0],
        ])
        .expect("maze");
        assert_eq!(
            first_step_to_nearest_item(&maze, maze.player_spawn()),
            Some(Position::new(4, 1))
        );
    }

    #[test]
    fn no_items_means_no_step() {
        let maze = GridMaze::load(&[vec![4, 3, 3, 5]]).expect("maze");
        assert_eq!(first_step_to_nearest_item(&maze, maze.player_spawn()), None);
    }

    #[test]
    fn escapes_from_adjacent_pursuer() {
        let maze = GridMaze::load(&[vec![3, 4, 5, 1]]).expect("maze");
        let player = PlayerAgent::new(maze.player_spawn(), 3, 10);
        let pursuers = spawn_pursuers(&maze, 1);
        let mut pilot = Autopilot::new(5);
        for _ in 0..20 {
            assert_eq!(pilot.choose(&maze, &player, &pursuers), Direction::Left);
        }
    }

    #[test]
    fn chases_when_powered() {
        let maze = GridMaze::load(&[vec![3, 4, 3, 3, 5]]).expect("maze");
        let mut player = PlayerAgent::new(maze.player_spawn(), 3, 10);
        player.power_up();
        let pursuers = spawn_pursuers(&maze, 1);
        let mut pilot = Autopilot::new(5);
        assert_eq!(pilot.choose(&maze, &player, &pursuers), Direction::Right);
    }

    #[test]
    fn boxed_in_player_stays() {
        let maze = GridMaze::load(&[vec![4, 0, 5]]).expect("maze");
        let player = PlayerAgent::new(maze.player_spawn(), 3, 10);
        let mut pilot = Autopilot::new(1);
        assert_eq!(pilot.choose(&maze, &player, &[]), Direction::None);
    }
}
