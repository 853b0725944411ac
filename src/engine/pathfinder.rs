use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::maze::GridMaze;
use crate::types::Position;

/// Neighbor expansion order: down, right, up, left.
const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FrontierEntry {
    priority: i32,
    seq: u64,
    pos: Position,
}

// Min-heap on (priority, seq): equal priorities pop in push order.
impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* over the 4-connected non-wall cells with unit step cost and the
/// Manhattan heuristic. The returned path excludes `start` and ends at `goal`;
/// it is empty when the goal is unreachable or equal to `start`.
pub fn search(maze: &GridMaze, start: Position, goal: Position) -> Vec<Position> {
    if start == goal || maze.is_wall(goal.x, goal.y) {
        return Vec::new();
    }

    let mut frontier = BinaryHeap::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut cost_so_far: HashMap<Position, i32> = HashMap::new();
    let mut seq = 0u64;

    frontier.push(FrontierEntry {
        priority: 0,
        seq,
        pos: start,
    });
    cost_so_far.insert(start, 0);

    let mut reached = false;
    while let Some(FrontierEntry { priority, pos, .. }) = frontier.pop() {
        if pos == goal {
            reached = true;
            break;
        }
        let current_cost = cost_so_far.get(&pos).copied().unwrap_or(0);
        if priority > current_cost + pos.manhattan(goal) {
            // stale
            continue;
        }

        for (dx, dy) in NEIGHBOR_OFFSETS {
            let next = Position::new(pos.x + dx, pos.y + dy);
            if maze.is_wall(next.x, next.y) {
                continue;
            }
            let new_cost = current_cost + 1;
            let improves = cost_so_far
                .get(&next)
                .map_or(true, |&known| new_cost < known);
            if !improves {
                continue;
            }
            cost_so_far.insert(next, new_cost);
            came_from.insert(next, pos);
            seq += 1;
            frontier.push(FrontierEntry {
                priority: new_cost + next.manhattan(goal),
                seq,
                pos: next,
            });
        }
    }

    if !reached {
        return Vec::new();
    }

    let mut path = Vec::new();
    let mut current = goal;
    while current != start {
        path.push(current);
        match came_from.get(&current) {
            Some(prev) => current = *prev,
            None => return Vec::new(),
        }
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_maze(width: usize, height: usize) -> GridMaze {
        let mut layout = vec![vec![3u8; width]; height];
        layout[0][0] = 4;
        layout[height - 1][width - 1] = 5;
        GridMaze::load(&layout).expect("open maze")
    }

    fn assert_contiguous(start: Position, path: &[Position], maze: &GridMaze) {
        let mut prev = start;
        for step in path {
            assert_eq!(prev.manhattan(*step), 1, "non-adjacent step {prev:?} -> {step:?}");
            assert!(!maze.is_wall(step.x, step.y));
            prev = *step;
        }
    }

    #[test]
    fn open_maze_path_length_is_manhattan() {
        let maze = open_maze(7, 5);
        let cells: Vec<Position> = maze.free_cells().collect();
        for &start in cells.iter().step_by(3) {
            for &goal in cells.iter().step_by(4) {
                let path = search(&maze, start, goal);
                assert_eq!(path.len() as i32, start.manhattan(goal));
                assert_contiguous(start, &path, &maze);
                if start != goal {
                    assert_eq!(path.last(), Some(&goal));
                }
            }
        }
    }

    #[test]
    fn routes_around_walls() {
        let maze = GridMaze::load(&[
            vec![4, 3, 0, 3, 5],
            vec![3, 3, 0, 3, 3],
            vec![3, 3, 3, 3, 3],
        ])
        .expect("walled maze");
        let start = Position::new(0, 0);
        let goal = Position::new(4, 0);
        let path = search(&maze, start, goal);
        assert_eq!(path.len(), 8);
        assert_contiguous(start, &path, &maze);
        assert_eq!(path.last(), Some(&goal));
    }

    #[test]
    fn unreachable_goal_yields_empty_path() {
        let maze = GridMaze::load(&[vec![4, 3, 0, 3, 5]]).expect("split corridor");
        assert!(search(&maze, Position::new(0, 0), Position::new(4, 0)).is_empty());
        assert!(search(&maze, Position::new(0, 0), Position::new(2, 0)).is_empty());
        assert!(search(&maze, Position::new(0, 0), Position::new(-3, 0)).is_empty());
    }

    #[test]
    fn start_equal_goal_is_empty() {
        let maze = open_maze(3, 3);
        assert!(search(&maze, Position::new(1, 1), Position::new(1, 1)).is_empty());
    }

    #[test]
    fn ties_resolve_by_discovery_order() {
        // Both the down-first and right-first routes are optimal; the first
        // neighbor discovered (down) wins.
        let maze = open_maze(3, 3);
        let path = search(&maze, Position::new(0, 0), Position::new(1, 1));
        assert_eq!(path, vec![Position::new(0, 1), Position::new(1, 1)]);

        let again = search(&maze, Position::new(0, 0), Position::new(1, 1));
        assert_eq!(path, again);
    }
}
