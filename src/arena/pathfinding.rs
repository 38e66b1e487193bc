//! A* pathfinding over the battle grid
//!
//! 4-connected cells, Manhattan heuristic. Routes are biased toward the
//! named crossing points: once a route has to cross the diagonal barrier,
//! stepping onto a crossing cell is cheap (0.5) and stepping anywhere else
//! is expensive (2.0), so paths funnel through the designated corridors
//! without making them mandatory.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};

use crate::arena::terrain::Terrain;
use crate::core::types::{GridPos, GRID_SIZE};

/// Cost of stepping onto a crossing cell
const CROSSING_STEP_COST: f32 = 0.5;

/// Cost of a non-crossing step while the route needs to cross the barrier
const DETOUR_STEP_COST: f32 = 2.0;

/// Ordinary step cost
const BASE_STEP_COST: f32 = 1.0;

/// Node in the A* open set
#[derive(Debug, Clone)]
struct PathNode {
    pos: GridPos,
    f_cost: f32, // g_cost + heuristic
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Which side of the main diagonal (x = y) a cell sits on
fn main_diag_side(pos: &GridPos) -> i32 {
    (pos.x - pos.y).signum()
}

/// Which side of the anti-diagonal (x + y = N - 1) a cell sits on
fn anti_diag_side(pos: &GridPos) -> i32 {
    (pos.x + pos.y - (GRID_SIZE - 1)).signum()
}

/// True when start and goal lie on opposite sides of either barrier
/// diagonal, i.e. the route has to cross the center line somewhere.
fn needs_crossing(start: &GridPos, goal: &GridPos) -> bool {
    let main_differs = {
        let (a, b) = (main_diag_side(start), main_diag_side(goal));
        a != 0 && b != 0 && a != b
    };
    let anti_differs = {
        let (a, b) = (anti_diag_side(start), anti_diag_side(goal));
        a != 0 && b != 0 && a != b
    };
    main_differs || anti_differs
}

/// Find a path from `start` to `goal`.
///
/// Returns the ordered cells to step through, excluding `start`. An empty
/// path means hold position (goal unreachable, or already there), never
/// an error. `blocked` cells (occupied by other units) are impassable
/// except for the goal itself, so a unit can still path onto a contested
/// destination.
pub fn find_path(
    terrain: &Terrain,
    start: GridPos,
    goal: GridPos,
    blocked: Option<&AHashSet<GridPos>>,
) -> Vec<GridPos> {
    if start == goal || !goal.in_bounds() {
        return Vec::new();
    }

    let crossing_needed = needs_crossing(&start, &goal);

    let mut open_set = BinaryHeap::new();
    let mut came_from: AHashMap<GridPos, GridPos> = AHashMap::new();
    let mut g_scores: AHashMap<GridPos, f32> = AHashMap::new();

    // Heuristic scaled by the cheapest step so it never overestimates
    let heuristic = |pos: &GridPos| pos.manhattan(&goal) as f32 * CROSSING_STEP_COST;

    g_scores.insert(start, 0.0);
    open_set.push(PathNode {
        pos: start,
        f_cost: heuristic(&start),
    });

    while let Some(current) = open_set.pop() {
        if current.pos == goal {
            return reconstruct_path(&came_from, current.pos, start);
        }

        let current_g = *g_scores.get(&current.pos).unwrap_or(&f32::INFINITY);

        for neighbor in current.pos.neighbors() {
            if !neighbor.in_bounds() {
                continue;
            }
            // The goal cell itself is always enterable; everything else
            // respects terrain and current occupancy.
            if neighbor != goal {
                if terrain.is_obstacle(&neighbor) {
                    continue;
                }
                if blocked.is_some_and(|b| b.contains(&neighbor)) {
                    continue;
                }
            }

            let step_cost = if terrain.is_crossing(&neighbor) {
                CROSSING_STEP_COST
            } else if crossing_needed {
                DETOUR_STEP_COST
            } else {
                BASE_STEP_COST
            };

            let tentative_g = current_g + step_cost;
            let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&f32::INFINITY);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.pos);
                g_scores.insert(neighbor, tentative_g);
                open_set.push(PathNode {
                    pos: neighbor,
                    f_cost: tentative_g + heuristic(&neighbor),
                });
            }
        }
    }

    Vec::new() // No path: caller holds position
}

/// Reconstruct path from came_from map, excluding the start cell
fn reconstruct_path(
    came_from: &AHashMap<GridPos, GridPos>,
    mut current: GridPos,
    start: GridPos,
) -> Vec<GridPos> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_connected(start: GridPos, path: &[GridPos]) {
        let mut prev = start;
        for cell in path {
            assert_eq!(prev.manhattan(cell), 1, "path not 4-connected at {cell:?}");
            prev = *cell;
        }
    }

    #[test]
    fn test_straight_line_within_quadrant() {
        let terrain = Terrain::generate();
        let start = GridPos::new(20, 2);
        let goal = GridPos::new(20, 8);

        let path = find_path(&terrain, start, goal, None);
        assert!(!path.is_empty());
        assert_connected(start, &path);
        assert_eq!(path.last(), Some(&goal));
        assert_eq!(path.len(), 6);
    }

    #[test]
    fn test_same_start_goal_is_hold() {
        let terrain = Terrain::generate();
        let start = GridPos::new(5, 10);
        assert!(find_path(&terrain, start, start, None).is_empty());
    }

    #[test]
    fn test_path_avoids_barrier() {
        let terrain = Terrain::generate();
        let start = GridPos::new(20, 2);
        let goal = GridPos::new(20, 37);

        let path = find_path(&terrain, start, goal, None);
        assert!(!path.is_empty());
        assert_connected(start, &path);
        for cell in &path {
            assert!(!terrain.is_obstacle(cell), "path enters barrier at {cell:?}");
        }
    }

    #[test]
    fn test_corner_to_corner_routes_through_crossing() {
        // (2,2) -> (37,37) has to cross the anti-diagonal; the cost bias
        // must pull it through a named crossing footprint.
        let terrain = Terrain::generate();
        let start = GridPos::new(2, 2);
        let goal = GridPos::new(37, 37);

        let path = find_path(&terrain, start, goal, None);
        assert!(!path.is_empty());
        assert_connected(start, &path);
        assert!(
            path.iter().any(|c| terrain.is_crossing(c)),
            "path should visit a crossing cell: {path:?}"
        );
    }

    #[test]
    fn test_blocked_cells_are_impassable() {
        let terrain = Terrain::generate();
        let start = GridPos::new(2, 10);
        let goal = GridPos::new(8, 10);

        // Wall off the direct row
        let mut blocked = AHashSet::new();
        for y in 8..=12 {
            blocked.insert(GridPos::new(5, y));
        }

        let path = find_path(&terrain, start, goal, Some(&blocked));
        assert!(!path.is_empty());
        for cell in &path {
            assert!(!blocked.contains(cell));
        }
    }

    #[test]
    fn test_goal_enterable_even_when_blocked() {
        let terrain = Terrain::generate();
        let start = GridPos::new(2, 10);
        let goal = GridPos::new(4, 10);

        let mut blocked = AHashSet::new();
        blocked.insert(goal);

        let path = find_path(&terrain, start, goal, Some(&blocked));
        assert_eq!(path.last(), Some(&goal));
    }

    #[test]
    fn test_enclosed_goal_returns_empty() {
        let terrain = Terrain::generate();
        let start = GridPos::new(2, 10);
        let goal = GridPos::new(30, 5);

        // Seal the goal in with occupied cells
        let mut blocked = AHashSet::new();
        for n in goal.neighbors() {
            blocked.insert(n);
        }
        // And the diagonal corners, so no 4-connected approach remains
        for (dx, dy) in [(-1, -1), (-1, 1), (1, -1), (1, 1)] {
            blocked.insert(GridPos::new(goal.x + dx, goal.y + dy));
        }

        let path = find_path(&terrain, start, goal, Some(&blocked));
        assert!(path.is_empty());
    }

    #[test]
    fn test_remaining_distance_shrinks_on_unbiased_route() {
        // Within one quadrant no crossing is needed; the optimal path is a
        // straight Manhattan walk, so remaining distance decreases each step.
        let terrain = Terrain::generate();
        let start = GridPos::new(25, 3);
        let goal = GridPos::new(34, 4);

        let path = find_path(&terrain, start, goal, None);
        assert!(!path.is_empty());
        let mut remaining = start.manhattan(&goal);
        for cell in &path {
            let next = cell.manhattan(&goal);
            assert!(next < remaining, "distance should shrink at {cell:?}");
            remaining = next;
        }
    }
}
