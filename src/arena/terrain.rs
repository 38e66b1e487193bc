//! Static obstacle map generation
//!
//! Every match plays on the same fixed topology: an X-shaped diagonal
//! barrier splitting the grid into four quadrants, a wide orthogonal
//! cross through the center, and four named crossing points punched
//! through the barrier midpoints. Deterministic, no randomness.

use ahash::AHashSet;
use serde::Serialize;

use crate::core::types::{GridPos, GRID_SIZE};

/// Half-width of the always-passable central cross
const CROSS_HALF_WIDTH: i32 = 2;

/// A named passable gap through the diagonal barrier
#[derive(Debug, Clone, Serialize)]
pub struct Crossing {
    pub name: &'static str,
    pub center: GridPos,
}

impl Crossing {
    /// The 3x3 passable footprint around the crossing center
    pub fn cells(&self) -> Vec<GridPos> {
        let mut cells = Vec::with_capacity(9);
        for dx in -1..=1 {
            for dy in -1..=1 {
                cells.push(GridPos::new(self.center.x + dx, self.center.y + dy));
            }
        }
        cells
    }

    pub fn contains(&self, pos: &GridPos) -> bool {
        (pos.x - self.center.x).abs() <= 1 && (pos.y - self.center.y).abs() <= 1
    }
}

/// Immutable per-match obstacle topology
#[derive(Debug, Clone, Serialize)]
pub struct Terrain {
    obstacles: AHashSet<GridPos>,
    crossings: Vec<Crossing>,
}

impl Terrain {
    /// Build the fixed battle map.
    ///
    /// Both diagonals are impassable, except where the central cross or a
    /// crossing footprint overlaps them.
    pub fn generate() -> Self {
        let center = GRID_SIZE / 2;

        let crossings = vec![
            Crossing { name: "north-west", center: GridPos::new(10, 10) },
            Crossing { name: "south-east", center: GridPos::new(29, 29) },
            Crossing { name: "north-east", center: GridPos::new(29, 10) },
            Crossing { name: "south-west", center: GridPos::new(10, 29) },
        ];

        let mut obstacles = AHashSet::new();
        for i in 0..GRID_SIZE {
            obstacles.insert(GridPos::new(i, i));
            obstacles.insert(GridPos::new(i, GRID_SIZE - 1 - i));
        }

        // Punch the central cross: anything within the corridor stays open
        obstacles.retain(|pos| {
            (pos.x - center).abs() > CROSS_HALF_WIDTH && (pos.y - center).abs() > CROSS_HALF_WIDTH
        });

        // Punch the crossing footprints
        for crossing in &crossings {
            for cell in crossing.cells() {
                obstacles.remove(&cell);
            }
        }

        Self { obstacles, crossings }
    }

    pub fn is_obstacle(&self, pos: &GridPos) -> bool {
        self.obstacles.contains(pos)
    }

    /// Passable means in-bounds and not part of the barrier
    pub fn is_passable(&self, pos: &GridPos) -> bool {
        pos.in_bounds() && !self.obstacles.contains(pos)
    }

    pub fn is_crossing(&self, pos: &GridPos) -> bool {
        self.crossings.iter().any(|c| c.contains(pos))
    }

    pub fn crossings(&self) -> &[Crossing] {
        &self.crossings
    }

    pub fn obstacles(&self) -> &AHashSet<GridPos> {
        &self.obstacles
    }
}
