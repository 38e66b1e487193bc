//! Shared core: identifiers, grid math, errors, configuration

pub mod config;
pub mod error;
pub mod types;

pub use error::{GameError, Result};
pub use types::{GridPos, MatchId, PlayerId, UnitId, GRID_SIZE};
