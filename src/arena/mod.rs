//! Match simulation: terrain, pathfinding, cards, combat, scheduling

pub mod cards;
pub mod combat;
pub mod pathfinding;
pub mod player;
pub mod scheduler;
pub mod state;
pub mod terrain;
pub mod units;

pub use combat::{resolve, CombatEvent};
pub use pathfinding::find_path;
pub use player::Participant;
pub use scheduler::{advance_turn, run_tick, start_match, StepOutcome};
pub use state::{MatchState, MatchStatus, MovementMode, SchedulingMode};
pub use terrain::{Crossing, Terrain};
pub use units::Unit;
