//! Decision system for non-human seats

pub mod engine;
pub mod scorer;
pub mod threat;

pub use engine::{BotConfig, DecisionEngine, DecisionReason, Intent, PlannedAction};
pub use scorer::{ActionFeatures, ScoreSource, ScorerClient};
pub use threat::{assess, Threat};
