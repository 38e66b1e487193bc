//! Match lifecycle: registry, per-match actors, command validation

pub mod commands;
pub mod rate_limit;
pub mod registry;

pub use rate_limit::RateLimiter;
pub use registry::{MatchHandle, MatchRegistry};
