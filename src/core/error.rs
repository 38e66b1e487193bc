use thiserror::Error;

/// Rejection and failure taxonomy for the match engine.
///
/// Everything here is recovered locally: the offending message is rejected
/// with no state mutation, and the match keeps running.
#[derive(Error, Debug)]
pub enum GameError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Out of bounds: ({0}, {1})")]
    OutOfBounds(i32, i32),

    #[error("Insufficient elixir: need {cost}, have {available:.1}")]
    InsufficientResource { cost: u8, available: f32 },

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Rate limited: too many actions")]
    RateLimited,

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Corrupt persisted state: {0}")]
    CorruptPersistedState(String),

    #[error("Scorer error: {0}")]
    Scorer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl GameError {
    /// Human-readable reason pushed back to the originating connection
    pub fn rejection_reason(&self) -> String {
        self.to_string()
    }
}

pub type Result<T> = std::result::Result<T, GameError>;
