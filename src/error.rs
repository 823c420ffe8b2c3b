use thiserror::Error;

use crate::domain::AgentId;

pub type ArenaResult<T> = Result<T, ArenaError>;

#[derive(Debug, Error)]
pub enum ArenaError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rank(#[from] RankError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    System(#[from] SystemError),
}

/// Errors raised while validating or decoding an [`ArenaConfig`](crate::config::ArenaConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Roster is empty: at least one agent is required")]
    EmptyRoster,

    #[error("Duplicate agent name in roster: '{0}'")]
    DuplicateAgentName(String),

    #[error("Invalid capacity for {name}: {value} (must be > 0)")]
    ZeroCapacity { name: &'static str, value: usize },

    #[error("Invalid interval for {name}: must be strictly positive")]
    ZeroInterval { name: &'static str },

    #[error("Interval for {name} does not fit the simulation clock: {msg}")]
    IntervalOutOfRange { name: &'static str, msg: String },

    #[error("Invalid range for {name}: [{low}, {high}) {msg}")]
    InvalidRange {
        name: &'static str,
        low: f64,
        high: f64,
        msg: String,
    },

    #[error("Invalid action weights for {bias}: {msg}")]
    InvalidWeights { bias: String, msg: String },

    #[error("Invalid value for {name}: {value} ({msg})")]
    InvalidValue {
        name: &'static str,
        value: f64,
        msg: String,
    },

    #[error("Failed to decode configuration")]
    Decode(#[from] serde_json::Error),
}

/// Errors raised by the rank tracker when the roster and its baseline disagree.
#[derive(Debug, Error)]
pub enum RankError {
    #[error("Unknown agent {0}: not present in the previous ranking baseline")]
    UnknownAgent(AgentId),

    #[error("Agent {0} vanished from the roster since the previous ranking")]
    MissingAgent(AgentId),

    #[error("Agent {0} appears more than once in the roster")]
    DuplicateAgent(AgentId),
}

/// Errors related to snapshot export and config fingerprinting.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("Serialization failed")]
    Json(#[from] serde_json::Error),

    #[error("Failed to encode configuration")]
    Encoding(#[from] postcard::Error),
}

/// Errors related to internal engine invariants and lifecycle misuse.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid arena state: {0}")]
    InvalidState(String),

    #[error("Arena runtime unavailable: {0}")]
    Runtime(String),
}

/// Rejects non-finite or negative generated quantities before they reach display state.
///
/// Test builds fail fast through `debug_assert!`; release builds surface a
/// [`SystemError::InvariantViolation`] instead.
pub(crate) fn ensure_non_negative(name: &str, value: f64) -> ArenaResult<f64> {
    debug_assert!(
        value.is_finite() && value >= 0.0,
        "generator produced invalid {name}: {value}"
    );
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SystemError::InvariantViolation(format!(
            "{name} must be finite and >= 0, got {value}"
        ))
        .into())
    }
}

/// Like [`ensure_non_negative`], for quantities that may legitimately be negative.
pub(crate) fn ensure_finite(name: &str, value: f64) -> ArenaResult<f64> {
    debug_assert!(value.is_finite(), "generator produced non-finite {name}");
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SystemError::InvariantViolation(format!("{name} must be finite, got {value}")).into())
    }
}
