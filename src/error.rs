use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide error type.
///
/// Hot-path numeric trouble (degenerate posteriors, singular ridge
/// matrices, bad feature dimensions) is clamped in place and never
/// surfaces here; these variants cover configuration, persistence, and
/// input handling.
#[derive(Debug, Error)]
pub enum SiftError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("outcome store error: {0}")]
    OutcomeStore(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("policy store unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("stale version for policy '{name}': held {held}, stored {stored}")]
    VersionConflict {
        name: String,
        held: u64,
        stored: u64,
    },

    #[error("state directory {0} is locked by another process")]
    StateLocked(PathBuf),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, SiftError>;
