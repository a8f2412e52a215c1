//! Shared error type across memolog crates.

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, MemologError>;

/// Unified error type used by core and provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MemologError {
    /// Configuration could not be read or parsed.
    #[error("config: {0}")]
    Config(String),
    /// A console or storage sink failed to write.
    #[error("sink: {0}")]
    Sink(String),
    /// A severity token did not name a level.
    #[error("unknown level: {0}")]
    UnknownLevel(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MemologError {
    /// Stable short label, used as a field value in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            MemologError::Config(_) => "config",
            MemologError::Sink(_) => "sink",
            MemologError::UnknownLevel(_) => "unknown_level",
            MemologError::Internal(_) => "internal",
        }
    }
}

impl From<std::io::Error> for MemologError {
    fn from(e: std::io::Error) -> Self {
        MemologError::Sink(e.to_string())
    }
}
