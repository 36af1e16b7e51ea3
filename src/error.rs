//! Error types for the multirate limiter.

use thiserror::Error;

/// Main error type for multirate operations.
#[derive(Error, Debug)]
pub enum MultirateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A limiter was built without any window
    #[error("Rate limiter requires at least one window")]
    EmptyWindowSet,

    /// Paced waiting was requested against a window the limiter doesn't have
    #[error("Unknown window: {0}")]
    UnknownWindow(String),

    /// The caller's cancellation token fired
    #[error("Wait cancelled")]
    Cancelled,

    /// The caller's deadline passed before a permit was granted
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MultirateError {
    /// Whether this error came from the caller's cancellation token.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, MultirateError::Cancelled | MultirateError::DeadlineExceeded)
    }
}

/// Result type alias for multirate operations.
pub type Result<T> = std::result::Result<T, MultirateError>;
