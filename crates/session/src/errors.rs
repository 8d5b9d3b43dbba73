//! Error types for the session layer

use thiserror::Error;

/// Session error enumeration
#[derive(Debug, Error)]
pub enum SessionError {
    /// Browser process failed to launch
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// Navigation did not succeed after the allowed attempts
    #[error("Navigation to '{url}' failed after {attempts} attempts: {reason}")]
    Navigation {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// A bounded wait ran out of time
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// CDP command or evaluation failure
    #[error("CDP error: {0}")]
    Cdp(String),

    /// An injected script returned something we could not decode
    #[error("Probe result decode failed: {0}")]
    Decode(String),

    /// Geometry for an element could not be read
    #[error("Could not read bounding geometry for {0}")]
    Geometry(String),

    /// Filesystem failure (screenshots, attachment paths)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    pub fn cdp(err: impl std::fmt::Display) -> Self {
        SessionError::Cdp(err.to_string())
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Timeout(_) | SessionError::Cdp(_))
    }
}
