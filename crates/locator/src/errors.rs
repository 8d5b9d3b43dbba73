//! Error types for element resolution

use mailpilot_session::SessionError;
use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error)]
pub enum LocatorError {
    /// Every strategy in a chain came up empty
    #[error("No visible match for '{target}' after {tried} strategies")]
    NoStrategyMatched { target: String, tried: usize },

    /// The compose surface never reached its required visible state
    #[error("Compose surface not open: {0}")]
    ComposeNotOpen(String),

    /// Underlying probe failure
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl LocatorError {
    pub fn no_match(target: impl Into<String>, tried: usize) -> Self {
        LocatorError::NoStrategyMatched { target: target.into(), tried }
    }
}
