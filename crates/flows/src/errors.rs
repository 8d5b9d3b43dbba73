//! Error types for the workflow layer

use mailpilot_locator::LocatorError;
use mailpilot_session::SessionError;
use thiserror::Error;

/// Flow error enumeration
#[derive(Debug, Error)]
pub enum FlowError {
    /// No suggestion matched the requested recipient value
    #[error("Suggestion not found for {field} value '{value}'")]
    SuggestionNotFound { field: String, value: String },

    /// Explicit filters matched nothing in the rendered inbox
    #[error("No matching email: {0}")]
    NoMatch(String),

    /// Neither filters nor an index were usable
    #[error("Insufficient query: provide subject, from, or index")]
    InsufficientQuery,

    /// Neither a native file input nor an Attach control exists
    #[error("Attachment failed: {0}")]
    Attachment(String),

    /// No email detail view could be opened
    #[error("Detail view not open: {0}")]
    DetailNotOpen(String),

    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Session(#[from] SessionError),
}
