//! Workflow layer: the flows a caller actually asks for.
//!
//! [`RecipientPicker`] drives chip-based recipient fields,
//! [`EmailMatcher`] finds and opens inbox rows, and
//! [`ComposeOrchestrator`] sequences whole compose / reply / forward
//! operations on top of both.

pub mod compose;
pub mod errors;
pub mod inbox;
pub mod recipient;

pub use compose::{ComposeOrchestrator, ComposeRequest, ReplyMode};
pub use errors::FlowError;
pub use inbox::{EmailMatcher, EmailQuery, MatchedBy};
pub use recipient::{RecipientField, RecipientPicker};
