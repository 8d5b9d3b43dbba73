//! Session layer: browser lifecycle, guarded navigation, DOM probing.
//!
//! Everything above this crate talks to the page through [`DomProbe`];
//! nothing above it touches CDP directly.

pub mod config;
pub mod dom;
pub mod errors;
pub mod navigate;
pub mod session;

pub use config::{AppConfig, Timeouts};
pub use dom::{DomProbe, ElementHit, Rect, TextFilter};
pub use errors::SessionError;
pub use navigate::{bootstrap_once, safe_goto, wait_for_url_prefix};
pub use session::{Session, SessionPhase};
