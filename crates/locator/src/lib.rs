//! Element resolution for a UI without stable identifiers.
//!
//! Targets are described as ordered strategy chains; the resolver
//! walks a chain and takes the first strategy with a visible match.
//! Compose-surface detection and token text matching live here too.

pub mod errors;
pub mod scope;
pub mod strategies;
pub mod textmatch;
pub mod types;

pub use errors::LocatorError;
pub use scope::{assert_compose_open, resolve_compose_scope, ComposeScope, ScopeKind};
pub use strategies::ElementResolver;
pub use textmatch::{all_tokens_match, filter_prefix, token_filter, tokens};
pub use types::{LocatorStrategy, LocatorTarget};
