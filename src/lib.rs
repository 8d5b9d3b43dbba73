//! MailPilot: an MCP server that drives a webmail UI through
//! heuristic element resolution over CDP.
//!
//! The layers live in their own crates: `mailpilot-session` owns the
//! browser and the DOM probe, `mailpilot-locator` the strategy
//! chains, `mailpilot-flows` the workflows. This crate adds the tool
//! surface and process bootstrap.

pub mod server;

pub use server::MailPilotServer;
