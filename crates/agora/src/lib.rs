//! Agora - a command-line client for a discussion forum REST API.
//!
//! The library holds the client-side state of the forum: the persisted login
//! session, the HTTP egress point that decorates requests with the session
//! credential, and a keyed query cache invalidated by mutations.

pub mod api;
pub mod build_info;
pub mod cache;
pub mod client;
pub mod config;
pub mod forum;
pub mod session;
pub mod sync;
pub mod views;
