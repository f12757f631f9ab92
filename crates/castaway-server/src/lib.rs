//! HTTP and `WebSocket` front end for Castaway sessions.
//!
//! Every client connects to `GET /join?name=..&game=..`, which upgrades to
//! a `WebSocket`, attaches the participant to the named session (creating
//! it on first use), and then shuttles JSON frames between the socket and
//! the session's event loop. Static client assets are served from the
//! configured directory for every other path.
//!
//! # Modules
//!
//! - [`error`] -- API error type with JSON responses.
//! - [`handlers`] -- Session listing endpoints.
//! - [`router`] -- Axum router assembly.
//! - [`server`] -- Listener binding and serving.
//! - [`startup`] -- Background-task launch used by the binary.
//! - [`state`] -- Shared application state.
//! - [`ws`] -- The `/join` `WebSocket` transport.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;
