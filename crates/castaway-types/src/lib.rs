//! Shared type definitions for Castaway sessions.
//!
//! This crate holds everything that crosses the wire or is shared between
//! the session core and the transport layer.
//!
//! # Modules
//!
//! - [`ids`] -- Participant identity and event correlation ids
//! - [`enums`] -- Sites, commodities and session phases
//! - [`messages`] -- Client and server message vocabulary
//! - [`codec`] -- Two-step JSON decoding and encoding

pub mod codec;
pub mod enums;
pub mod ids;
pub mod messages;

// Re-export all public types at crate root for convenience.
pub use codec::{DecodeError, decode_client_message, encode_server_message};
pub use enums::{Commodity, SessionPhase, Site};
pub use ids::{MessageId, ParticipantId};
pub use messages::{
    ClientMessage, EventPrompt, EventResponse, PlayerInfo, PromptControls, ServerMessage,
};
