//! Two-step JSON codec for wire messages.
//!
//! Decoding first extracts the `action` discriminant, rejects anything a
//! client is not allowed to send, and only then decodes the full payload
//! into the matching [`ClientMessage`] variant.

use serde::Deserialize;

use crate::messages::{ClientMessage, ServerMessage};

/// Errors produced while decoding an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The frame is not a JSON object with a string `action` field.
    #[error("malformed message: {source}")]
    Malformed {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The `action` names no message a client may send.
    #[error("unknown action: {action}")]
    UnknownAction {
        /// The offending discriminant.
        action: String,
    },

    /// The `action` is known but the payload does not match its schema.
    #[error("invalid {action} payload: {source}")]
    InvalidPayload {
        /// The discriminant whose schema failed.
        action: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// Envelope used to read the discriminant without knowing the schema.
#[derive(Deserialize)]
struct Envelope {
    action: String,
}

/// Decode one client frame.
///
/// # Errors
///
/// Returns [`DecodeError`] if the frame is malformed, names an unknown
/// action, or does not match the schema of its action.
pub fn decode_client_message(data: &str) -> Result<ClientMessage, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(data)?;
    let envelope = Envelope::deserialize(&value)?;

    if !ClientMessage::ACTIONS.contains(&envelope.action.as_str()) {
        return Err(DecodeError::UnknownAction {
            action: envelope.action,
        });
    }

    serde_json::from_value(value).map_err(|source| DecodeError::InvalidPayload {
        action: envelope.action,
        source,
    })
}

/// Encode one server message to a JSON text frame.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if serialization fails.
pub fn encode_server_message(message: &ServerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}
