//! JSON envelope codec for socket frames.
//!
//! One text frame per event; the envelope shape itself lives in
//! `shared::protocol` so both directions stay pinned by one set of types.

use shared::protocol::{ClientEvent, ServerEvent};

use crate::error::TransportError;

pub fn encode(event: &ClientEvent) -> Result<String, TransportError> {
    serde_json::to_string(event).map_err(TransportError::Encode)
}

pub fn decode(raw: &str) -> Result<ServerEvent, TransportError> {
    serde_json::from_str(raw).map_err(TransportError::Decode)
}
