//! JSON codec for [`WireMessage`].

use crate::errors::CodecError;
use crate::wire::WireMessage;

const KNOWN_TYPES: [&str; 4] = ["join", "pair", "pair-ack", "message"];

/// Serialize a wire message to its JSON text.
pub fn encode(message: &WireMessage) -> Result<String, CodecError> {
    serde_json::to_string(message).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Parse JSON text into a wire message.
///
/// An object with an unrecognised `type` is reported as
/// [`CodecError::UnknownType`] so callers can ignore it without treating the
/// peer as broken.
pub fn decode(text: &str) -> Result<WireMessage, CodecError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| CodecError::Malformed(e.to_string()))?;

    if let Some(kind) = value.get("type").and_then(|t| t.as_str()) {
        if !KNOWN_TYPES.contains(&kind) {
            return Err(CodecError::UnknownType(kind.to_string()));
        }
    }

    serde_json::from_value(value).map_err(|e| CodecError::Malformed(e.to_string()))
}
