//! JSON encoding and decoding of WebSocket frames.

use chaos_core::error::AppError;

use super::types::{InboundMessage, OutboundMessage};
use super::validator::validate_frame;

/// Validate and decode an inbound text frame.
///
/// Any failure is reported as a validation error so the connection can
/// answer with an `error` frame and stay open.
pub fn decode_inbound(raw: &str) -> Result<InboundMessage, AppError> {
    validate_frame(raw)?;
    serde_json::from_str(raw)
        .map_err(|e| AppError::validation(format!("Malformed message: {e}")))
}

/// Encode an outbound message to a JSON text frame.
pub fn encode_outbound(msg: &OutboundMessage) -> Result<String, AppError> {
    Ok(serde_json::to_string(msg)?)
}
