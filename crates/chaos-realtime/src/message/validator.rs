//! Message validation rules.

use chaos_core::error::AppError;

/// Maximum allowed frame size in bytes.
const MAX_FRAME_SIZE: usize = 65_536;

/// Maximum length of a presence status message, in characters.
pub const MAX_STATUS_MESSAGE_LENGTH: usize = 128;

/// Validates a raw inbound frame before parsing.
pub fn validate_frame(raw: &str) -> Result<(), AppError> {
    if raw.len() > MAX_FRAME_SIZE {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {MAX_FRAME_SIZE} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    Ok(())
}

/// Validates chat message content against the configured maximum length.
pub fn validate_content(content: &str, max_length: usize) -> Result<(), AppError> {
    if content.trim().is_empty() {
        return Err(AppError::validation("Message content cannot be empty"));
    }

    if content.chars().count() > max_length {
        return Err(AppError::validation(format!(
            "Message content exceeds maximum length of {max_length} characters"
        )));
    }

    Ok(())
}

/// Validates an optional presence status message.
pub fn validate_status_message(message: Option<&str>) -> Result<(), AppError> {
    match message {
        Some(m) if m.chars().count() > MAX_STATUS_MESSAGE_LENGTH => Err(AppError::validation(
            format!("Status message exceeds maximum length of {MAX_STATUS_MESSAGE_LENGTH} characters"),
        )),
        _ => Ok(()),
    }
}
