//! # Hearth Event System Errors
//!
//! Defines [`EventError`], raised when a listener registration is invalid.
use thiserror::Error;

use crate::kernel::error::ErrorKind;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event name must not be empty")]
    EmptyName,

    #[error("Invalid event pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Listener for '{event_name}' must be allowed to run at least once")]
    InvalidRepeatCount { event_name: String },
}

impl EventError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Argument
    }
}

pub type Result<T> = std::result::Result<T, EventError>;
