//! # Hearth Driver Errors
use thiserror::Error;

use crate::kernel::error::ErrorKind;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("'{operation}' must be called from the main thread")]
    NotMainThread { operation: &'static str },

    #[error("Object '{name}' is already attached")]
    AlreadyAttached { name: String },
}

impl DriverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriverError::NotMainThread { .. } => ErrorKind::Runtime,
            DriverError::AlreadyAttached { .. } => ErrorKind::Duplicate,
        }
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
