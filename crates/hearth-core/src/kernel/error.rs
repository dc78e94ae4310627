//! # Hearth Kernel Errors
//!
//! Defines the kernel [`Error`] enum, which wraps the subsystem errors
//! ([`ContainerError`], [`EventError`], [`DriverError`], [`SettingsError`])
//! and adds lifecycle failures tagged with a [`KernelLifecyclePhase`].
//!
//! Every error can be classified with [`Error::kind`].
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::container::ContainerError;
use crate::driver::DriverError;
use crate::event::EventError;
use crate::kernel::settings::SettingsError;

/// Coarse classification shared by every error in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid input: empty key or name, empty stage id, zero repeat count.
    Argument,
    /// Key, alias, provider or attached object already present.
    Duplicate,
    /// Unresolvable key or unknown name.
    NotFound,
    /// Illegal state transition or misuse.
    Runtime,
    /// One or more resolving/release hooks failed.
    Callback,
    /// A factory failed to build an instance.
    Build,
}

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Event system error: {0}")]
    EventSystem(#[from] EventError),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Provider '{name}' is already registered")]
    DuplicateProvider { name: String },

    #[error("Provider '{name}' requires kernel {required}, running {actual}")]
    IncompatibleProvider {
        name: String,
        required: semver::VersionReq,
        actual: semver::Version,
    },

    /// Error occurring during a specific kernel lifecycle phase.
    #[error("Kernel lifecycle error during {phase}: {message}")]
    KernelLifecycleError {
        phase: KernelLifecyclePhase,
        provider_name: Option<String>,
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    #[error("Type lookup failed for '{name}': {reason}")]
    TypeLookup { name: String, reason: String },

    #[error("Bootstrap stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: Box<Error>,
    },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Represents a specific phase in the kernel's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum KernelLifecyclePhase {
    #[error("Bootstrap")]
    Bootstrap,
    #[error("Register")]
    Register,
    #[error("Init")]
    Init,
    #[error("Resolve")]
    Resolve,
    #[error("Terminate")]
    Terminate,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl Error {
    /// A lifecycle error with no underlying cause.
    pub fn lifecycle(phase: KernelLifecyclePhase, message: impl Into<String>) -> Self {
        Error::KernelLifecycleError {
            phase,
            provider_name: None,
            message: message.into(),
            source: None,
        }
    }

    /// A lifecycle error raised while running `provider`'s action.
    pub fn provider_failed(phase: KernelLifecyclePhase, provider: &str, source: Error) -> Self {
        Error::KernelLifecycleError {
            phase,
            provider_name: Some(provider.to_string()),
            message: format!("provider '{provider}' failed"),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Container(e) => e.kind(),
            Error::EventSystem(e) => e.kind(),
            Error::Driver(e) => e.kind(),
            Error::Settings(_) | Error::InvalidArgument(_) => ErrorKind::Argument,
            Error::DuplicateProvider { .. } => ErrorKind::Duplicate,
            Error::TypeLookup { .. } => ErrorKind::NotFound,
            Error::KernelLifecycleError {
                source: Some(source),
                ..
            } => source.kind(),
            Error::StageFailed { source, .. } => source.kind(),
            Error::IncompatibleProvider { .. }
            | Error::KernelLifecycleError { source: None, .. }
            | Error::Other(_) => ErrorKind::Runtime,
        }
    }
}
