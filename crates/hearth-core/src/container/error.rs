//! # Hearth Container Errors
//!
//! Defines [`ContainerError`], covering invalid keys, duplicate or missing
//! bindings, re-entrant resolution, failed factories and failed hooks.
use thiserror::Error;

use crate::container::binding::HookError;
use crate::kernel::error::ErrorKind;

/// Which kind of container hook produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HookPhase {
    #[error("resolving")]
    Resolving,
    #[error("release")]
    Release,
}

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Binding key must not be empty")]
    EmptyKey,

    #[error("Key '{key}' is already bound")]
    DuplicateBinding { key: String },

    #[error("Alias '{alias}' is already in use")]
    DuplicateAlias { alias: String },

    #[error("No binding found for '{key}'")]
    BindingNotFound { key: String },

    #[error("Binding '{key}' is not a singleton, an instance cannot be installed for it")]
    NotSingleton { key: String },

    #[error("Circular dependency while resolving '{key}': {}", .path.join(" -> "))]
    CircularDependency { key: String, path: Vec<String> },

    #[error("Instance bound to '{key}' is a '{actual}', not a '{expected}'")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Factory for '{key}' failed: {source}")]
    Build {
        key: String,
        #[source]
        source: HookError,
    },

    #[error("{phase} hook(s) failed for '{key}': {}", join_errors(.errors))]
    Hooks {
        key: String,
        phase: HookPhase,
        errors: Vec<HookError>,
    },
}

fn join_errors(errors: &[HookError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ContainerError {
    /// Wrap an arbitrary factory failure for `key`.
    pub fn build<E>(key: impl Into<String>, source: E) -> Self
    where
        E: Into<HookError>,
    {
        ContainerError::Build {
            key: key.into(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ContainerError::EmptyKey => ErrorKind::Argument,
            ContainerError::DuplicateBinding { .. } | ContainerError::DuplicateAlias { .. } => {
                ErrorKind::Duplicate
            }
            ContainerError::BindingNotFound { .. } => ErrorKind::NotFound,
            ContainerError::NotSingleton { .. }
            | ContainerError::CircularDependency { .. }
            | ContainerError::TypeMismatch { .. } => ErrorKind::Runtime,
            ContainerError::Build { .. } => ErrorKind::Build,
            ContainerError::Hooks { .. } => ErrorKind::Callback,
        }
    }
}

pub type Result<T> = std::result::Result<T, ContainerError>;
