//! # Kernel Settings
//!
//! [`KernelSettings`] is the host-facing configuration of an
//! [`Application`](crate::kernel::Application): its display name, the
//! ordered provider names for [`ProvidersBootstrap`](crate::kernel::ProvidersBootstrap),
//! the tick rate the host drives the scheduler at, and the log filter.
//!
//! Settings load from JSON, or TOML with the `toml-config` feature.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kernel::constants;

/// Supported settings file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    /// JSON format (.json)
    Json,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl SettingsFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            SettingsFormat::Json => "json",
            #[cfg(feature = "toml-config")]
            SettingsFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(SettingsFormat::Json),
                #[cfg(feature = "toml-config")]
                "toml" => Some(SettingsFormat::Toml),
                _ => None,
            })
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error reading settings from '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported settings format for path '{0}'")]
    UnsupportedFormat(PathBuf),

    #[error("Serialization to '{format}' failed: {source}")]
    Serialization {
        format: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Deserialization from '{format}' failed: {source}")]
    Deserialization {
        format: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Invalid setting '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelSettings {
    /// Display name used in logs.
    pub name: String,
    /// Provider names registered by the providers bootstrap stage, in order.
    pub providers: Vec<String>,
    /// Frames per second the host drives the scheduler at.
    pub tick_rate_hz: u32,
    /// Log filter directive used when the environment sets none.
    pub log_filter: String,
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            name: constants::APP_NAME.to_string(),
            providers: Vec::new(),
            tick_rate_hz: constants::DEFAULT_TICK_RATE_HZ,
            log_filter: constants::DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl KernelSettings {
    /// Parse and validate settings text.
    pub fn from_str(data: &str, format: SettingsFormat) -> Result<Self> {
        let settings: KernelSettings = match format {
            SettingsFormat::Json => {
                serde_json::from_str(data).map_err(|e| SettingsError::Deserialization {
                    format: "json",
                    source: Box::new(e),
                })?
            }
            #[cfg(feature = "toml-config")]
            SettingsFormat::Toml => {
                toml::from_str(data).map_err(|e| SettingsError::Deserialization {
                    format: "toml",
                    source: Box::new(e),
                })?
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a file, choosing the format by extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = SettingsFormat::from_path(path)
            .ok_or_else(|| SettingsError::UnsupportedFormat(path.to_path_buf()))?;
        let data = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loading settings from {}", path.display());
        Self::from_str(&data, format)
    }

    /// Serialize to string based on format
    pub fn to_string(&self, format: SettingsFormat) -> Result<String> {
        match format {
            SettingsFormat::Json => {
                serde_json::to_string_pretty(self).map_err(|e| SettingsError::Serialization {
                    format: "json",
                    source: Box::new(e),
                })
            }
            #[cfg(feature = "toml-config")]
            SettingsFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| SettingsError::Serialization {
                    format: "toml",
                    source: Box::new(e),
                })
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_rate_hz == 0 {
            return Err(SettingsError::Invalid {
                field: "tick_rate_hz",
                reason: "must be greater than zero".to_string(),
            });
        }
        if let Some(blank) = self.providers.iter().find(|p| p.trim().is_empty()) {
            return Err(SettingsError::Invalid {
                field: "providers",
                reason: format!("provider names must not be empty (got {blank:?})"),
            });
        }
        Ok(())
    }
}
