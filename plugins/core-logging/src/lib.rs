//! # Core Logging
//!
//! Service provider that installs the process-wide `tracing` subscriber and
//! bridges the kernel's `log` records into it. Registered first so every
//! later provider logs through it.
use hearth_core::kernel::constants::ENV_LOG;
use hearth_core::kernel::error::{Error as KernelError, Result as KernelResult};
use hearth_core::kernel::{Application, ServiceProvider};

use log::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Runs before the built-in providers.
pub const LOGGING_PROVIDER_PRIORITY: i32 = 0;

#[derive(Debug, Default, Clone)]
pub struct LoggingProvider {
    filter: Option<String>,
}

impl LoggingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `filter` instead of the application settings' filter. The
    /// environment still wins.
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
        }
    }
}

impl ServiceProvider for LoggingProvider {
    fn name(&self) -> &str {
        "core-logging"
    }

    fn priority(&self) -> i32 {
        LOGGING_PROVIDER_PRIORITY
    }

    fn register(&self, app: &Application) -> KernelResult<()> {
        let configured = self
            .filter
            .as_deref()
            .unwrap_or(app.settings().log_filter.as_str());
        let directive = resolve_filter(std::env::var(ENV_LOG).ok().as_deref(), configured);
        let filter = EnvFilter::try_new(&directive)
            .map_err(|e| KernelError::Other(format!("Invalid log filter '{}': {}", directive, e)))?;
        if install(filter) {
            info!("Logging initialized with filter '{}'", directive);
        }
        Ok(())
    }
}

/// The environment directive when set and non-blank, otherwise `configured`.
pub fn resolve_filter(env: Option<&str>, configured: &str) -> String {
    match env.map(str::trim) {
        Some(directive) if !directive.is_empty() => directive.to_string(),
        _ => configured.to_string(),
    }
}

/// Install a stderr `fmt` subscriber filtered by `filter` and route `log`
/// records into it. Returns `false` if a subscriber was already installed.
pub fn install(filter: EnvFilter) -> bool {
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }
    // Fails only if another logger already owns the `log` facade.
    if let Err(e) = tracing_log::LogTracer::init() {
        tracing::warn!("log records will not be captured: {}", e);
    }
    true
}
