//! # Hearth Kernel
//!
//! The `kernel` module holds the process state machine and everything it
//! drives.
//!
//! ## Key Responsibilities & Components:
//!
//! - **Application Lifecycle**: [`Application`](bootstrap::Application) walks
//!   `Uninitialized → Bootstrapping → Bootstrapped → Initializing → Inited`,
//!   running the bootstrap stages and then the two provider phases.
//! - **Service Providers**: the [`ServiceProvider`](provider::ServiceProvider)
//!   trait, ordered by `(priority, registration order)`.
//! - **Bootstrap Stages**: the [`BootstrapStage`](stage::BootstrapStage)
//!   trait and the built-in stages in the `stage` submodule.
//! - **Settings**: [`KernelSettings`](settings::KernelSettings), loadable from
//!   JSON or TOML.
//! - **Core Constants**: system-wide constants via the `constants` submodule.
//! - **Error Handling**: the kernel [`Error`](error::Error), its
//!   [`ErrorKind`](error::ErrorKind) classification and a `Result` alias.
pub mod bootstrap;
pub mod constants;
pub mod error;
pub mod provider;
pub mod settings;
pub mod stage;

pub use bootstrap::{Application, ProcessState};
pub use error::{Error, ErrorKind, KernelLifecyclePhase, Result};
pub use provider::{ServiceProvider, SharedProvider};
pub use settings::{KernelSettings, SettingsError, SettingsFormat};
pub use stage::{
    BootstrapStage, ProvidersBootstrap, RegisterProviders, SharedStage, StartBootstrap,
    provider_instance, stage_fn,
};

// Test module declaration
#[cfg(test)]
mod tests;
