use std::fmt;
use std::sync::Arc;

use semver::VersionReq;

use crate::kernel::bootstrap::Application;
use crate::kernel::constants::DEFAULT_PRIORITY;
use crate::kernel::error::Result;

/// A unit that binds services into the application container
/// (`register`) and then wires them up once every provider has
/// registered (`init`).
///
/// Providers are identified by [`ServiceProvider::name`]; two providers with
/// the same name cannot be registered on one application.
pub trait ServiceProvider: Send + Sync {
    /// Unique name of the provider. Defaults to the implementing type's name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Register-phase priority; lower runs first.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Init-phase priority, when it differs from [`ServiceProvider::priority`].
    fn init_priority(&self) -> Option<i32> {
        None
    }

    /// Kernel versions this provider works with. `None` accepts any.
    fn compatible_kernel(&self) -> Option<VersionReq> {
        None
    }

    /// Bind services. Runs for every provider before any `init`.
    fn register(&self, _app: &Application) -> Result<()> {
        Ok(())
    }

    /// Finish wiring after all providers have registered.
    fn init(&self, _app: &Application) -> Result<()> {
        Ok(())
    }
}

pub type SharedProvider = Arc<dyn ServiceProvider>;

/// Book-keeping for one registered provider.
#[derive(Clone)]
pub(crate) struct ProviderEntry {
    pub(crate) provider: SharedProvider,
    pub(crate) name: String,
    pub(crate) seq: u64,
    pub(crate) registered: bool,
    pub(crate) inited: bool,
    /// Added while `init` was running; phases run by `register` itself.
    pub(crate) late: bool,
}

impl ProviderEntry {
    pub(crate) fn new(provider: SharedProvider, seq: u64, late: bool) -> Self {
        Self {
            name: provider.name().to_string(),
            provider,
            seq,
            registered: false,
            inited: false,
            late,
        }
    }

    pub(crate) fn register_order(&self) -> (i32, u64) {
        (self.provider.priority(), self.seq)
    }

    pub(crate) fn init_order(&self) -> (i32, u64) {
        let priority = self
            .provider
            .init_priority()
            .unwrap_or_else(|| self.provider.priority());
        (priority, self.seq)
    }
}

impl fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("name", &self.name)
            .field("priority", &self.provider.priority())
            .field("seq", &self.seq)
            .field("registered", &self.registered)
            .field("inited", &self.inited)
            .finish()
    }
}
