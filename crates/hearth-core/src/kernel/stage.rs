use std::fmt;
use std::sync::Arc;

use crate::container::{Container, Instance};
use crate::kernel::bootstrap::Application;
use crate::kernel::error::{Error, Result};
use crate::kernel::provider::{ServiceProvider, SharedProvider};

/// One ordered step of [`Application::bootstrap`].
pub trait BootstrapStage: Send + Sync {
    /// The unique identifier of the stage
    fn id(&self) -> &str;

    /// The description of what this stage does
    fn description(&self) -> &str {
        ""
    }

    /// Prepare the application. Runs while the process state is
    /// `Bootstrapping`, so providers may be registered.
    fn bootstrap(&self, app: &Application) -> Result<()>;
}

pub type SharedStage = Arc<dyn BootstrapStage>;

/// Registers the providers named in the application settings.
///
/// Names are turned into providers through the application's type finder,
/// which must therefore be installed before this stage runs. The finder's
/// factory must produce an instance carrying an `Arc<dyn ServiceProvider>`
/// view (see [`provider_instance`]).
#[derive(Debug, Default, Clone, Copy)]
pub struct ProvidersBootstrap;

impl BootstrapStage for ProvidersBootstrap {
    fn id(&self) -> &str {
        "kernel::providers"
    }

    fn description(&self) -> &str {
        "Registers the providers listed in the settings"
    }

    fn bootstrap(&self, app: &Application) -> Result<()> {
        let container: &Container = app.container();
        let names = app.settings().providers.clone();
        for name in &names {
            let factory = app.find_type(name)?;
            let instance = factory(container, &[])?;
            let provider = instance
                .view::<SharedProvider>()
                .ok_or_else(|| Error::TypeLookup {
                    name: name.clone(),
                    reason: format!("'{}' is not a service provider", instance.type_name()),
                })?;
            log::debug!("Settings provider '{}' resolved to '{}'", name, provider.name());
            app.register(provider)?;
        }
        Ok(())
    }
}

/// Registers a fixed list of providers.
pub struct RegisterProviders(pub Vec<SharedProvider>);

impl fmt::Debug for RegisterProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|p| p.name()).collect();
        f.debug_tuple("RegisterProviders").field(&names).finish()
    }
}

impl BootstrapStage for RegisterProviders {
    fn id(&self) -> &str {
        "kernel::register_providers"
    }

    fn description(&self) -> &str {
        "Registers providers supplied by the host"
    }

    fn bootstrap(&self, app: &Application) -> Result<()> {
        for provider in &self.0 {
            app.register(provider.clone())?;
        }
        Ok(())
    }
}

/// Announces start completion in the log once `init` finishes.
#[derive(Debug, Default, Clone, Copy)]
pub struct StartBootstrap;

impl BootstrapStage for StartBootstrap {
    fn id(&self) -> &str {
        "kernel::start"
    }

    fn description(&self) -> &str {
        "Logs the start-completed milestone"
    }

    fn bootstrap(&self, app: &Application) -> Result<()> {
        app.on_start_completed(|app| {
            log::info!(
                "{} started (kernel {}, {} provider(s))",
                app.settings().name,
                app.version(),
                app.provider_names().len()
            );
        });
        Ok(())
    }
}

/// Stage built from a closure.
pub struct FnStage<F> {
    id: String,
    f: F,
}

impl<F> fmt::Debug for FnStage<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStage").field("id", &self.id).finish()
    }
}

impl<F> BootstrapStage for FnStage<F>
where
    F: Fn(&Application) -> Result<()> + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn bootstrap(&self, app: &Application) -> Result<()> {
        (self.f)(app)
    }
}

/// Wrap `f` as a bootstrap stage identified by `id`.
pub fn stage_fn<F>(id: impl Into<String>, f: F) -> SharedStage
where
    F: Fn(&Application) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(FnStage { id: id.into(), f })
}

/// Wrap a provider as a container instance that [`ProvidersBootstrap`]
/// recognises.
pub fn provider_instance<P: ServiceProvider + 'static>(provider: P) -> Instance {
    let provider = Arc::new(provider);
    let view: SharedProvider = provider.clone();
    Instance::from_arc(provider).with_view(view)
}
