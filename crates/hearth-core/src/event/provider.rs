use crate::container::Instance;
use crate::event::dispatcher::EventDispatcher;
use crate::kernel::constants::EVENTS_PROVIDER_PRIORITY;
use crate::kernel::error::Result;
use crate::kernel::{Application, ServiceProvider};

/// Installs an [`EventDispatcher`] into the application container under
/// [`EventDispatcher::KEY`].
#[derive(Debug, Default, Clone, Copy)]
pub struct EventsProvider;

impl ServiceProvider for EventsProvider {
    fn name(&self) -> &str {
        "events"
    }

    fn priority(&self) -> i32 {
        EVENTS_PROVIDER_PRIORITY
    }

    fn register(&self, app: &Application) -> Result<()> {
        app.container()
            .singleton(EventDispatcher::KEY, |_, _| Ok(Instance::new(EventDispatcher::new())))?;
        log::debug!("Event dispatcher bound as '{}'", EventDispatcher::KEY);
        Ok(())
    }
}
