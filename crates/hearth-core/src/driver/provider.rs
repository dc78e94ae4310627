use std::sync::Arc;

use crate::container::Instance;
use crate::driver::bridge::LifecycleBridge;
use crate::driver::scheduler::Driver;
use crate::event::{Payload, SystemEvent};
use crate::kernel::constants::DRIVER_PROVIDER_PRIORITY;
use crate::kernel::error::Result;
use crate::kernel::{Application, ServiceProvider};

/// Installs the main-thread [`Driver`] and its [`LifecycleBridge`], and
/// tears both down when the application terminates.
#[derive(Debug, Default, Clone, Copy)]
pub struct DriverProvider;

impl ServiceProvider for DriverProvider {
    fn name(&self) -> &str {
        "driver"
    }

    fn priority(&self) -> i32 {
        DRIVER_PROVIDER_PRIORITY
    }

    fn register(&self, app: &Application) -> Result<()> {
        let driver = Arc::new(Driver::with_main_thread(app.main_thread_id()));
        let bridge = Arc::new(LifecycleBridge::new(driver.clone()));
        bridge.install(app.container());

        let container = app.container();
        container.instance(Driver::KEY, Some(Instance::from_arc(driver)))?;
        container.instance(LifecycleBridge::KEY, Some(Instance::from_arc(bridge)))?;
        Ok(())
    }

    fn init(&self, app: &Application) -> Result<()> {
        let bridge = app.make_as::<LifecycleBridge>(LifecycleBridge::KEY)?;
        let container = Arc::downgrade(app.container());
        let handle = app.on(SystemEvent::Terminating.name(), move |_| {
            if let Some(container) = container.upgrade() {
                match bridge.shutdown(&container) {
                    Ok(released) => log::debug!("Released {} tracked instance(s)", released),
                    Err(e) => log::warn!("Driver teardown reported an error: {}", e),
                }
            }
            Payload::none()
        })?;
        if handle.is_none() {
            log::warn!("No event dispatcher installed; the driver will not be torn down on terminate");
        }
        Ok(())
    }
}
