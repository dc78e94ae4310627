//! Demo per-tick object driven by the host loop.
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use hearth_core::driver::{Behaviour, Capabilities, behaviour_instance};
use hearth_core::event::{Payload, SystemEvent};
use hearth_core::kernel::error::Result as KernelResult;
use hearth_core::kernel::{Application, ServiceProvider};

/// Container key of the heartbeat singleton.
pub const HEARTBEAT_KEY: &str = "heartbeat";

#[derive(Debug, Default)]
pub struct Heartbeat {
    frames: AtomicU64,
}

impl Heartbeat {
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl Behaviour for Heartbeat {
    fn name(&self) -> &str {
        HEARTBEAT_KEY
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::UPDATE | Capabilities::DESTROY
    }

    fn update(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    fn on_destroy(&self) {
        println!("heartbeat destroyed after {} frames", self.frames());
    }
}

/// Binds the heartbeat and resolves it once the application starts.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeartbeatProvider;

impl ServiceProvider for HeartbeatProvider {
    fn name(&self) -> &str {
        "heartbeat"
    }

    fn register(&self, app: &Application) -> KernelResult<()> {
        app.container().singleton(HEARTBEAT_KEY, |_, _| {
            Ok(behaviour_instance(Arc::new(Heartbeat::default())))
        })?;
        Ok(())
    }

    fn init(&self, app: &Application) -> KernelResult<()> {
        app.on(SystemEvent::StartCompleted.name(), |_| {
            println!("Application started");
            Payload::none()
        })?;
        // Resolving attaches it to the driver.
        app.make(HEARTBEAT_KEY)?;
        Ok(())
    }
}
