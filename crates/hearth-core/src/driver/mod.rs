//! # Hearth Driver
//!
//! The main-thread scheduler and the bridge that attaches per-tick objects
//! to it as the container resolves and releases them.
//!
//! ## Key Components:
//!
//! - **[`Driver`]**: a FIFO of deferred actions and step-sequences drained by
//!   [`Driver::tick`] on the main thread, plus the attached [`Behaviour`]s
//!   whose `update`/`late_update` run every tick.
//! - **[`LifecycleBridge`]**: registers global container hooks so resolved
//!   instances carrying a [`SharedBehaviour`] view are attached, and released
//!   ones are detached. The container knows nothing about the driver.
//! - **[`DriverProvider`]**: service provider that installs both and tears
//!   them down when the application terminates.
use std::sync::Arc;

use crate::container::Instance;

pub mod bridge;
pub mod error;
pub mod provider;
pub mod scheduler;

pub use bridge::LifecycleBridge;
pub use error::DriverError;
pub use provider::DriverProvider;
pub use scheduler::{Driver, SequenceHandle};

bitflags::bitflags! {
    /// Per-tick capabilities a [`Behaviour`] opts into.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// `update` runs on every tick.
        const UPDATE = 1 << 0;
        /// `late_update` runs on every late tick.
        const LATE_UPDATE = 1 << 1;
        /// `on_destroy` runs once when the object is detached.
        const DESTROY = 1 << 2;
    }
}

/// An object driven by the main-thread scheduler.
pub trait Behaviour: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Which of the hooks below the driver should call.
    fn capabilities(&self) -> Capabilities;

    fn update(&self) {}

    fn late_update(&self) {}

    fn on_destroy(&self) {}
}

pub type SharedBehaviour = Arc<dyn Behaviour>;

/// Wrap a behaviour as a container instance the lifecycle bridge recognises.
pub fn behaviour_instance<T: Behaviour + 'static>(value: Arc<T>) -> Instance {
    let view: SharedBehaviour = value.clone();
    Instance::from_arc(value).with_view(view)
}

/// The behaviour view of `instance`, if it has one.
pub fn behaviour_of(instance: &Instance) -> Option<SharedBehaviour> {
    instance.view::<SharedBehaviour>()
}

// Test module declaration
#[cfg(test)]
mod tests;
