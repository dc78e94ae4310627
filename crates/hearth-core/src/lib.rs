//! # Hearth Core
//!
//! An embeddable application kernel: a binding [`container`], a process
//! state machine with a provider bootstrap ([`kernel`]), a priority-ordered
//! [`event`] dispatcher and a main-thread scheduler with a lifecycle hook
//! bridge ([`driver`]).
pub mod container;
pub mod driver;
pub mod event;
pub mod kernel;

// Re-export key public types for the binary and plugins
pub use container::{Container, ContainerError, Instance, InstanceId};
pub use driver::{
    Behaviour, Capabilities, Driver, DriverProvider, LifecycleBridge, SequenceHandle,
    SharedBehaviour, behaviour_instance,
};
pub use event::{EventDispatcher, EventResponse, EventsProvider, ListenerHandle, Payload, SystemEvent};
pub use kernel::error::Error as KernelError;
pub use kernel::{Application, KernelSettings, ProcessState, ServiceProvider};

#[cfg(test)]
mod tests;
