use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::container::{Container, ContainerError, HookError, Instance, InstanceId};
use crate::driver::scheduler::Driver;
use crate::driver::behaviour_of;

/// Attaches resolved per-tick objects to a [`Driver`] and detaches them when
/// the container releases them.
///
/// An object cached under several keys is attached once and detached when the
/// last of those keys releases it.
pub struct LifecycleBridge {
    driver: Arc<Driver>,
    tracked: Mutex<HashMap<InstanceId, BTreeSet<String>>>,
}

impl fmt::Debug for LifecycleBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleBridge")
            .field("driver", &self.driver)
            .field("tracked", &self.tracked.lock().len())
            .finish()
    }
}

impl LifecycleBridge {
    /// Container key the bridge is bound under.
    pub const KEY: &'static str = "driver.lifecycle_bridge";

    pub fn new(driver: Arc<Driver>) -> Self {
        Self {
            driver,
            tracked: Mutex::new(HashMap::new()),
        }
    }

    pub fn driver(&self) -> &Arc<Driver> {
        &self.driver
    }

    /// Register the bridge's global resolving and release hooks on
    /// `container`. The hooks hold the bridge weakly.
    pub fn install(self: &Arc<Self>, container: &Container) {
        let bridge = Arc::downgrade(self);
        container.on_resolving_any(move |key, instance| match bridge.upgrade() {
            Some(bridge) => bridge.resolved(key, instance),
            None => Ok(()),
        });
        let bridge = Arc::downgrade(self);
        container.on_release_any(move |key, instance| match bridge.upgrade() {
            Some(bridge) => {
                bridge.released(key, instance);
                Ok(())
            }
            None => Ok(()),
        });
        log::debug!("Lifecycle bridge installed");
    }

    fn resolved(&self, key: &str, instance: &Instance) -> Result<(), HookError> {
        let Some(behaviour) = behaviour_of(instance) else {
            return Ok(());
        };
        let id = instance.id();
        if self.driver.is_attached(&behaviour) {
            // Already attached through another key.
            if let Some(keys) = self.tracked.lock().get_mut(&id) {
                keys.insert(key.to_string());
            }
            return Ok(());
        }
        if self.driver.attach(behaviour)? {
            self.tracked
                .lock()
                .entry(id)
                .or_default()
                .insert(key.to_string());
        }
        Ok(())
    }

    fn released(&self, key: &str, instance: &Instance) {
        let Some(behaviour) = behaviour_of(instance) else {
            return;
        };
        let id = instance.id();
        {
            let mut tracked = self.tracked.lock();
            if let Some(keys) = tracked.get_mut(&id) {
                keys.remove(key);
                if !keys.is_empty() {
                    log::debug!(
                        "'{}' released under '{}', still held by {:?}",
                        behaviour.name(),
                        key,
                        keys
                    );
                    return;
                }
                tracked.remove(&id);
            }
        }
        self.driver.detach(&behaviour);
    }

    /// Detach `instance` whatever keys still hold it.
    ///
    /// The container never releases transient instances, so objects resolved
    /// from transient bindings stay attached until this is called or the
    /// bridge shuts down. Returns whether the object was attached.
    pub fn detach_instance(&self, instance: &Instance) -> bool {
        let Some(behaviour) = behaviour_of(instance) else {
            return false;
        };
        self.tracked.lock().remove(&instance.id());
        self.driver.detach(&behaviour)
    }

    /// Keys whose instances the bridge attached and still tracks, sorted.
    pub fn tracked_keys(&self) -> Vec<String> {
        let keys: BTreeSet<String> = self.tracked.lock().values().flatten().cloned().collect();
        keys.into_iter().collect()
    }

    /// Release every tracked key through `container` (running the normal
    /// release hooks), then shut the driver down. Every key is attempted;
    /// the first failure is returned.
    pub fn shutdown(&self, container: &Container) -> Result<usize, ContainerError> {
        let mut first_error = None;
        let mut released = 0;
        for key in self.tracked_keys() {
            match container.release(&key) {
                Ok(true) => released += 1,
                Ok(false) => {}
                Err(e) => {
                    log::warn!("Releasing '{}' during shutdown failed: {}", key, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        self.tracked.lock().clear();
        self.driver.shutdown();
        match first_error {
            Some(e) => Err(e),
            None => Ok(released),
        }
    }
}
