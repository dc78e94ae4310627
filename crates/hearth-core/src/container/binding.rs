use std::fmt;
use std::sync::Arc;
use std::thread::ThreadId;

use parking_lot::{Mutex, RwLock};

use crate::container::error::Result;
use crate::container::instance::Instance;
use crate::container::registry::Container;

/// Error type returned by hooks and wrapped by failed factories.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Construction recipe: receives the container (for nested resolution) and
/// the caller supplied arguments.
pub type Factory = Arc<dyn Fn(&Container, &[Instance]) -> Result<Instance> + Send + Sync>;

/// Observer invoked with the binding key and the affected instance.
pub type Hook = Arc<dyn Fn(&str, &Instance) -> std::result::Result<(), HookError> + Send + Sync>;

/// Fallback strategy turning a name into a factory when no binding exists.
pub type TypeFinder = Arc<dyn Fn(&str) -> Option<Factory> + Send + Sync>;

/// A single registered binding.
///
/// The cache slot mutex is held for the whole of a singleton build, which is
/// what makes concurrent first resolutions construct the value only once.
/// `owner` names the thread holding the slot so that waits forming a cycle
/// across threads can be refused instead of blocking forever.
pub(crate) struct Binding {
    pub(crate) key: String,
    pub(crate) singleton: bool,
    pub(crate) factory: Option<Factory>,
    pub(crate) slot: Mutex<Option<Instance>>,
    pub(crate) owner: Mutex<Option<ThreadId>>,
    pub(crate) resolving: RwLock<Vec<Hook>>,
    pub(crate) release: RwLock<Vec<Hook>>,
    pub(crate) aliases: Mutex<Vec<String>>,
}

impl Binding {
    pub(crate) fn new(key: String, factory: Option<Factory>, singleton: bool) -> Self {
        Self {
            key,
            singleton,
            factory,
            slot: Mutex::new(None),
            owner: Mutex::new(None),
            resolving: RwLock::new(Vec::new()),
            release: RwLock::new(Vec::new()),
            aliases: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn resolving_hooks(&self) -> Vec<Hook> {
        self.resolving.read().clone()
    }

    pub(crate) fn release_hooks(&self) -> Vec<Hook> {
        self.release.read().clone()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("singleton", &self.singleton)
            .field("has_factory", &self.factory.is_some())
            .field("resolving_hooks", &self.resolving.read().len())
            .field("release_hooks", &self.release.read().len())
            .finish()
    }
}

/// Handle to a binding, returned by [`Container::bind`] and friends so that
/// hooks can be chained onto the registration.
#[derive(Clone, Debug)]
pub struct BindingRef {
    pub(crate) binding: Arc<Binding>,
}

impl BindingRef {
    pub fn key(&self) -> &str {
        &self.binding.key
    }

    pub fn is_singleton(&self) -> bool {
        self.binding.singleton
    }

    /// Run `hook` right after an instance for this binding is built.
    pub fn on_resolving<F>(self, hook: F) -> Self
    where
        F: Fn(&str, &Instance) -> std::result::Result<(), HookError> + Send + Sync + 'static,
    {
        self.binding.resolving.write().push(Arc::new(hook));
        self
    }

    /// Run `hook` before a cached instance of this binding is discarded.
    pub fn on_release<F>(self, hook: F) -> Self
    where
        F: Fn(&str, &Instance) -> std::result::Result<(), HookError> + Send + Sync + 'static,
    {
        self.binding.release.write().push(Arc::new(hook));
        self
    }
}
