use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::container::binding::{Binding, BindingRef, Factory, Hook, HookError, TypeFinder};
use crate::container::error::{ContainerError, HookPhase, Result};
use crate::container::instance::Instance;

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Keys this thread is currently resolving or releasing, per container.
    static ACTIVE_KEYS: RefCell<Vec<(u64, String)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a key as in use by the current thread for the guard's lifetime.
struct ActiveKey;

impl ActiveKey {
    fn enter(container: u64, key: &str) -> Result<Self> {
        ACTIVE_KEYS.with(|active| {
            let mut active = active.borrow_mut();
            if active.iter().any(|(id, k)| *id == container && k == key) {
                let mut path: Vec<String> = active
                    .iter()
                    .filter(|(id, _)| *id == container)
                    .map(|(_, k)| k.clone())
                    .collect();
                path.push(key.to_string());
                return Err(ContainerError::CircularDependency {
                    key: key.to_string(),
                    path,
                });
            }
            active.push((container, key.to_string()));
            Ok(ActiveKey)
        })
    }
}

impl Drop for ActiveKey {
    fn drop(&mut self) {
        ACTIVE_KEYS.with(|active| {
            active.borrow_mut().pop();
        });
    }
}

/// A held cache slot. The owning thread is recorded while it is held.
struct SlotGuard<'a> {
    binding: &'a Binding,
    slot: MutexGuard<'a, Option<Instance>>,
}

impl<'a> SlotGuard<'a> {
    fn claim(binding: &'a Binding, slot: MutexGuard<'a, Option<Instance>>, owner: ThreadId) -> Self {
        *binding.owner.lock() = Some(owner);
        Self { binding, slot }
    }
}

impl Deref for SlotGuard<'_> {
    type Target = Option<Instance>;

    fn deref(&self) -> &Self::Target {
        &self.slot
    }
}

impl DerefMut for SlotGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.slot
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        // Cleared before the slot itself unlocks.
        *self.binding.owner.lock() = None;
    }
}

/// Key used for type-keyed bindings.
pub fn type_key<T: ?Sized>() -> &'static str {
    std::any::type_name::<T>()
}

/// The binding registry.
///
/// All methods take `&self`; the container is meant to be shared behind an
/// `Arc` and used from any thread.
pub struct Container {
    id: u64,
    bindings: RwLock<HashMap<String, Arc<Binding>>>,
    aliases: RwLock<HashMap<String, String>>,
    global_resolving: RwLock<Vec<Hook>>,
    global_release: RwLock<Vec<Hook>>,
    type_finder: RwLock<Option<TypeFinder>>,
    /// Slot each blocked thread is waiting for.
    waiting: Mutex<HashMap<ThreadId, Arc<Binding>>>,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.bindings.read().keys().cloned().collect();
        keys.sort();
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("bindings", &keys)
            .field("aliases", &self.aliases.read().len())
            .field("global_resolving_hooks", &self.global_resolving.read().len())
            .field("global_release_hooks", &self.global_release.read().len())
            .field("has_type_finder", &self.type_finder.read().is_some())
            .finish()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    pub fn new() -> Self {
        Self {
            id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
            bindings: RwLock::new(HashMap::new()),
            aliases: RwLock::new(HashMap::new()),
            global_resolving: RwLock::new(Vec::new()),
            global_release: RwLock::new(Vec::new()),
            type_finder: RwLock::new(None),
            waiting: Mutex::new(HashMap::new()),
        }
    }

    // --- Registration ---

    /// Register a construction recipe for `key`.
    pub fn bind<F>(&self, key: &str, factory: F, singleton: bool) -> Result<BindingRef>
    where
        F: Fn(&Container, &[Instance]) -> Result<Instance> + Send + Sync + 'static,
    {
        self.insert_binding(key, Some(Arc::new(factory)), singleton)
    }

    /// Register a factory whose first result is cached and reused.
    pub fn singleton<F>(&self, key: &str, factory: F) -> Result<BindingRef>
    where
        F: Fn(&Container, &[Instance]) -> Result<Instance> + Send + Sync + 'static,
    {
        self.bind(key, factory, true)
    }

    /// Register a factory that builds a fresh instance on every resolution.
    ///
    /// Transient instances are never cached, so [`Container::release`] has
    /// nothing to discard for them and their release hooks never run. Global
    /// resolving hooks still see every instance; observers that keep state
    /// per instance must let the caller drop it (see
    /// [`LifecycleBridge::detach_instance`](crate::driver::LifecycleBridge::detach_instance)).
    pub fn transient<F>(&self, key: &str, factory: F) -> Result<BindingRef>
    where
        F: Fn(&Container, &[Instance]) -> Result<Instance> + Send + Sync + 'static,
    {
        self.bind(key, factory, false)
    }

    fn insert_binding(
        &self,
        key: &str,
        factory: Option<Factory>,
        singleton: bool,
    ) -> Result<BindingRef> {
        validate_key(key)?;
        if self.aliases.read().contains_key(key) {
            return Err(ContainerError::DuplicateBinding { key: key.to_string() });
        }
        let mut bindings = self.bindings.write();
        match bindings.entry(key.to_string()) {
            Entry::Occupied(_) => Err(ContainerError::DuplicateBinding { key: key.to_string() }),
            Entry::Vacant(slot) => {
                let binding = Arc::new(Binding::new(key.to_string(), factory, singleton));
                slot.insert(binding.clone());
                log::debug!("Bound '{}' (singleton: {})", key, singleton);
                Ok(BindingRef { binding })
            }
        }
    }

    /// Make `alias` resolve to the binding registered under `key`.
    pub fn alias(&self, alias: &str, key: &str) -> Result<()> {
        validate_key(alias)?;
        let target = self.canonical_key(key)?;
        let binding = self
            .binding(&target)
            .ok_or_else(|| ContainerError::BindingNotFound { key: target.clone() })?;
        if self.bindings.read().contains_key(alias) {
            return Err(ContainerError::DuplicateAlias { alias: alias.to_string() });
        }
        match self.aliases.write().entry(alias.to_string()) {
            Entry::Occupied(_) => {
                return Err(ContainerError::DuplicateAlias { alias: alias.to_string() });
            }
            Entry::Vacant(slot) => {
                slot.insert(target.clone());
            }
        }
        binding.aliases.lock().push(alias.to_string());
        Ok(())
    }

    /// Release the cached instance of `key`, then forget the binding and its
    /// aliases. Returns whether a binding existed.
    pub fn unbind(&self, key: &str) -> Result<bool> {
        let key = self.canonical_key(key)?;
        if !self.bindings.read().contains_key(&key) {
            return Ok(false);
        }
        let released = self.release(&key);
        if let Some(binding) = self.bindings.write().remove(&key) {
            let aliases = std::mem::take(&mut *binding.aliases.lock());
            let mut alias_map = self.aliases.write();
            for alias in aliases {
                alias_map.remove(&alias);
            }
        }
        log::debug!("Unbound '{}'", key);
        released.map(|_| true)
    }

    // --- Resolution ---

    /// Resolve `key` with no constructor arguments.
    pub fn make(&self, key: &str) -> Result<Instance> {
        self.make_with(key, &[])
    }

    /// Resolve `key`, passing `args` to the factory when one runs.
    ///
    /// Cached singletons are returned as is and `args` are ignored.
    pub fn make_with(&self, key: &str, args: &[Instance]) -> Result<Instance> {
        let key = self.canonical_key(key)?;
        let _active = ActiveKey::enter(self.id, &key)?;

        let Some(binding) = self.binding(&key) else {
            return self.make_fallback(&key, args);
        };

        if !binding.singleton {
            let instance = self.build(&binding, args)?;
            self.fire_resolving(&binding, &instance)?;
            return Ok(instance);
        }

        let mut slot = self.lock_slot(&binding)?;
        if let Some(instance) = slot.as_ref() {
            return Ok(instance.clone());
        }
        let instance = self.build(&binding, args)?;
        let hooks = self.fire_resolving(&binding, &instance);
        *slot = Some(instance.clone());
        hooks.map(|()| instance)
    }

    /// Resolve `key` and downcast the result.
    pub fn make_as<T: std::any::Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        let instance = self.make(key)?;
        instance.downcast::<T>().ok_or_else(|| ContainerError::TypeMismatch {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
            actual: instance.type_name(),
        })
    }

    fn build(&self, binding: &Binding, args: &[Instance]) -> Result<Instance> {
        let factory = binding
            .factory
            .as_ref()
            .ok_or_else(|| ContainerError::BindingNotFound { key: binding.key.clone() })?;
        log::trace!("Building '{}'", binding.key);
        factory(self, args)
    }

    fn make_fallback(&self, key: &str, args: &[Instance]) -> Result<Instance> {
        let finder = self.type_finder.read().clone();
        let factory = finder
            .and_then(|find| find(key))
            .ok_or_else(|| ContainerError::BindingNotFound { key: key.to_string() })?;
        log::trace!("Building '{}' through the type finder", key);
        let instance = factory(self, args)?;
        let global = self.global_resolving.read().clone();
        run_hooks(key, &instance, HookPhase::Resolving, &global)?;
        Ok(instance)
    }

    // --- Instances ---

    /// Force `value` as the cached singleton of `key`.
    ///
    /// Release hooks run on the previously cached instance before the new one
    /// is installed, and resolving hooks run on the new one. `None` clears the
    /// cached value while keeping the binding. Unbound keys get a factory-less
    /// singleton binding.
    pub fn instance(&self, key: &str, value: Option<Instance>) -> Result<()> {
        let key = self.canonical_key(key)?;
        let binding = self.binding_or_instance_slot(&key);
        if !binding.singleton {
            return Err(ContainerError::NotSingleton { key });
        }
        let _active = ActiveKey::enter(self.id, &key)?;

        let mut slot = self.lock_slot(&binding)?;
        if let (Some(current), Some(next)) = (slot.as_ref(), value.as_ref()) {
            if current.ptr_eq(next) {
                return Ok(());
            }
        }

        let released = match slot.as_ref() {
            Some(previous) => {
                log::debug!("Replacing cached instance of '{}'", key);
                self.fire_release(&binding, previous)
            }
            None => Ok(()),
        };
        *slot = None;

        let resolved = match value {
            Some(next) => {
                let hooks = self.fire_resolving(&binding, &next);
                *slot = Some(next);
                hooks
            }
            None => Ok(()),
        };
        released.and(resolved)
    }

    /// Drop the cached singleton of `key`, running its release hooks once.
    ///
    /// The binding stays registered, so the next `make` builds a fresh value.
    /// Returns whether an instance was released.
    pub fn release(&self, key: &str) -> Result<bool> {
        let key = self.canonical_key(key)?;
        let Some(binding) = self.binding(&key) else {
            return Ok(false);
        };
        let _active = ActiveKey::enter(self.id, &key)?;

        let mut slot = self.lock_slot(&binding)?;
        let Some(instance) = slot.as_ref().cloned() else {
            return Ok(false);
        };
        log::debug!("Releasing cached instance of '{}'", key);
        let hooks = self.fire_release(&binding, &instance);
        *slot = None;
        hooks.map(|()| true)
    }

    // --- Hooks ---

    /// Register a resolving hook for one key.
    pub fn on_resolving<F>(&self, key: &str, hook: F) -> Result<()>
    where
        F: Fn(&str, &Instance) -> std::result::Result<(), HookError> + Send + Sync + 'static,
    {
        let binding = self.require_binding(key)?;
        binding.resolving.write().push(Arc::new(hook));
        Ok(())
    }

    /// Register a release hook for one key.
    pub fn on_release<F>(&self, key: &str, hook: F) -> Result<()>
    where
        F: Fn(&str, &Instance) -> std::result::Result<(), HookError> + Send + Sync + 'static,
    {
        let binding = self.require_binding(key)?;
        binding.release.write().push(Arc::new(hook));
        Ok(())
    }

    /// Register a resolving hook that runs for every key, after the key's
    /// own hooks.
    pub fn on_resolving_any<F>(&self, hook: F)
    where
        F: Fn(&str, &Instance) -> std::result::Result<(), HookError> + Send + Sync + 'static,
    {
        self.global_resolving.write().push(Arc::new(hook));
    }

    /// Register a release hook that runs for every key, after the key's own
    /// hooks.
    pub fn on_release_any<F>(&self, hook: F)
    where
        F: Fn(&str, &Instance) -> std::result::Result<(), HookError> + Send + Sync + 'static,
    {
        self.global_release.write().push(Arc::new(hook));
    }

    fn fire_resolving(&self, binding: &Binding, instance: &Instance) -> Result<()> {
        let mut hooks = binding.resolving_hooks();
        hooks.extend(self.global_resolving.read().iter().cloned());
        run_hooks(&binding.key, instance, HookPhase::Resolving, &hooks)
    }

    fn fire_release(&self, binding: &Binding, instance: &Instance) -> Result<()> {
        let mut hooks = binding.release_hooks();
        hooks.extend(self.global_release.read().iter().cloned());
        run_hooks(&binding.key, instance, HookPhase::Release, &hooks)
    }

    // --- Type finder ---

    /// Install (or remove) the fallback used when `make` misses.
    pub fn set_type_finder(&self, finder: Option<TypeFinder>) {
        *self.type_finder.write() = finder;
    }

    pub fn type_finder(&self) -> Option<TypeFinder> {
        self.type_finder.read().clone()
    }

    // --- Queries ---

    pub fn is_bound(&self, key: &str) -> bool {
        self.bindings.read().contains_key(key) || self.aliases.read().contains_key(key)
    }

    pub fn is_alias(&self, key: &str) -> bool {
        self.aliases.read().contains_key(key)
    }

    /// Whether `key` currently holds a cached singleton.
    pub fn has_instance(&self, key: &str) -> bool {
        let Ok(key) = self.canonical_key(key) else {
            return false;
        };
        let Some(binding) = self.binding(&key) else {
            return false;
        };
        match self.lock_slot(&binding) {
            Ok(slot) => slot.is_some(),
            Err(_) => false,
        }
    }

    /// Registered keys, sorted.
    pub fn bound_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.bindings.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    // --- Internals ---

    fn canonical_key(&self, key: &str) -> Result<String> {
        validate_key(key)?;
        Ok(self
            .aliases
            .read()
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string()))
    }

    fn binding(&self, key: &str) -> Option<Arc<Binding>> {
        self.bindings.read().get(key).cloned()
    }

    fn require_binding(&self, key: &str) -> Result<Arc<Binding>> {
        let key = self.canonical_key(key)?;
        self.binding(&key)
            .ok_or(ContainerError::BindingNotFound { key })
    }

    /// Lock the cache slot of `binding`, refusing to wait when the thread
    /// holding it is (transitively) waiting for a slot this thread holds.
    fn lock_slot<'a>(&self, binding: &'a Arc<Binding>) -> Result<SlotGuard<'a>> {
        let me = thread::current().id();
        if let Some(slot) = binding.slot.try_lock() {
            return Ok(SlotGuard::claim(binding, slot, me));
        }
        {
            let mut waiting = self.waiting.lock();
            if let Some(path) = wait_cycle(&waiting, binding, me) {
                log::warn!("Refusing to wait for '{}': {}", binding.key, path.join(" -> "));
                return Err(ContainerError::CircularDependency {
                    key: binding.key.clone(),
                    path,
                });
            }
            waiting.insert(me, binding.clone());
        }
        let slot = binding.slot.lock();
        self.waiting.lock().remove(&me);
        Ok(SlotGuard::claim(binding, slot, me))
    }

    fn binding_or_instance_slot(&self, key: &str) -> Arc<Binding> {
        self.bindings
            .write()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Binding::new(key.to_string(), None, true)))
            .clone()
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(ContainerError::EmptyKey);
    }
    Ok(())
}

/// Follow slot owners through the wait map starting at `wanted`. Returns the
/// key path when the chain comes back to `me`, starting and ending with the
/// key `me` holds.
fn wait_cycle(
    waiting: &HashMap<ThreadId, Arc<Binding>>,
    wanted: &Binding,
    me: ThreadId,
) -> Option<Vec<String>> {
    let mut path = vec![wanted.key.clone()];
    let mut owner = *wanted.owner.lock();
    for _ in 0..=waiting.len() {
        let thread = owner?;
        if thread == me {
            if let Some(held) = path.last().cloned() {
                path.insert(0, held);
            }
            return Some(path);
        }
        let next = waiting.get(&thread)?;
        path.push(next.key.clone());
        owner = *next.owner.lock();
    }
    None
}

/// Run every hook, collecting failures instead of stopping at the first one.
fn run_hooks(key: &str, instance: &Instance, phase: HookPhase, hooks: &[Hook]) -> Result<()> {
    let errors: Vec<HookError> = hooks
        .iter()
        .filter_map(|hook| hook(key, instance).err())
        .collect();
    if errors.is_empty() {
        return Ok(());
    }
    log::warn!("{} {} hook(s) failed for '{}'", errors.len(), phase, key);
    Err(ContainerError::Hooks {
        key: key.to_string(),
        phase,
        errors,
    })
}
