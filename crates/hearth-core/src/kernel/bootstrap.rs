use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, RwLock};
use semver::Version;

use crate::container::{Container, Factory, Instance};
use crate::event::{
    EventDispatcher, EventResponse, ListenerHandle, ListenerOptions, Payload, SystemEvent,
};
use crate::kernel::constants;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::kernel::provider::{ProviderEntry, SharedProvider};
use crate::kernel::settings::KernelSettings;
use crate::kernel::stage::SharedStage;

static NEXT_UNIQUE_ID: AtomicU64 = AtomicU64::new(1);

type StartCallback = Box<dyn FnOnce(&Application) + Send>;

/// Where the application is in its lifecycle. Only forward transitions are
/// legal; failed steps roll back to the previous resting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProcessState {
    Uninitialized,
    Bootstrapping,
    Bootstrapped,
    Initializing,
    Inited,
}

/// The process state machine.
///
/// Owns the binding container and drives the bootstrap pipeline and the
/// two-phase provider lifecycle (every `register`, then every `init`).
pub struct Application {
    container: Arc<Container>,
    state: RwLock<ProcessState>,
    providers: Mutex<Vec<ProviderEntry>>,
    next_seq: AtomicU64,
    main_thread: ThreadId,
    settings: KernelSettings,
    version: Version,
    start_callbacks: Mutex<Vec<StartCallback>>,
    terminated: AtomicBool,
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.settings.name)
            .field("state", &*self.state.read())
            .field("providers", &self.provider_names())
            .field("version", &self.version)
            .field("main_thread", &self.main_thread)
            .finish()
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl Application {
    /// Creates an application with default settings. The calling thread
    /// becomes the main thread.
    pub fn new() -> Self {
        Self::with_settings(KernelSettings::default())
    }

    pub fn with_settings(settings: KernelSettings) -> Self {
        Self {
            container: Arc::new(Container::new()),
            state: RwLock::new(ProcessState::Uninitialized),
            providers: Mutex::new(Vec::new()),
            next_seq: AtomicU64::new(0),
            main_thread: thread::current().id(),
            settings,
            version: kernel_version(),
            start_callbacks: Mutex::new(Vec::new()),
            terminated: AtomicBool::new(false),
        }
    }

    // --- Accessors ---

    pub fn process(&self) -> ProcessState {
        *self.state.read()
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn settings(&self) -> &KernelSettings {
        &self.settings
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn main_thread_id(&self) -> ThreadId {
        self.main_thread
    }

    /// Whether the calling thread is the one that created the application.
    pub fn is_main_thread(&self) -> bool {
        thread::current().id() == self.main_thread
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// A process-wide unique identifier; distinct on every call.
    pub fn unique_id() -> String {
        let n = NEXT_UNIQUE_ID.fetch_add(1, Ordering::Relaxed);
        format!("{:08x}-{:016x}", std::process::id(), n)
    }

    /// Names of registered providers, in registration order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.lock().iter().map(|e| e.name.clone()).collect()
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.lock().iter().any(|e| e.name == name)
    }

    // --- Bootstrap ---

    /// Run `stages` in order and move to `Bootstrapped`.
    ///
    /// A no-op once the application has left `Uninitialized`. If a stage
    /// fails the application returns to `Uninitialized` and every provider
    /// registered so far is forgotten.
    pub fn bootstrap(&self, stages: &[SharedStage]) -> Result<()> {
        if let Some(stage) = stages.iter().find(|s| s.id().trim().is_empty()) {
            return Err(Error::InvalidArgument(format!(
                "bootstrap stage with an empty id ({})",
                stage.description()
            )));
        }
        {
            let mut state = self.state.write();
            if *state != ProcessState::Uninitialized {
                log::debug!("Bootstrap skipped, application is {:?}", *state);
                return Ok(());
            }
            *state = ProcessState::Bootstrapping;
        }
        log::info!(
            "Bootstrapping {} (kernel {}, {} stage(s))",
            self.settings.name,
            self.version,
            stages.len()
        );

        for stage in stages {
            log::debug!("Running bootstrap stage '{}'", stage.id());
            if let Err(e) = stage.bootstrap(self) {
                log::error!("Bootstrap stage '{}' failed: {}", stage.id(), e);
                self.providers.lock().clear();
                *self.state.write() = ProcessState::Uninitialized;
                return Err(Error::StageFailed {
                    stage: stage.id().to_string(),
                    source: Box::new(e),
                });
            }
        }

        *self.state.write() = ProcessState::Bootstrapped;
        log::info!("Bootstrap complete");
        Ok(())
    }

    // --- Providers ---

    /// Add a provider.
    ///
    /// Legal while bootstrapping, once bootstrapped, and during `init` (the
    /// provider is then registered and initialized immediately).
    pub fn register(&self, provider: SharedProvider) -> Result<()> {
        let name = provider.name().to_string();
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument("provider name must not be empty".into()));
        }
        if let Some(required) = provider.compatible_kernel() {
            if !required.matches(&self.version) {
                return Err(Error::IncompatibleProvider {
                    name,
                    required,
                    actual: self.version.clone(),
                });
            }
        }

        // The state guard spans the push so `init` cannot snapshot the
        // provider list between the check and the insert.
        let (state, seq) = {
            let state = self.state.read();
            match *state {
                ProcessState::Uninitialized => {
                    return Err(Error::lifecycle(
                        KernelLifecyclePhase::Register,
                        format!("cannot register '{name}' before the application is bootstrapped"),
                    ));
                }
                ProcessState::Inited => {
                    return Err(Error::lifecycle(
                        KernelLifecyclePhase::Register,
                        format!(
                            "cannot register '{name}' after the application has finished initializing"
                        ),
                    ));
                }
                _ => {}
            }

            let mut providers = self.providers.lock();
            if providers.iter().any(|e| e.name == name) {
                return Err(Error::DuplicateProvider { name });
            }
            let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
            let late = *state == ProcessState::Initializing;
            providers.push(ProviderEntry::new(provider.clone(), seq, late));
            (*state, seq)
        };
        log::debug!("Registered provider '{}' (priority {})", name, provider.priority());

        if state == ProcessState::Initializing {
            log::info!("Late registration of provider '{}'", name);
            let outcome = provider
                .register(self)
                .map_err(|e| Error::provider_failed(KernelLifecyclePhase::Register, &name, e))
                .and_then(|()| {
                    self.mark(seq, |e| e.registered = true);
                    provider
                        .init(self)
                        .map_err(|e| Error::provider_failed(KernelLifecyclePhase::Init, &name, e))
                });
            match outcome {
                Ok(()) => self.mark(seq, |e| e.inited = true),
                Err(e) => {
                    self.providers.lock().retain(|entry| entry.seq != seq);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn mark(&self, seq: u64, update: impl FnOnce(&mut ProviderEntry)) {
        if let Some(entry) = self.providers.lock().iter_mut().find(|e| e.seq == seq) {
            update(entry);
        }
    }

    /// Snapshot of the providers still needing a phase, in run order. Late
    /// registrations run their own phases and are left out.
    fn pending(
        &self,
        done: impl Fn(&ProviderEntry) -> bool,
        order: impl Fn(&ProviderEntry) -> (i32, u64),
    ) -> Vec<ProviderEntry> {
        let mut pending: Vec<ProviderEntry> = self
            .providers
            .lock()
            .iter()
            .filter(|e| !e.late && !done(e))
            .cloned()
            .collect();
        pending.sort_by_key(|e| order(e));
        pending
    }

    /// Register every provider, then initialize every provider, then fire
    /// [`SystemEvent::StartCompleted`].
    ///
    /// On failure the application goes back to `Bootstrapped`; providers
    /// that already completed a phase are not run again by the next `init`.
    pub fn init(&self) -> Result<()> {
        {
            let mut state = self.state.write();
            match *state {
                ProcessState::Bootstrapped => *state = ProcessState::Initializing,
                ProcessState::Inited => {
                    return Err(Error::lifecycle(
                        KernelLifecyclePhase::Init,
                        "application is already initialized",
                    ));
                }
                ProcessState::Initializing => {
                    return Err(Error::lifecycle(
                        KernelLifecyclePhase::Init,
                        "application is already initializing",
                    ));
                }
                ProcessState::Uninitialized | ProcessState::Bootstrapping => {
                    return Err(Error::lifecycle(
                        KernelLifecyclePhase::Init,
                        "application must be bootstrapped before init",
                    ));
                }
            }
        }
        log::info!("Initializing providers...");

        if let Err(e) = self.run_provider_phases() {
            log::error!("Initialization failed: {}", e);
            *self.state.write() = ProcessState::Bootstrapped;
            return Err(e);
        }

        // Resolved before committing; a failure leaves the application
        // `Bootstrapped` with its start callbacks still queued.
        let dispatcher = match self.dispatcher() {
            Ok(dispatcher) => dispatcher,
            Err(e) => {
                log::error!("Initialization failed: {}", e);
                *self.state.write() = ProcessState::Bootstrapped;
                return Err(e);
            }
        };

        *self.state.write() = ProcessState::Inited;
        log::info!("Application initialized ({} provider(s))", self.provider_names().len());

        if let Some(dispatcher) = dispatcher {
            dispatcher.trigger(SystemEvent::StartCompleted.name(), Payload::none())?;
        }
        let callbacks = std::mem::take(&mut *self.start_callbacks.lock());
        for callback in callbacks {
            callback(self);
        }
        Ok(())
    }

    fn run_provider_phases(&self) -> Result<()> {
        for entry in self.pending(|e| e.registered, ProviderEntry::register_order) {
            log::debug!("Registering provider '{}'", entry.name);
            entry
                .provider
                .register(self)
                .map_err(|e| Error::provider_failed(KernelLifecyclePhase::Register, &entry.name, e))?;
            self.mark(entry.seq, |e| e.registered = true);
        }
        for entry in self.pending(|e| e.inited, ProviderEntry::init_order) {
            log::debug!("Initializing provider '{}'", entry.name);
            entry
                .provider
                .init(self)
                .map_err(|e| Error::provider_failed(KernelLifecyclePhase::Init, &entry.name, e))?;
            self.mark(entry.seq, |e| e.inited = true);
        }
        Ok(())
    }

    /// Run `callback` once the application has finished `init`, or right
    /// away if it already has.
    pub fn on_start_completed<F>(&self, callback: F)
    where
        F: FnOnce(&Application) + Send + 'static,
    {
        if self.process() == ProcessState::Inited {
            callback(self);
        } else {
            self.start_callbacks.lock().push(Box::new(callback));
        }
    }

    /// Fire [`SystemEvent::Terminating`]. Only legal once initialized, and
    /// only once.
    pub fn terminate(&self) -> Result<()> {
        if self.process() != ProcessState::Inited {
            return Err(Error::lifecycle(
                KernelLifecyclePhase::Terminate,
                "application is not initialized",
            ));
        }
        if self.terminated.swap(true, Ordering::AcqRel) {
            return Err(Error::lifecycle(
                KernelLifecyclePhase::Terminate,
                "application is already terminated",
            ));
        }
        log::info!("Terminating {}", self.settings.name);
        self.trigger(SystemEvent::Terminating.name(), Payload::none())?;
        Ok(())
    }

    // --- Type lookup ---

    /// Install the name-to-implementation strategy used by bootstrap stages
    /// and by container resolution of unbound names.
    pub fn on_find_type<F>(&self, finder: F)
    where
        F: Fn(&str) -> Option<Factory> + Send + Sync + 'static,
    {
        self.container.set_type_finder(Some(Arc::new(finder)));
    }

    pub fn find_type(&self, name: &str) -> Result<Factory> {
        let finder = self.container.type_finder().ok_or_else(|| Error::TypeLookup {
            name: name.to_string(),
            reason: "no type finder installed".to_string(),
        })?;
        finder(name).ok_or_else(|| Error::TypeLookup {
            name: name.to_string(),
            reason: "unknown type".to_string(),
        })
    }

    // --- Resolution ---

    fn ensure_resolvable(&self, key: &str) -> Result<()> {
        if self.process() == ProcessState::Uninitialized {
            return Err(Error::lifecycle(
                KernelLifecyclePhase::Resolve,
                format!("cannot resolve '{key}' before the application is bootstrapped"),
            ));
        }
        Ok(())
    }

    pub fn make(&self, key: &str) -> Result<Instance> {
        self.ensure_resolvable(key)?;
        Ok(self.container.make(key)?)
    }

    pub fn make_as<T: std::any::Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        self.ensure_resolvable(key)?;
        Ok(self.container.make_as::<T>(key)?)
    }

    // --- Events ---

    /// The installed dispatcher, if an events provider bound one.
    pub fn dispatcher(&self) -> Result<Option<Arc<EventDispatcher>>> {
        if !self.container.is_bound(EventDispatcher::KEY) {
            return Ok(None);
        }
        Ok(Some(self.container.make_as::<EventDispatcher>(EventDispatcher::KEY)?))
    }

    /// Register a listener. `None` when no dispatcher is installed.
    pub fn on<F>(&self, name: &str, listener: F) -> Result<Option<ListenerHandle>>
    where
        F: Fn(&Payload) -> Payload + Send + Sync + 'static,
    {
        self.on_with(name, ListenerOptions::default(), listener)
    }

    pub fn on_with<F>(
        &self,
        name: &str,
        options: ListenerOptions,
        listener: F,
    ) -> Result<Option<ListenerHandle>>
    where
        F: Fn(&Payload) -> Payload + Send + Sync + 'static,
    {
        match self.dispatcher()? {
            Some(dispatcher) => Ok(Some(dispatcher.on_with(name, options, listener)?)),
            None => Ok(None),
        }
    }

    /// Trigger `name`. Without a dispatcher this yields an empty sequence.
    pub fn trigger(&self, name: &str, payload: Payload) -> Result<EventResponse> {
        match self.dispatcher()? {
            Some(dispatcher) => Ok(dispatcher.trigger(name, payload)?),
            None => Ok(EventResponse::empty()),
        }
    }

    /// First non-empty listener result for `name`. Without a dispatcher this
    /// yields `None`.
    pub fn trigger_halt(&self, name: &str, payload: Payload) -> Result<Option<Payload>> {
        match self.dispatcher()? {
            Some(dispatcher) => Ok(dispatcher.trigger_halt(name, payload)?),
            None => Ok(None),
        }
    }
}

fn kernel_version() -> Version {
    // Cargo guarantees a valid semver package version.
    Version::parse(constants::KERNEL_VERSION).unwrap_or_else(|_| Version::new(0, 0, 0))
}
