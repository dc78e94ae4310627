use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use globset::{GlobBuilder, GlobMatcher};
use parking_lot::RwLock;

use crate::event::error::{EventError, Result};
use crate::event::types::{EventResponse, Payload};
use crate::event::{DEFAULT_LISTENER_PRIORITY, EventId};

type Listener = Arc<dyn Fn(&Payload) -> Payload + Send + Sync>;

/// Registration options for [`EventDispatcher::on_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Lower values run first.
    pub priority: i32,
    /// Number of matching triggers after which the listener removes itself.
    /// `None` keeps it until cancelled.
    pub times: Option<usize>,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            priority: DEFAULT_LISTENER_PRIORITY,
            times: None,
        }
    }
}

impl ListenerOptions {
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn times(mut self, times: usize) -> Self {
        self.times = Some(times);
        self
    }
}

struct ListenerEntry {
    id: EventId,
    pattern: String,
    matcher: Option<GlobMatcher>,
    priority: i32,
    remaining: Option<AtomicUsize>,
    active: AtomicBool,
    listener: Listener,
}

impl ListenerEntry {
    fn order(&self) -> (i32, EventId) {
        (self.priority, self.id)
    }

    fn matches(&self, name: &str) -> bool {
        match &self.matcher {
            Some(matcher) => matcher.is_match(name),
            None => self.pattern == name,
        }
    }

    /// Claim one invocation. Returns `(run, exhausted)`.
    fn claim(&self) -> (bool, bool) {
        if !self.active.load(Ordering::Acquire) {
            return (false, false);
        }
        let Some(remaining) = &self.remaining else {
            return (true, false);
        };
        match remaining.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1)) {
            Ok(1) => {
                self.active.store(false, Ordering::Release);
                (true, true)
            }
            Ok(_) => (true, false),
            Err(_) => (false, false),
        }
    }
}

#[derive(Default)]
struct DispatcherState {
    exact: HashMap<String, Vec<Arc<ListenerEntry>>>,
    wildcard: Vec<Arc<ListenerEntry>>,
    next_id: EventId,
}

impl DispatcherState {
    fn insert(&mut self, entry: Arc<ListenerEntry>) {
        let list = if entry.matcher.is_some() {
            &mut self.wildcard
        } else {
            self.exact.entry(entry.pattern.clone()).or_default()
        };
        // Ids grow monotonically, so ties on priority keep registration order.
        let at = list.partition_point(|e| e.order() <= entry.order());
        list.insert(at, entry);
    }

    fn remove(&mut self, id: EventId) -> bool {
        let mut found = false;
        let mut retain = |list: &mut Vec<Arc<ListenerEntry>>| {
            list.retain(|e| {
                if e.id == id {
                    e.active.store(false, Ordering::Release);
                    found = true;
                    false
                } else {
                    true
                }
            });
        };
        self.exact.values_mut().for_each(&mut retain);
        retain(&mut self.wildcard);
        self.exact.retain(|_, list| !list.is_empty());
        found
    }

    /// Matching listeners in invocation order.
    fn matching(&self, name: &str) -> Vec<Arc<ListenerEntry>> {
        let mut entries: Vec<Arc<ListenerEntry>> =
            self.exact.get(name).cloned().unwrap_or_default();
        let wildcard: Vec<Arc<ListenerEntry>> = self
            .wildcard
            .iter()
            .filter(|e| e.matches(name))
            .cloned()
            .collect();
        if !wildcard.is_empty() {
            entries.extend(wildcard);
            entries.sort_by_key(|e| e.order());
        }
        entries
    }
}

/// Priority-ordered event dispatcher.
///
/// Cloning is cheap and every clone shares the same listener table.
/// Listeners run synchronously on the triggering thread, without any
/// internal lock held, so they may register or cancel listeners themselves.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    state: Arc<RwLock<DispatcherState>>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        let exact: usize = state.exact.values().map(Vec::len).sum();
        f.debug_struct("EventDispatcher")
            .field("listeners", &exact)
            .field("wildcard_listeners", &state.wildcard.len())
            .field("next_id", &state.next_id)
            .finish()
    }
}

impl EventDispatcher {
    /// Container key the dispatcher is bound under.
    pub const KEY: &'static str = "events.dispatcher";

    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `name` with the default priority.
    pub fn on<F>(&self, name: &str, listener: F) -> Result<ListenerHandle>
    where
        F: Fn(&Payload) -> Payload + Send + Sync + 'static,
    {
        self.on_with(name, ListenerOptions::default(), listener)
    }

    /// Register a listener that removes itself after its first invocation.
    pub fn once<F>(&self, name: &str, listener: F) -> Result<ListenerHandle>
    where
        F: Fn(&Payload) -> Payload + Send + Sync + 'static,
    {
        self.on_with(name, ListenerOptions::default().times(1), listener)
    }

    /// Register `listener` for `name`, which may contain `*` wildcards.
    pub fn on_with<F>(
        &self,
        name: &str,
        options: ListenerOptions,
        listener: F,
    ) -> Result<ListenerHandle>
    where
        F: Fn(&Payload) -> Payload + Send + Sync + 'static,
    {
        validate_name(name)?;
        if options.times == Some(0) {
            return Err(EventError::InvalidRepeatCount {
                event_name: name.to_string(),
            });
        }
        let matcher = if name.contains('*') {
            let glob = GlobBuilder::new(name)
                .literal_separator(false)
                .build()
                .map_err(|e| EventError::InvalidPattern {
                    pattern: name.to_string(),
                    reason: e.to_string(),
                })?;
            Some(glob.compile_matcher())
        } else {
            None
        };

        let mut state = self.state.write();
        state.next_id += 1;
        let entry = Arc::new(ListenerEntry {
            id: state.next_id,
            pattern: name.to_string(),
            matcher,
            priority: options.priority,
            remaining: options.times.map(AtomicUsize::new),
            active: AtomicBool::new(true),
            listener: Arc::new(listener),
        });
        let handle = ListenerHandle {
            id: entry.id,
            event: entry.pattern.clone(),
            entry: Arc::downgrade(&entry),
            state: Arc::downgrade(&self.state),
        };
        state.insert(entry);
        log::trace!("Registered listener {} for '{}'", handle.id, name);
        Ok(handle)
    }

    /// Invoke every listener for `name` and collect their results.
    pub fn trigger(&self, name: &str, payload: Payload) -> Result<EventResponse> {
        validate_name(name)?;
        let entries = self.state.read().matching(name);
        let mut results = Vec::new();
        for entry in entries {
            if let Some(value) = self.invoke(&entry, &payload) {
                results.push(value);
            }
        }
        log::trace!("Triggered '{}' ({} listener(s))", name, results.len());
        Ok(EventResponse::from_results(results))
    }

    /// Invoke listeners for `name` in order until one returns a non-empty
    /// payload, and return that payload.
    pub fn trigger_halt(&self, name: &str, payload: Payload) -> Result<Option<Payload>> {
        validate_name(name)?;
        let entries = self.state.read().matching(name);
        for entry in entries {
            if let Some(value) = self.invoke(&entry, &payload) {
                if value.is_some() {
                    return Ok(Some(value));
                }
            }
        }
        Ok(None)
    }

    fn invoke(&self, entry: &Arc<ListenerEntry>, payload: &Payload) -> Option<Payload> {
        let (run, exhausted) = entry.claim();
        if exhausted {
            self.state.write().remove(entry.id);
        }
        run.then(|| (entry.listener)(payload))
    }

    /// Remove the listener registered under `id`.
    pub fn unregister(&self, id: EventId) -> bool {
        self.state.write().remove(id)
    }

    /// Remove every listener registered with exactly `name` (wildcard
    /// patterns are removed by their pattern text). Returns how many were
    /// removed.
    pub fn off(&self, name: &str) -> usize {
        let mut state = self.state.write();
        let mut removed = state.exact.remove(name).unwrap_or_default();
        let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.wildcard)
            .into_iter()
            .partition(|e| e.pattern == name);
        state.wildcard = kept;
        removed.extend(gone);
        for entry in &removed {
            entry.active.store(false, Ordering::Release);
        }
        removed.len()
    }

    /// Whether triggering `name` would reach at least one listener.
    pub fn has_listeners(&self, name: &str) -> bool {
        !self.state.read().matching(name).is_empty()
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.state.read().matching(name).len()
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(EventError::EmptyName);
    }
    Ok(())
}

/// Registration handle returned by the dispatcher.
///
/// Dropping the handle does not remove the listener; call
/// [`ListenerHandle::cancel`].
#[derive(Clone)]
pub struct ListenerHandle {
    id: EventId,
    event: String,
    entry: Weak<ListenerEntry>,
    state: Weak<RwLock<DispatcherState>>,
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("active", &self.is_active())
            .finish()
    }
}

impl ListenerHandle {
    pub fn id(&self) -> EventId {
        self.id
    }

    /// The event name or pattern the listener was registered for.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Remove the listener. Returns false if it was already gone.
    pub fn cancel(&self) -> bool {
        match self.state.upgrade() {
            Some(state) => state.write().remove(self.id),
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.strong_count() > 0
            && self
                .entry
                .upgrade()
                .is_some_and(|entry| entry.active.load(Ordering::Acquire))
    }
}
