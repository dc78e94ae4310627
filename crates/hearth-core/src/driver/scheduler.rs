use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::container::InstanceId;
use crate::driver::error::{DriverError, Result};
use crate::driver::{Capabilities, SharedBehaviour};

type Action = Box<dyn FnOnce() + Send>;
type Steps = Box<dyn Iterator<Item = ()> + Send>;

const SEQ_PENDING: u8 = 0;
const SEQ_RUNNING: u8 = 1;
const SEQ_FINISHED: u8 = 2;
const SEQ_CANCELLED: u8 = 3;

struct SequenceSlot {
    id: u64,
    state: AtomicU8,
    steps: Mutex<Option<Steps>>,
}

impl SequenceSlot {
    fn is_live(&self) -> bool {
        matches!(self.state.load(Ordering::Acquire), SEQ_PENDING | SEQ_RUNNING)
    }

    /// Advance by one suspension point. Returns whether the sequence is
    /// still live afterwards.
    fn step(&self) -> bool {
        if !self.is_live() {
            return false;
        }
        let _ = self.state.compare_exchange(
            SEQ_PENDING,
            SEQ_RUNNING,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        let mut steps = self.steps.lock();
        let more = steps.as_mut().is_some_and(|it| it.next().is_some());
        if !more {
            *steps = None;
            let _ = self.state.compare_exchange(
                SEQ_RUNNING,
                SEQ_FINISHED,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            return false;
        }
        if self.state.load(Ordering::Acquire) == SEQ_CANCELLED {
            // Cancelled from inside its own step.
            *steps = None;
            return false;
        }
        true
    }

    fn cancel(&self) -> bool {
        let cancelled = [SEQ_PENDING, SEQ_RUNNING].into_iter().any(|from| {
            self.state
                .compare_exchange(from, SEQ_CANCELLED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        });
        if cancelled {
            if let Some(mut steps) = self.steps.try_lock() {
                *steps = None;
            }
        }
        cancelled
    }
}

/// Handle to an enqueued step-sequence.
#[derive(Clone)]
pub struct SequenceHandle {
    slot: Arc<SequenceSlot>,
}

impl fmt::Debug for SequenceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceHandle")
            .field("id", &self.slot.id)
            .field("state", &self.slot.state.load(Ordering::Acquire))
            .finish()
    }
}

impl SequenceHandle {
    pub fn id(&self) -> u64 {
        self.slot.id
    }

    /// Stop the sequence before its next step. Returns false if it had
    /// already finished or been cancelled.
    pub fn cancel(&self) -> bool {
        self.slot.cancel()
    }

    pub fn is_live(&self) -> bool {
        self.slot.is_live()
    }

    pub fn is_finished(&self) -> bool {
        self.slot.state.load(Ordering::Acquire) == SEQ_FINISHED
    }

    pub fn is_cancelled(&self) -> bool {
        self.slot.state.load(Ordering::Acquire) == SEQ_CANCELLED
    }
}

enum Task {
    Action(Action),
    Steps(Arc<SequenceSlot>),
}

struct Attachment {
    id: InstanceId,
    behaviour: SharedBehaviour,
    capabilities: Capabilities,
    live: AtomicBool,
}

impl Attachment {
    /// Mark the attachment dead and run `on_destroy` if this call was the
    /// one that killed it.
    fn destroy(&self) -> bool {
        if !self.live.swap(false, Ordering::AcqRel) {
            return false;
        }
        if self.capabilities.contains(Capabilities::DESTROY) {
            log::trace!("Destroying '{}'", self.behaviour.name());
            self.behaviour.on_destroy();
        }
        true
    }
}

/// Main-thread scheduler.
///
/// Any thread may enqueue work; only the main thread may [`tick`](Driver::tick).
pub struct Driver {
    main_thread: ThreadId,
    queue: Mutex<VecDeque<Task>>,
    sequences: Mutex<Vec<Arc<SequenceSlot>>>,
    attached: Mutex<Vec<Arc<Attachment>>>,
    next_sequence: AtomicU64,
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("main_thread", &self.main_thread)
            .field("pending", &self.pending_count())
            .field("live_sequences", &self.live_sequence_count())
            .field("attached", &self.attached_count())
            .finish()
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver {
    /// Container key the driver is bound under.
    pub const KEY: &'static str = "driver.scheduler";

    /// A driver whose main thread is the calling thread.
    pub fn new() -> Self {
        Self::with_main_thread(thread::current().id())
    }

    pub fn with_main_thread(main_thread: ThreadId) -> Self {
        Self {
            main_thread,
            queue: Mutex::new(VecDeque::new()),
            sequences: Mutex::new(Vec::new()),
            attached: Mutex::new(Vec::new()),
            next_sequence: AtomicU64::new(1),
        }
    }

    pub fn main_thread_id(&self) -> ThreadId {
        self.main_thread
    }

    pub fn is_main_thread(&self) -> bool {
        thread::current().id() == self.main_thread
    }

    fn require_main_thread(&self, operation: &'static str) -> Result<()> {
        if !self.is_main_thread() {
            return Err(DriverError::NotMainThread { operation });
        }
        Ok(())
    }

    // --- Enqueue ---

    /// Run `action` now if called on the main thread, otherwise queue it for
    /// the next tick.
    pub fn enqueue_on_main_thread<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_main_thread() {
            action();
        } else {
            self.queue.lock().push_back(Task::Action(Box::new(action)));
        }
    }

    /// Schedule a step-sequence: each item the iterator yields is one
    /// suspension point, and the driver advances it once per tick.
    ///
    /// On the main thread the sequence starts right away (runs to its first
    /// suspension point); elsewhere it starts on the tick that drains it.
    pub fn enqueue_steps<I>(&self, steps: I) -> SequenceHandle
    where
        I: IntoIterator<Item = ()>,
        I::IntoIter: Send + 'static,
    {
        let slot = Arc::new(SequenceSlot {
            id: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            state: AtomicU8::new(SEQ_PENDING),
            steps: Mutex::new(Some(Box::new(steps.into_iter()))),
        });
        if self.is_main_thread() {
            if slot.step() {
                self.sequences.lock().push(slot.clone());
            }
        } else {
            self.queue.lock().push_back(Task::Steps(slot.clone()));
        }
        SequenceHandle { slot }
    }

    pub fn cancel(&self, handle: &SequenceHandle) -> bool {
        handle.cancel()
    }

    // --- Ticks ---

    /// Drain queued work in FIFO order, advance every live step-sequence by
    /// one step, then call `update` on every attached object.
    ///
    /// Sequences started while draining are not stepped again on the same
    /// tick.
    pub fn tick(&self) -> Result<()> {
        self.require_main_thread("tick")?;

        let drained: Vec<Task> = self.queue.lock().drain(..).collect();
        let mut started = Vec::new();
        for task in drained {
            match task {
                Task::Action(action) => action(),
                Task::Steps(slot) => {
                    if slot.step() {
                        started.push(slot);
                    }
                }
            }
        }

        let live = std::mem::take(&mut *self.sequences.lock());
        let still_live: Vec<Arc<SequenceSlot>> = live.into_iter().filter(|s| s.step()).collect();
        {
            let mut sequences = self.sequences.lock();
            // Sequences enqueued by the steps above run after the older ones.
            let added = std::mem::take(&mut *sequences);
            *sequences = still_live;
            sequences.extend(started);
            sequences.extend(added);
        }

        for attachment in self.snapshot(Capabilities::UPDATE) {
            if attachment.live.load(Ordering::Acquire) {
                attachment.behaviour.update();
            }
        }
        Ok(())
    }

    /// Call `late_update` on every object still attached, in attachment
    /// order.
    pub fn late_tick(&self) -> Result<()> {
        self.require_main_thread("late_tick")?;
        for attachment in self.snapshot(Capabilities::LATE_UPDATE) {
            if attachment.live.load(Ordering::Acquire) {
                attachment.behaviour.late_update();
            }
        }
        Ok(())
    }

    fn snapshot(&self, capability: Capabilities) -> Vec<Arc<Attachment>> {
        self.attached
            .lock()
            .iter()
            .filter(|a| a.capabilities.contains(capability))
            .cloned()
            .collect()
    }

    // --- Attachments ---

    /// Add `behaviour` to the attached set.
    ///
    /// Returns `Ok(false)` when the object declares no capability.
    pub fn attach(&self, behaviour: SharedBehaviour) -> Result<bool> {
        let capabilities = behaviour.capabilities();
        if capabilities.is_empty() {
            return Ok(false);
        }
        let id = InstanceId::of(&behaviour);
        let mut attached = self.attached.lock();
        if attached.iter().any(|a| a.id == id) {
            return Err(DriverError::AlreadyAttached {
                name: behaviour.name().to_string(),
            });
        }
        log::debug!("Attached '{}' ({:?})", behaviour.name(), capabilities);
        attached.push(Arc::new(Attachment {
            id,
            behaviour,
            capabilities,
            live: AtomicBool::new(true),
        }));
        Ok(true)
    }

    /// Remove `behaviour` and run its `on_destroy` once. Detaching an object
    /// that is not attached does nothing.
    pub fn detach(&self, behaviour: &SharedBehaviour) -> bool {
        let id = InstanceId::of(behaviour);
        let removed = {
            let mut attached = self.attached.lock();
            attached
                .iter()
                .position(|a| a.id == id)
                .map(|at| attached.remove(at))
        };
        match removed {
            Some(attachment) => {
                log::debug!("Detached '{}'", attachment.behaviour.name());
                attachment.destroy()
            }
            None => false,
        }
    }

    pub fn is_attached(&self, behaviour: &SharedBehaviour) -> bool {
        let id = InstanceId::of(behaviour);
        self.attached.lock().iter().any(|a| a.id == id)
    }

    /// Detach and destroy every object, drop queued work and cancel every
    /// step-sequence. Returns how many objects were detached.
    pub fn shutdown(&self) -> usize {
        let attached = std::mem::take(&mut *self.attached.lock());
        let destroyed = attached.iter().filter(|a| a.destroy()).count();

        let dropped: Vec<Task> = self.queue.lock().drain(..).collect();
        for task in &dropped {
            if let Task::Steps(slot) = task {
                slot.cancel();
            }
        }
        let sequences = std::mem::take(&mut *self.sequences.lock());
        for slot in &sequences {
            slot.cancel();
        }
        log::info!(
            "Driver shut down: {} object(s) destroyed, {} queued task(s) dropped, {} sequence(s) cancelled",
            destroyed,
            dropped.len(),
            sequences.len()
        );
        destroyed
    }

    // --- Counters ---

    /// Queued tasks waiting for the next tick.
    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn live_sequence_count(&self) -> usize {
        self.sequences.lock().iter().filter(|s| s.is_live()).count()
    }

    pub fn attached_count(&self) -> usize {
        self.attached.lock().len()
    }
}
