
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::driver::{Behaviour, Capabilities};

pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

pub(crate) fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// Behaviour that writes every hook call into a shared journal.
pub(crate) struct Actor {
    label: &'static str,
    capabilities: Capabilities,
    journal: Journal,
    pub(crate) destroyed: AtomicUsize,
}

impl Actor {
    pub(crate) fn new(label: &'static str, capabilities: Capabilities, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            label,
            capabilities,
            journal: journal.clone(),
            destroyed: AtomicUsize::new(0),
        })
    }

    pub(crate) fn destroy_count(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl Behaviour for Actor {
    fn name(&self) -> &str {
        self.label
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn update(&self) {
        self.journal.lock().push(format!("update:{}", self.label));
    }

    fn late_update(&self) {
        self.journal.lock().push(format!("late:{}", self.label));
    }

    fn on_destroy(&self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().push(format!("destroy:{}", self.label));
    }
}
