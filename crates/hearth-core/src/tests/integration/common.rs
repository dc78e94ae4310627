#![cfg(test)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::container::{Container, ContainerError, Factory, Instance};
use crate::driver::{Behaviour, Capabilities, DriverProvider, behaviour_instance};
use crate::event::EventsProvider;
use crate::kernel::error::Result as KernelResult;
use crate::kernel::{Application, RegisterProviders, SharedProvider, SharedStage};

pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// A per-tick object with every capability.
pub struct Ticker {
    pub label: String,
    pub journal: Journal,
    pub destroyed: AtomicUsize,
}

impl Ticker {
    pub fn new(label: &str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            journal: journal.clone(),
            destroyed: AtomicUsize::new(0),
        })
    }

    pub fn destroy_count(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl Behaviour for Ticker {
    fn name(&self) -> &str {
        &self.label
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
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

/// Factory producing a fresh ticker on every call.
pub fn ticker_factory(label: &'static str, journal: &Journal) -> Factory {
    let journal = journal.clone();
    Arc::new(move |_: &Container, _: &[Instance]| {
        Ok::<_, ContainerError>(behaviour_instance(Ticker::new(label, &journal)))
    })
}

/// An application bootstrapped and initialized with the events and driver
/// providers.
pub fn running_app() -> KernelResult<Application> {
    let app = Application::new();
    let events: SharedProvider = Arc::new(EventsProvider);
    let driver: SharedProvider = Arc::new(DriverProvider);
    let stages: Vec<SharedStage> = vec![Arc::new(RegisterProviders(vec![events, driver]))];
    app.bootstrap(&stages)?;
    app.init()?;
    Ok(app)
}
