
use std::sync::Arc;

use parking_lot::Mutex;

use crate::kernel::error::Result;
use crate::kernel::{Application, ServiceProvider};

pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

pub(crate) fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// Provider that records its register/init calls.
pub(crate) struct Recording {
    pub(crate) name: String,
    pub(crate) priority: i32,
    pub(crate) init_priority: Option<i32>,
    pub(crate) journal: Journal,
}

impl Recording {
    pub(crate) fn new(name: &str, priority: i32, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            priority,
            init_priority: None,
            journal: journal.clone(),
        })
    }
}

impl ServiceProvider for Recording {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn init_priority(&self) -> Option<i32> {
        self.init_priority
    }

    fn register(&self, _app: &Application) -> Result<()> {
        self.journal.lock().push(format!("register:{}", self.name));
        Ok(())
    }

    fn init(&self, _app: &Application) -> Result<()> {
        self.journal.lock().push(format!("init:{}", self.name));
        Ok(())
    }
}
