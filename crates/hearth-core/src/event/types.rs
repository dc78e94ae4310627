use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Events fired by the kernel itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemEvent {
    /// Every provider has been registered and initialized.
    StartCompleted,
    /// The application is shutting down.
    Terminating,
}

impl SystemEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SystemEvent::StartCompleted => "application.start_completed",
            SystemEvent::Terminating => "application.terminating",
        }
    }

    pub fn all() -> [SystemEvent; 2] {
        [SystemEvent::StartCompleted, SystemEvent::Terminating]
    }
}

impl fmt::Display for SystemEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A type-erased, possibly empty value passed to or returned by a listener.
#[derive(Clone, Default)]
pub struct Payload(Option<Arc<dyn Any + Send + Sync>>);

impl Payload {
    /// The empty payload.
    pub fn none() -> Self {
        Payload(None)
    }

    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Payload(Some(Arc::new(value)))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Payload(Some(value))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn is_some(&self) -> bool {
        self.0.is_some()
    }

    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|v| v.downcast_ref::<T>())
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.0.clone().and_then(|v| Arc::downcast::<T>(v).ok())
    }

    /// Reference identity; two empty payloads are equal.
    pub fn ptr_eq(&self, other: &Payload) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(_) => f.write_str("Payload(..)"),
            None => f.write_str("Payload(None)"),
        }
    }
}

/// Aggregated result of [`EventDispatcher::trigger`](crate::event::EventDispatcher::trigger).
///
/// Exactly one listener yields `Single` with its value unwrapped; zero or
/// several listeners yield `Sequence` in invocation order.
#[derive(Debug, Clone)]
pub enum EventResponse {
    Single(Payload),
    Sequence(Vec<Payload>),
}

impl EventResponse {
    pub fn empty() -> Self {
        EventResponse::Sequence(Vec::new())
    }

    /// Number of listener results carried.
    pub fn len(&self) -> usize {
        match self {
            EventResponse::Single(_) => 1,
            EventResponse::Sequence(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn single(&self) -> Option<&Payload> {
        match self {
            EventResponse::Single(value) => Some(value),
            EventResponse::Sequence(_) => None,
        }
    }

    pub fn into_vec(self) -> Vec<Payload> {
        match self {
            EventResponse::Single(value) => vec![value],
            EventResponse::Sequence(values) => values,
        }
    }

    pub(crate) fn from_results(mut results: Vec<Payload>) -> Self {
        if results.len() == 1 {
            if let Some(value) = results.pop() {
                return EventResponse::Single(value);
            }
        }
        EventResponse::Sequence(results)
    }
}
