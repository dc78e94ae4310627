//! # Hearth Event System
//!
//! Named, priority-ordered, synchronous event dispatch.
//!
//! ## Key Components:
//!
//! - **[`EventDispatcher`]**: maps event names (or `*` wildcard patterns) to
//!   listener lists sorted by `(priority, registration order)`, lower
//!   priorities first. [`EventDispatcher::trigger`] collects every
//!   listener's return value; [`EventDispatcher::trigger_halt`] stops at
//!   the first non-empty one.
//! - **[`Payload`] / [`EventResponse`]**: the type-erased value passed to and
//!   returned from listeners, and the aggregated trigger result.
//! - **[`ListenerHandle`]**: returned by every registration; cancels it.
//! - **[`SystemEvent`]**: the well-known kernel events.
//! - **[`EventsProvider`]**: service provider that installs the dispatcher
//!   into the application container.
pub mod dispatcher;
pub mod error;
pub mod provider;
pub mod types;

/// Type for listener identifiers
pub type EventId = u64;

/// Priority given to listeners registered without one.
pub const DEFAULT_LISTENER_PRIORITY: i32 = 100;

pub use dispatcher::{EventDispatcher, ListenerHandle, ListenerOptions};
pub use error::{EventError, Result};
pub use provider::EventsProvider;
pub use types::{EventResponse, Payload, SystemEvent};
