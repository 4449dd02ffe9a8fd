//! # Event Dispatcher
//!
//! A synchronous event dispatch core. An object owns an [`EventDispatcher`]
//! and announces [`Event`]s through it to any number of registered listeners.
//!
//! ## Key Features
//!
//! - **Synchronous fan-out**: listeners run in registration order inside `dispatch_event`
//! - **Suppression**: `stop_propagation` and `prevent_default` on the shared event
//! - **Bubbling**: events marked as bubbling continue to a parent dispatcher
//! - **Deferred dispatch**: timer-delayed dispatch through an injectable [`Scheduler`]
//! - **Queued dispatch**: hold an event until another event type is dispatched
//!
//! ## Architecture
//!
//! - **Event**: type discriminator, origin, timestamp, current target and
//!   set-only suppression flags
//! - **EventDispatcher**: listener registry, pending timers and trigger queues
//! - **Scheduler**: schedule-after / cancel capability used for deferral
//!
//! Everything runs on a single thread. Dispatchers and listeners are
//! reference counted handles, and listeners may call back into any
//! dispatcher (including the one invoking them).
//!
//! ## Usage Example
//!
//! ```rust
//! use event_dispatcher::*;
//! use std::rc::Rc;
//!
//! # fn main() -> Result<()> {
//! let window = EventDispatcher::new(Some(Target::new("window")), None);
//! let button = EventDispatcher::new(Some(Target::new("button")), Some(window.clone()));
//!
//! window.on("click", |event| {
//!     let target = event.current_target().unwrap();
//!     assert_eq!(target.downcast_ref::<&str>(), Some(&"window"));
//!     Ok(())
//! })?;
//!
//! button.on("click", |event| {
//!     event.prevent_default();
//!     Ok(())
//! })?;
//!
//! let click = Event::with_options("click", None, true, true);
//! button.dispatch_event(&click)?;
//! assert!(click.is_default_prevented());
//!
//! // Hold a follow-up event until "ready" is dispatched
//! button.queue_event_dispatch("ready", Rc::new(Event::new("loaded")));
//! button.dispatch_event(&Event::new("ready"))?;
//! assert_eq!(button.queued_event_count(), 0);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod logging;
pub mod scheduler;
pub mod utils;

// Re-exports for convenience
pub use config::{DispatchConfig, DispatcherSettings, LoggingSettings, PropagationStop, QueueRelease};
pub use dispatcher::{DispatcherBuilder, DispatcherStats, EventDispatcher, Listener, ListenerFn, ListenerId};
pub use error::{ConfigError, EventError};
pub use event::{Event, EventType, Target};
pub use scheduler::{ManualScheduler, Scheduler, TimerId, TimerTask, TokioScheduler};

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, EventError>;
