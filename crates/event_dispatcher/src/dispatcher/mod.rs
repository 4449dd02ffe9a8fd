/// Event dispatcher - broken down into manageable components
mod core;
mod deferred;
mod dispatch;
mod listeners;
mod queued;
mod stats;

pub use self::core::{DispatcherBuilder, EventDispatcher};
pub use listeners::{Listener, ListenerFn, ListenerId};
pub use stats::DispatcherStats;
