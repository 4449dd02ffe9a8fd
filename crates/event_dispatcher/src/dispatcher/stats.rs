/// Statistics tracking for a dispatcher
use serde::{Deserialize, Serialize};

/// Counters describing what a dispatcher has done since it was created
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherStats {
    /// Calls to `dispatch_event`, including bubbled, deferred and released ones
    pub events_dispatched: u64,
    /// Listener invocations across all dispatches
    pub listener_invocations: u64,
    /// Listener invocations that returned an error
    pub listener_failures: u64,
    /// Events forwarded to the parent dispatcher
    pub events_bubbled: u64,
    /// Deferred dispatches scheduled
    pub deferred_scheduled: u64,
    /// Deferred dispatches whose timer fired
    pub deferred_fired: u64,
    /// Deferred dispatches cancelled before firing
    pub deferred_cancelled: u64,
    /// Queued events released by their trigger
    pub queued_events_released: u64,
    /// Queued events discarded by `cancel_queued_events`
    pub queued_events_discarded: u64,
}
