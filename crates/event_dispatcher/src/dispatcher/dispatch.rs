/// Synchronous dispatch and bubbling
use super::core::EventDispatcher;
use super::listeners::Listener;
use crate::config::PropagationStop;
use crate::error::EventError;
use crate::event::{Event, EventType};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

impl EventDispatcher {
    /// Dispatches `event` into the event flow.
    ///
    /// 1. The event's current target becomes this dispatcher's target.
    /// 2. Listeners for the event type run in registration order. The list is
    ///    snapshotted first, so listeners added or removed during the pass
    ///    only take effect on the next dispatch. With
    ///    [`PropagationStop::Immediate`] a stopped event skips the remaining
    ///    listeners; with [`PropagationStop::BubblingOnly`] all of them run.
    /// 3. Events queued against this type are released, whatever the
    ///    propagation state.
    /// 4. If the event bubbles and propagation was not stopped, the same
    ///    instance is dispatched on the parent.
    ///
    /// # Errors
    ///
    /// The first listener error is returned as is. The remaining listeners,
    /// the queue release and the bubbling step are skipped for this call.
    pub fn dispatch_event(&self, event: &Event) -> Result<(), EventError> {
        let inner = &self.inner;
        event.set_current_target(inner.current_target.clone());
        inner.record(|stats| stats.events_dispatched += 1);

        let listeners = self.snapshot_listeners(event.event_type());
        debug!(
            event_type = %event.event_type(),
            listeners = listeners.len(),
            "📤 Dispatching event"
        );

        for listener in &listeners {
            if inner.settings.propagation_stop == PropagationStop::Immediate
                && !event.can_propagate()
            {
                trace!(event_type = %event.event_type(), "Propagation stopped, skipping remaining listeners");
                break;
            }

            inner.record(|stats| stats.listener_invocations += 1);
            if let Err(e) = listener.call(event) {
                inner.record(|stats| stats.listener_failures += 1);
                warn!(
                    event_type = %event.event_type(),
                    listener = %listener.label(),
                    error = %e,
                    "❌ Listener failed"
                );
                return Err(e);
            }
        }

        self.release_queued_events(event.event_type())?;

        if event.bubbles() && event.can_propagate() {
            if let Some(parent) = &inner.parent {
                inner.record(|stats| stats.events_bubbled += 1);
                trace!(event_type = %event.event_type(), "Bubbling to parent dispatcher");
                parent.dispatch_event(event)?;
            }
        }

        Ok(())
    }

    fn snapshot_listeners(&self, event_type: &EventType) -> SmallVec<[Listener; 4]> {
        self.inner
            .listeners
            .borrow()
            .get(event_type)
            .cloned()
            .unwrap_or_default()
    }
}
