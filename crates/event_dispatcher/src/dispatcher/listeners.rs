/// Listener handles and registration
use super::core::EventDispatcher;
use crate::error::EventError;
use crate::event::{Event, EventType};
use crate::utils::generate_id;
use compact_str::CompactString;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Signature every listener callback has
pub type ListenerFn = dyn Fn(&Event) -> Result<(), EventError>;

/// Identity of a [`Listener`], shared by all of its clones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(uuid::Uuid);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A registered (or registrable) event callback.
///
/// Keep a clone of the handle to remove the listener later: removal matches
/// by identity, and two listeners wrapping identical closures are still
/// different listeners.
#[derive(Clone)]
pub struct Listener {
    id: ListenerId,
    name: Option<CompactString>,
    callback: Rc<ListenerFn>,
}

impl Listener {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Event) -> Result<(), EventError> + 'static,
    {
        Self {
            id: ListenerId(generate_id()),
            name: None,
            callback: Rc::new(callback),
        }
    }

    /// Create a listener with a name that shows up in logs
    pub fn named<F>(name: &str, callback: F) -> Self
    where
        F: Fn(&Event) -> Result<(), EventError> + 'static,
    {
        let mut listener = Self::new(callback);
        listener.name = Some(CompactString::new(name));
        listener
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Invoke the callback directly
    pub fn call(&self, event: &Event) -> Result<(), EventError> {
        (self.callback)(event)
    }

    pub(super) fn label(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None => self.id.to_string(),
        }
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl EventDispatcher {
    /// Registers a listener for `event_type`.
    ///
    /// Listeners run in the order they were added. Adding the same listener
    /// twice makes it run twice per dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidArgument`] for an empty event type; the
    /// listener is not registered. Events of the empty type can still be
    /// dispatched and queued against, they just never reach a listener.
    pub fn add_event_listener(
        &self,
        event_type: impl Into<EventType>,
        listener: Listener,
    ) -> Result<(), EventError> {
        let event_type = event_type.into();
        if event_type.is_empty() {
            return Err(EventError::InvalidArgument(
                "event type must not be empty".to_string(),
            ));
        }

        debug!(event_type = %event_type, listener = %listener.label(), "📝 Registered listener");
        self.inner
            .listeners
            .borrow_mut()
            .entry(event_type)
            .or_default()
            .push(listener);
        Ok(())
    }

    /// Wraps `callback` in a new [`Listener`], registers it and returns the
    /// handle for later removal.
    pub fn on<F>(&self, event_type: impl Into<EventType>, callback: F) -> Result<Listener, EventError>
    where
        F: Fn(&Event) -> Result<(), EventError> + 'static,
    {
        let listener = Listener::new(callback);
        self.add_event_listener(event_type, listener.clone())?;
        Ok(listener)
    }

    /// Removes the first registration of `listener` for `event_type`.
    ///
    /// Returns `false` when nothing matched. Other registrations of the same
    /// listener stay in place.
    pub fn remove_event_listener(&self, event_type: impl AsRef<str>, listener: &Listener) -> bool {
        let event_type = event_type.as_ref();
        let mut listeners = self.inner.listeners.borrow_mut();

        let Some(registered) = listeners.get_mut(event_type) else {
            return false;
        };
        let Some(index) = registered.iter().position(|l| l == listener) else {
            return false;
        };

        registered.remove(index);
        if registered.is_empty() {
            listeners.remove(event_type);
        }

        debug!(event_type, listener = %listener.label(), "Removed listener");
        true
    }

    /// Whether at least one listener is registered for `event_type`
    pub fn has_event_listener(&self, event_type: impl AsRef<str>) -> bool {
        self.inner
            .listeners
            .borrow()
            .get(event_type.as_ref())
            .is_some_and(|listeners| !listeners.is_empty())
    }

    /// Returns a copy of the listeners registered for `event_type`, in call
    /// order. Empty if there are none.
    ///
    /// The returned handles are a snapshot: changing the vector does not
    /// change the registrations.
    pub fn get_event_listeners(&self, event_type: impl AsRef<str>) -> Vec<Listener> {
        self.inner
            .listeners
            .borrow()
            .get(event_type.as_ref())
            .map(|listeners| listeners.to_vec())
            .unwrap_or_default()
    }

    /// Event types with at least one listener
    pub fn registered_types(&self) -> Vec<EventType> {
        self.inner.listeners.borrow().keys().cloned().collect()
    }
}
