//! Event values and the keys they are routed by

use crate::utils::current_timestamp;
use compact_str::CompactString;
use std::any::Any;
use std::borrow::Borrow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

const PREVENT_DEFAULT: u8 = 0x01;
const STOP_PROPAGATION: u8 = 0x02;

/// Case-sensitive event type discriminator used for listener routing.
///
/// Anything convertible into an `EventType` can be used as a key, so hosts
/// that want an enum of event kinds can implement `From<MyKind> for EventType`
/// while lookups stay string based at runtime.
///
/// The empty type is valid on an [`Event`] but listeners cannot be registered
/// for it, so dispatching such an event only stamps its target, releases
/// events queued under `""` and bubbles.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventType(CompactString);

impl EventType {
    /// Create a new event type
    pub fn new(name: &str) -> Self {
        Self(CompactString::new(name))
    }

    /// Returns the type name
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Borrow<str> for EventType {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for EventType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self(CompactString::from(name))
    }
}

impl From<&String> for EventType {
    fn from(name: &String) -> Self {
        Self::new(name)
    }
}

impl From<CompactString> for EventType {
    fn from(name: CompactString) -> Self {
        Self(name)
    }
}

impl PartialEq<str> for EventType {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for EventType {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Opaque reference to a host object, used for event origins and current targets.
///
/// Cloning a `Target` shares the same object; equality is identity.
#[derive(Clone)]
pub struct Target(Rc<dyn Any>);

impl Target {
    /// Wrap a value in a new shared target
    pub fn new<T: Any>(value: T) -> Self {
        Self(Rc::new(value))
    }

    /// Use an already shared value as a target
    pub fn from_rc<T: Any>(value: Rc<T>) -> Self {
        Self(value)
    }

    /// Borrow the underlying object if it is a `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Get a shared handle to the underlying object if it is a `T`
    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        self.0.clone().downcast::<T>().ok()
    }

    /// Whether both handles refer to the same object
    pub fn ptr_eq(&self, other: &Target) -> bool {
        Rc::as_ptr(&self.0) as *const () == Rc::as_ptr(&other.0) as *const ()
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Target {}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// A single occurrence announced through an [`EventDispatcher`](crate::EventDispatcher).
///
/// Everything but the current target and the suppression flags is fixed at
/// construction. The flags are set-only: once propagation is stopped or the
/// default prevented, the event stays that way for the rest of its life,
/// including across bubbling hops and later re-dispatch.
///
/// Listeners receive `&Event`; the suppression methods work through shared
/// references so every listener and dispatcher sees the same instance.
#[derive(Debug)]
pub struct Event {
    event_type: EventType,
    origin: Option<Target>,
    bubbles: bool,
    cancelable: bool,
    timestamp: u64,
    current_target: RefCell<Option<Target>>,
    flags: Cell<u8>,
}

impl Event {
    /// Create a non-bubbling, non-cancelable event with no origin.
    ///
    /// Any type is accepted, including `""`, which no listener can observe.
    pub fn new(event_type: impl Into<EventType>) -> Self {
        Self::with_options(event_type, None, false, false)
    }

    /// Create an event with every construction option spelled out
    pub fn with_options(
        event_type: impl Into<EventType>,
        origin: Option<Target>,
        bubbles: bool,
        cancelable: bool,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            origin,
            bubbles,
            cancelable,
            timestamp: current_timestamp(),
            current_target: RefCell::new(None),
            flags: Cell::new(0),
        }
    }

    /// Set the object the event originated from
    pub fn with_origin(mut self, origin: Target) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Set whether dispatchers forward this event to their parent
    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    /// Set whether [`prevent_default`](Self::prevent_default) has any effect
    pub fn with_cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    pub fn origin(&self) -> Option<&Target> {
        self.origin.as_ref()
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn is_cancelable(&self) -> bool {
        self.cancelable
    }

    /// Creation time in milliseconds since the Unix epoch
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The target of the dispatcher currently (or most recently) processing
    /// this event. `None` before the first dispatch.
    pub fn current_target(&self) -> Option<Target> {
        self.current_target.borrow().clone()
    }

    /// Overwrite the current target. Called by dispatchers mid-dispatch.
    pub fn set_current_target(&self, target: Option<Target>) {
        *self.current_target.borrow_mut() = target;
    }

    /// Cancel the default behavior associated with the event.
    ///
    /// Has no effect unless the event is cancelable.
    pub fn prevent_default(&self) {
        if self.cancelable {
            self.set_flag(PREVENT_DEFAULT);
        }
    }

    pub fn is_default_prevented(&self) -> bool {
        self.has_flag(PREVENT_DEFAULT)
    }

    /// Stop the event from reaching further listeners and parent dispatchers.
    ///
    /// Does not cancel the default behavior; see [`prevent_default`](Self::prevent_default).
    pub fn stop_propagation(&self) {
        self.set_flag(STOP_PROPAGATION);
    }

    /// Whether propagation is still allowed
    pub fn can_propagate(&self) -> bool {
        !self.has_flag(STOP_PROPAGATION)
    }

    fn set_flag(&self, flag: u8) {
        self.flags.set(self.flags.get() | flag);
    }

    fn has_flag(&self, flag: u8) -> bool {
        self.flags.get() & flag == flag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_event_defaults() {
        let event = Event::new("click");

        assert_eq!(event.event_type(), "click");
        assert!(event.origin().is_none());
        assert!(!event.bubbles());
        assert!(!event.is_cancelable());
        assert!(event.current_target().is_none());
        assert!(event.can_propagate());
        assert!(!event.is_default_prevented());
        assert!(event.timestamp() > 0);
    }

    #[test]
    fn test_event_type_is_case_sensitive() {
        assert_ne!(EventType::from("Click"), EventType::from("click"));
    }

    #[test]
    fn test_prevent_default_requires_cancelable() {
        let event = Event::new("submit");
        for _ in 0..3 {
            event.prevent_default();
            assert!(!event.is_default_prevented());
        }
    }

    #[test]
    fn test_prevent_default_is_idempotent() {
        let event = Event::new("submit").with_cancelable(true);
        event.prevent_default();
        assert!(event.is_default_prevented());
        event.prevent_default();
        assert!(event.is_default_prevented());
    }

    #[test]
    fn test_stop_propagation_ignores_cancelable() {
        let event = Event::new("click");
        event.stop_propagation();
        assert!(!event.can_propagate());
        event.stop_propagation();
        assert!(!event.can_propagate());
        // Flags are independent
        assert!(!event.is_default_prevented());
    }

    #[test]
    fn test_flags_are_independent() {
        let event = Event::with_options("drag", None, true, true);
        event.prevent_default();
        assert!(event.is_default_prevented());
        assert!(event.can_propagate());
    }

    #[test]
    fn test_current_target_overwrite() {
        let first = Target::new("first");
        let second = Target::new("second");
        let event = Event::new("click");

        event.set_current_target(Some(first.clone()));
        assert_eq!(event.current_target(), Some(first.clone()));

        event.set_current_target(Some(second.clone()));
        let current = event.current_target().unwrap();
        assert!(current.ptr_eq(&second));
        assert!(!current.ptr_eq(&first));
    }

    #[test]
    fn test_origin_is_kept() {
        let button = Target::new(String::from("button"));
        let event = Event::new("click").with_origin(button.clone());

        let origin = event.origin().unwrap();
        assert_eq!(origin, &button);
        assert_eq!(origin.downcast_ref::<String>().unwrap(), "button");
        assert!(origin.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn test_target_identity() {
        let shared = Rc::new(7u32);
        let a = Target::from_rc(shared.clone());
        let b = Target::from_rc(shared.clone());
        let c = Target::new(7u32);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(Rc::ptr_eq(&a.downcast::<u32>().unwrap(), &shared));
    }
}
