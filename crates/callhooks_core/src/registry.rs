//! Registries: a wrapped target plus its fixed set of events.
//!
//! A [`Registry`] is assembled once from an ordered list of [`EventSpec`]s
//! and never gains or loses events afterwards. Events are stored erased and
//! recovered with their kind through [`Registry::event`]:
//!
//! ```
//! use std::sync::Arc;
//!
//! use callhooks_core::{EventSpec, FnTarget, OnCall, OnReturn, Registration, Registry};
//!
//! let target: Arc<FnTarget<u32, Vec<u32>, ()>> = Arc::new(|n: &u32| Ok((0..*n).collect::<Vec<_>>()));
//! let registry = Registry::builder("count", target)
//!     .event(EventSpec::new::<OnCall<u32, ()>>("on_iteration"))
//!     .event(EventSpec::new::<OnReturn<u32, Vec<u32>, ()>>("on_return"))
//!     .build()
//!     .unwrap();
//!
//! let on_iteration = registry.event::<OnCall<u32, ()>>("on_iteration").unwrap();
//! on_iteration.add_callback(|_| Ok(()), Registration::new()).unwrap();
//! assert_eq!(registry.num_callbacks(), 1);
//! assert_eq!(registry.call(&3), Ok(vec![0, 1, 2]));
//! ```

use core::fmt;
use core::ops::Deref;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::CallbackError;
use crate::event::{ErasedEvent, Event, EventKind};
use crate::id::AsCallbackId;
use crate::listing::CallbackTable;
use crate::options::OptionKey;

/// A wrapped free function.
pub type FnTarget<A, R, E> = dyn Fn(&A) -> Result<R, E> + Send + Sync;

/// A wrapped method, called with its receiver.
pub type MethodTarget<S, A, R, E> = dyn Fn(&S, &A) -> Result<R, E> + Send + Sync;

/// A wrapped method that also receives the events of the registry it is
/// called through, so that it emits its own events on the caller's
/// listeners.
pub type ScopedTarget<S, A, R, E> = dyn Fn(&S, &Events, &A) -> Result<R, E> + Send + Sync;

type MakeEvent =
    fn(&str, &str, &[(OptionKey, bool)]) -> Result<Arc<dyn ErasedEvent>, CallbackError>;

fn make_event<K: EventKind>(
    name: &str,
    target_name: &str,
    overrides: &[(OptionKey, bool)],
) -> Result<Arc<dyn ErasedEvent>, CallbackError> {
    Ok(Arc::new(Event::<K>::with_options(name, target_name, overrides)?))
}

// ─────────────────────────────────────────────────────────────────────────────
// EventSpec
// ─────────────────────────────────────────────────────────────────────────────

/// Declaration of one event: its name, kind and default overrides.
#[derive(Clone)]
pub struct EventSpec {
    name: String,
    kind: &'static str,
    overrides: Vec<(OptionKey, bool)>,
    make: MakeEvent,
}

impl EventSpec {
    /// Declares an event of kind `K` named `name`.
    #[must_use]
    pub fn new<K: EventKind>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: K::KIND,
            overrides: Vec::new(),
            make: make_event::<K>,
        }
    }

    /// Overrides one of the kind's default options for this event.
    #[must_use]
    pub fn with_option(mut self, key: OptionKey, value: bool) -> Self {
        self.overrides.retain(|(existing, _)| *existing != key);
        self.overrides.push((key, value));
        self
    }

    /// The declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for EventSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// The ordered, named events of one target.
///
/// Every [`Registry`] dereferences to its `Events`. A [`ScopedTarget`]
/// receives the `Events` of the registry it is called through, which is how
/// a method target emits its custom events on the right owner's listeners.
pub struct Events {
    target_name: String,
    events: IndexMap<String, Arc<dyn ErasedEvent>>,
}

impl Events {
    fn new(target_name: String, events: IndexMap<String, Arc<dyn ErasedEvent>>) -> Self {
        Self {
            target_name,
            events,
        }
    }

    /// Returns the event named `name` if it exists and has kind `K`.
    #[must_use]
    pub fn event<K: EventKind>(&self, name: &str) -> Option<&Event<K>> {
        self.events.get(name)?.as_any().downcast_ref::<Event<K>>()
    }

    /// Shared handle to the event named `name` if it exists and has kind `K`.
    #[must_use]
    pub fn event_arc<K: EventKind>(&self, name: &str) -> Option<Arc<Event<K>>> {
        let event = Arc::clone(self.events.get(name)?);
        event.into_any().downcast::<Event<K>>().ok()
    }

    /// Event names in declaration order.
    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    /// Display name of the target.
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Callbacks registered directly on these events.
    ///
    /// Instance-level events do not count the class-level callbacks they
    /// inherit; see [`num_visible_callbacks`](Self::num_visible_callbacks).
    #[must_use]
    pub fn num_callbacks(&self) -> usize {
        self.events.values().map(|event| event.own_len()).sum()
    }

    /// Callbacks a call would run: own plus inherited.
    #[must_use]
    pub fn num_visible_callbacks(&self) -> usize {
        self.events.values().map(|event| event.visible_len()).sum()
    }

    /// Removes a callback from the first event holding it.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::CallbackNotRegistered`] if none of the own
    /// events holds the id.
    pub fn remove_callback<I: AsCallbackId + ?Sized>(&self, id: &I) -> Result<(), CallbackError> {
        let id = id.callback_id();
        if self.events.values().any(|event| event.remove_own(&id)) {
            return Ok(());
        }
        Err(CallbackError::CallbackNotRegistered {
            target: self.target_name.clone(),
            id,
        })
    }

    /// Removes every callback registered on these events.
    ///
    /// Inherited callbacks stay registered on their own events.
    pub fn remove_callbacks(&self) {
        for event in self.events.values() {
            event.clear_own();
        }
    }

    /// Every visible callback, event by event in dispatch order.
    #[must_use]
    pub fn list_callbacks(&self) -> CallbackTable {
        CallbackTable::new(self.events.values().flat_map(|event| event.rows()).collect())
    }

    /// [`list_callbacks`](Self::list_callbacks) rendered as text.
    #[must_use]
    pub fn callbacks_info(&self) -> String {
        self.list_callbacks().to_string()
    }

    /// Short usage summary naming each event's registration calls.
    #[must_use]
    pub fn docs(&self) -> String {
        let mut lines = vec![format!("`{}` supports callbacks:", self.target_name)];
        for name in self.events.keys() {
            lines.push(format!("    {name}.add_callback(callable) -> id"));
            lines.push(format!("    {name}.remove_callback(id)"));
        }
        lines.push("    remove_callbacks()".to_owned());
        lines.push("    list_callbacks()".to_owned());
        lines.join("\n")
    }

    fn child(&self, target_name: String) -> Self {
        let events = self
            .events
            .iter()
            .map(|(name, event)| (name.clone(), Arc::clone(event).child_erased(&target_name)))
            .collect();
        Self::new(target_name, events)
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("target_name", &self.target_name)
            .field("events", &self.events.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// A target and the events bound to it.
///
/// `F` is the target's callable type: [`FnTarget`], [`MethodTarget`] or
/// [`ScopedTarget`]. Event lookup, counts, removal and listing come from
/// [`Events`] through `Deref`.
pub struct Registry<F: ?Sized> {
    target: Arc<F>,
    events: Events,
}

/// Builder returned by [`Registry::builder`].
pub struct RegistryBuilder<F: ?Sized> {
    target: Arc<F>,
    target_name: String,
    specs: Vec<EventSpec>,
}

impl<F: ?Sized> RegistryBuilder<F> {
    /// Appends an event. Events keep the order they are added in.
    #[must_use]
    pub fn event(mut self, spec: EventSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Creates the registry.
    ///
    /// # Errors
    ///
    /// - [`CallbackError::DuplicateEvent`] if two specs share a name.
    /// - [`CallbackError::InvalidOption`] if a spec overrides an option its
    ///   kind does not recognize.
    pub fn build(self) -> Result<Registry<F>, CallbackError> {
        let mut events: IndexMap<String, Arc<dyn ErasedEvent>> =
            IndexMap::with_capacity(self.specs.len());
        for spec in self.specs {
            if events.contains_key(&spec.name) {
                return Err(CallbackError::DuplicateEvent { name: spec.name });
            }
            let event = (spec.make)(&spec.name, &self.target_name, &spec.overrides)?;
            events.insert(spec.name, event);
        }
        Ok(Registry::from_parts(self.target_name, self.target, events))
    }
}

impl<F: ?Sized> Registry<F> {
    /// Starts a registry for `target`, displayed as `target_name`.
    #[must_use]
    pub fn builder(target_name: impl Into<String>, target: Arc<F>) -> RegistryBuilder<F> {
        RegistryBuilder {
            target,
            target_name: target_name.into(),
            specs: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        target_name: String,
        target: Arc<F>,
        events: IndexMap<String, Arc<dyn ErasedEvent>>,
    ) -> Self {
        Self {
            target,
            events: Events::new(target_name, events),
        }
    }

    /// The wrapped target.
    #[must_use]
    pub fn target(&self) -> &Arc<F> {
        &self.target
    }

    /// The events of this registry.
    #[must_use]
    pub fn events(&self) -> &Events {
        &self.events
    }

    /// Creates a registry for the same target whose events inherit from
    /// these.
    #[must_use]
    pub fn make_child(&self, target_name: impl Into<String>) -> Self {
        Self {
            target: Arc::clone(&self.target),
            events: self.events.child(target_name.into()),
        }
    }
}

impl<F: ?Sized> Deref for Registry<F> {
    type Target = Events;

    fn deref(&self) -> &Events {
        &self.events
    }
}

impl<A, R, E> Registry<FnTarget<A, R, E>> {
    /// Calls the target. Events are not emitted; a target that declares its
    /// own events emits them itself.
    ///
    /// # Errors
    ///
    /// Returns the target's error.
    pub fn call(&self, args: &A) -> Result<R, E> {
        tracing::trace!(target_name = %self.events.target_name, "calling target");
        (self.target)(args)
    }
}

impl<S, A, R, E> Registry<MethodTarget<S, A, R, E>> {
    /// Calls the target method on `receiver`.
    ///
    /// # Errors
    ///
    /// Returns the target's error.
    pub fn call_with(&self, receiver: &S, args: &A) -> Result<R, E> {
        tracing::trace!(target_name = %self.events.target_name, "calling target");
        (self.target)(receiver, args)
    }
}

impl<S, A, R, E> Registry<ScopedTarget<S, A, R, E>> {
    /// Calls the target method on `receiver`, handing it this registry's
    /// events.
    ///
    /// # Errors
    ///
    /// Returns the target's error.
    pub fn call_with(&self, receiver: &S, args: &A) -> Result<R, E> {
        tracing::trace!(target_name = %self.events.target_name, "calling target");
        (self.target)(receiver, &self.events, args)
    }
}

impl<F: ?Sized> fmt::Debug for Registry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("target_name", &self.events.target_name)
            .field("events", &self.events.events.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
