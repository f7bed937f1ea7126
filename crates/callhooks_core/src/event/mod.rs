//! Events: named extension points holding prioritized callbacks.
//!
//! An [`Event`] stores its own callbacks and, when it belongs to an
//! instance-level registry, a weak link to the class-level event it inherits
//! from. Dispatch always considers the whole chain:
//!
//! 1. higher priority runs first,
//! 2. on equal priority, the event's own callbacks run before inherited ones,
//! 3. otherwise callbacks run in the order they were registered.
//!
//! What a listener receives and how results combine is decided by the
//! event's [`EventKind`]:
//!
//! - [`OnCall`]: runs before the target, optionally receiving its arguments.
//! - [`OnReturn`]: runs after the target, optionally receiving its result.
//! - [`OnException`]: runs when the target fails and may recover from it.

mod call;
mod exception;
mod on_return;

pub use call::{CallListener, OnCall};
pub use exception::{ExceptionListener, OnException};
pub use on_return::{OnReturn, ReturnListener};

use core::any::Any;
use core::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::callback::Callback;
use crate::error::CallbackError;
use crate::id::{AsCallbackId, CallbackId};
use crate::listing::CallbackRow;
use crate::options::{OptionKey, Options, Registration};
use crate::priority::Priority;

// ─────────────────────────────────────────────────────────────────────────────
// EventKind
// ─────────────────────────────────────────────────────────────────────────────

/// Dispatch semantics of an event.
///
/// A kind fixes the listener signature and the options its callbacks
/// recognize. Kinds are zero-sized markers; the `emit` operation of each
/// kind lives in an inherent `impl Event<Kind>` block.
pub trait EventKind: Send + Sync + 'static {
    /// The listener type stored for each callback.
    type Listener: ?Sized + Send + Sync + 'static;

    /// Short name of the kind, used in listings and logs.
    const KIND: &'static str;

    /// Recognized options and their class-level defaults, in display order.
    const DEFAULTS: &'static [(OptionKey, bool)];

    /// An option whose value is dictated by the listener itself.
    ///
    /// Registering with an override that contradicts it fails with
    /// [`CallbackError::InvalidOption`].
    fn fixed_option(_listener: &Self::Listener) -> Option<(OptionKey, bool)> {
        None
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry
// ─────────────────────────────────────────────────────────────────────────────

/// One registered listener with its priority and resolved options.
pub struct Entry<F: ?Sized> {
    function: Arc<F>,
    priority: Priority,
    options: Options,
}

impl<F: ?Sized> Entry<F> {
    /// The listener.
    #[must_use]
    pub fn function(&self) -> &Arc<F> {
        &self.function
    }

    /// Dispatch priority.
    #[must_use]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Options resolved at registration.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub(crate) fn flag(&self, key: OptionKey) -> bool {
        self.options.flag(key)
    }
}

impl<F: ?Sized> Clone for Entry<F> {
    fn clone(&self) -> Self {
        Self {
            function: Arc::clone(&self.function),
            priority: self.priority,
            options: self.options.clone(),
        }
    }
}

impl<F: ?Sized> fmt::Debug for Entry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("priority", &self.priority)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event
// ─────────────────────────────────────────────────────────────────────────────

/// A named set of callbacks dispatched by kind `K`.
///
/// # Thread Safety
///
/// Callbacks live behind a [`RwLock`]. Registration and removal take the
/// write lock; `emit` copies the dispatch list under the read lock and
/// releases it before any listener runs, so listeners may add or remove
/// callbacks on the event that is calling them.
pub struct Event<K: EventKind> {
    name: String,
    target_name: String,
    parent: Option<Weak<Event<K>>>,
    options: Options,
    callbacks: RwLock<IndexMap<CallbackId, Entry<K::Listener>>>,
}

impl<K: EventKind> Event<K> {
    /// Creates an event with the kind's default options.
    #[must_use]
    pub fn new(name: impl Into<String>, target_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_name: target_name.into(),
            parent: None,
            options: Options::from_defaults(K::DEFAULTS),
            callbacks: RwLock::new(IndexMap::new()),
        }
    }

    /// Creates an event whose defaults differ from the kind's.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::InvalidOption`] if an override names an
    /// option the kind does not recognize.
    pub fn with_options(
        name: impl Into<String>,
        target_name: impl Into<String>,
        overrides: &[(OptionKey, bool)],
    ) -> Result<Self, CallbackError> {
        let mut event = Self::new(name, target_name);
        event.options = event.options.merged(overrides, &event.name)?;
        Ok(event)
    }

    /// Creates an empty event inheriting from this one.
    ///
    /// The child keeps this event's name and defaults. Only a weak link is
    /// kept, so the child never extends the parent's lifetime.
    #[must_use]
    pub fn child(self: &Arc<Self>, target_name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: self.name.clone(),
            target_name: target_name.into(),
            parent: Some(Arc::downgrade(self)),
            options: self.options.clone(),
            callbacks: RwLock::new(IndexMap::new()),
        })
    }

    /// The event's name, e.g. `on_call`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display name of the target this event belongs to.
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Default options applied to new callbacks.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The event this one inherits from, if it is still alive.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Ancestor chain, nearest first. A dropped ancestor ends the chain.
    #[must_use]
    pub fn parents(&self) -> Vec<Arc<Self>> {
        let mut chain = Vec::new();
        let mut next = self.parent();
        while let Some(parent) = next {
            next = parent.parent();
            chain.push(parent);
        }
        chain
    }

    /// Registers `callback`.
    ///
    /// The callback is stored under the registration's id, or under the
    /// callback's own identity when no id is given. Returns that id.
    ///
    /// # Errors
    ///
    /// - [`CallbackError::InvalidPriority`] if the priority did not convert.
    /// - [`CallbackError::InvalidOption`] if an override is not recognized or
    ///   contradicts the listener.
    /// - [`CallbackError::DuplicateCallback`] if this event already holds the
    ///   id. The existing callback is left untouched.
    pub fn register(
        &self,
        callback: Callback<K::Listener>,
        registration: Registration,
    ) -> Result<CallbackId, CallbackError> {
        let priority = registration.priority()?;
        let mut options = self.options.merged(registration.overrides(), &self.name)?;
        if let Some((key, value)) = K::fixed_option(callback.function()) {
            if registration.option(key).is_some_and(|given| given != value) {
                return Err(self.options.invalid(key, &self.name));
            }
            options.set(key, value);
        }

        let id = registration
            .id()
            .cloned()
            .unwrap_or_else(|| callback.id().clone());

        let mut callbacks = self.callbacks.write();
        if callbacks.contains_key(&id) {
            return Err(CallbackError::DuplicateCallback {
                event: self.name.clone(),
                target: self.target_name.clone(),
                id,
            });
        }

        tracing::debug!(
            event = %self.name,
            target_name = %self.target_name,
            id = %id,
            priority = %priority,
            "callback registered"
        );

        callbacks.insert(
            id.clone(),
            Entry {
                function: Arc::clone(callback.function()),
                priority,
                options,
            },
        );
        Ok(id)
    }

    /// Removes one of this event's own callbacks.
    ///
    /// Accepts the id returned by registration, a label, or the original
    /// [`Callback`] handle. Inherited callbacks are never removed.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::UnknownCallback`] if the id is not held by
    /// this event.
    pub fn remove_callback<I: AsCallbackId + ?Sized>(&self, id: &I) -> Result<(), CallbackError> {
        let id = id.callback_id();
        if self.remove_own(&id) {
            Ok(())
        } else {
            Err(self.unknown(vec![id]))
        }
    }

    /// Removes several of this event's own callbacks.
    ///
    /// Every id that resolves is removed even if others do not.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::UnknownCallback`] listing every id that was
    /// not found.
    pub fn remove_callbacks<I>(&self, ids: I) -> Result<(), CallbackError>
    where
        I: IntoIterator,
        I::Item: AsCallbackId,
    {
        let missing: Vec<CallbackId> = ids
            .into_iter()
            .map(|id| id.callback_id())
            .filter(|id| !self.remove_own(id))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(self.unknown(missing))
        }
    }

    /// Removes all of this event's own callbacks.
    pub fn clear(&self) {
        let mut callbacks = self.callbacks.write();
        if !callbacks.is_empty() {
            tracing::debug!(
                event = %self.name,
                target_name = %self.target_name,
                removed = callbacks.len(),
                "callbacks cleared"
            );
        }
        callbacks.clear();
    }

    /// Number of callbacks registered on this event itself.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Returns `true` if this event holds no callbacks of its own.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.read().is_empty()
    }

    /// Number of callbacks `emit` would run: own plus inherited.
    #[must_use]
    pub fn visible_len(&self) -> usize {
        self.len() + self.parents().iter().map(|parent| parent.len()).sum::<usize>()
    }

    /// Returns `true` if this event itself holds `id`.
    #[must_use]
    pub fn contains<I: AsCallbackId + ?Sized>(&self, id: &I) -> bool {
        self.callbacks.read().contains_key(&id.callback_id())
    }

    /// Ids of every callback `emit` would run, in dispatch order.
    #[must_use]
    pub fn ids(&self) -> Vec<CallbackId> {
        self.dispatch_list().into_iter().map(|(id, _)| id).collect()
    }

    /// Snapshot of own and inherited callbacks in dispatch order.
    pub(crate) fn dispatch_list(&self) -> Vec<(CallbackId, Entry<K::Listener>)> {
        let mut collected = Vec::new();
        Self::collect_level(&self.callbacks, 0, &mut collected);
        for (depth, parent) in self.parents().iter().enumerate() {
            Self::collect_level(&parent.callbacks, depth + 1, &mut collected);
        }

        collected.sort_by(|(a_depth, _, a), (b_depth, _, b)| {
            b.priority
                .value()
                .total_cmp(&a.priority.value())
                .then(a_depth.cmp(b_depth))
        });
        collected
            .into_iter()
            .map(|(_, id, entry)| (id, entry))
            .collect()
    }

    fn collect_level(
        callbacks: &RwLock<IndexMap<CallbackId, Entry<K::Listener>>>,
        depth: usize,
        out: &mut Vec<(usize, CallbackId, Entry<K::Listener>)>,
    ) {
        out.extend(
            callbacks
                .read()
                .iter()
                .map(|(id, entry)| (depth, id.clone(), entry.clone())),
        );
    }

    fn remove_own(&self, id: &CallbackId) -> bool {
        let removed = self.callbacks.write().shift_remove(id).is_some();
        if removed {
            tracing::debug!(
                event = %self.name,
                target_name = %self.target_name,
                id = %id,
                "callback removed"
            );
        }
        removed
    }

    fn unknown(&self, ids: Vec<CallbackId>) -> CallbackError {
        CallbackError::UnknownCallback {
            event: self.name.clone(),
            target: self.target_name.clone(),
            ids,
        }
    }
}

impl<K: EventKind> fmt::Debug for Event<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &K::KIND)
            .field("name", &self.name)
            .field("target_name", &self.target_name)
            .field("options", &self.options)
            .field("callbacks", &self.len())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ErasedEvent
// ─────────────────────────────────────────────────────────────────────────────

/// Kind-independent view of an event, as stored by a registry.
pub(crate) trait ErasedEvent: Any + Send + Sync {
    fn name(&self) -> &str;
    fn own_len(&self) -> usize;
    fn visible_len(&self) -> usize;
    fn remove_own(&self, id: &CallbackId) -> bool;
    fn clear_own(&self);
    fn child_erased(self: Arc<Self>, target_name: &str) -> Arc<dyn ErasedEvent>;
    fn rows(&self) -> Vec<CallbackRow>;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<K: EventKind> ErasedEvent for Event<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn own_len(&self) -> usize {
        self.len()
    }

    fn visible_len(&self) -> usize {
        Event::visible_len(self)
    }

    fn remove_own(&self, id: &CallbackId) -> bool {
        Event::remove_own(self, id)
    }

    fn clear_own(&self) {
        self.clear();
    }

    fn child_erased(self: Arc<Self>, target_name: &str) -> Arc<dyn ErasedEvent> {
        self.child(target_name)
    }

    fn rows(&self) -> Vec<CallbackRow> {
        self.dispatch_list()
            .into_iter()
            .enumerate()
            .map(|(order, (id, entry))| CallbackRow {
                id,
                priority: entry.priority,
                order,
                event: self.name.clone(),
                options: entry.options,
            })
            .collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
