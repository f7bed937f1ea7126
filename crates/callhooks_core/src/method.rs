//! Per-instance callbacks for methods.
//!
//! A [`MethodCallbacks`] holds the class-level callbacks of a method on `S`.
//! [`MethodCallbacks::bind`] pairs it with one owner and returns a
//! [`BoundMethod`] whose events inherit from the class-level ones: class-level
//! listeners fire for every owner, listeners added through a bound method
//! fire only for that owner. [`MethodRegistry`] and [`BoundRegistry`] do the
//! same for a method with its own event set.
//!
//! Instance-level callbacks are cached per owner. The cache holds owners
//! weakly, so registering callbacks never keeps an owner alive, and entries
//! of dropped owners are discarded the next time the cache is consulted.

use core::fmt;
use core::ops::Deref;
use std::sync::{Arc, Weak};

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::auto::AutoCallbacks;
use crate::registry::{MethodTarget, Registry, ScopedTarget};

type MethodCallbacksOf<S, A, R, E> = AutoCallbacks<A, R, E, MethodTarget<S, A, R, E>>;

// ─────────────────────────────────────────────────────────────────────────────
// InstanceCache
// ─────────────────────────────────────────────────────────────────────────────

struct Instance<S, T> {
    owner: Weak<S>,
    scoped: Arc<T>,
}

/// Instance-level values keyed by owner address.
struct InstanceCache<S, T> {
    entries: Mutex<HashMap<usize, Instance<S, T>>>,
}

impl<S, T> InstanceCache<S, T> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the value cached for `owner`, creating it with `make` on the
    /// first lookup.
    fn get_or_insert_with(&self, owner: &Arc<S>, target_name: &str, make: impl FnOnce() -> T) -> Arc<T> {
        let key = Arc::as_ptr(owner).addr();
        let mut entries = self.entries.lock();
        Self::prune(&mut entries, target_name);

        if let Some(instance) = entries.get(&key) {
            return Arc::clone(&instance.scoped);
        }
        let scoped = Arc::new(make());
        tracing::debug!(%target_name, owner = key, "created instance-level callbacks");
        entries.insert(
            key,
            Instance {
                owner: Arc::downgrade(owner),
                scoped: Arc::clone(&scoped),
            },
        );
        scoped
    }

    fn live(&self, target_name: &str) -> usize {
        let mut entries = self.entries.lock();
        Self::prune(&mut entries, target_name);
        entries.len()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn prune(entries: &mut HashMap<usize, Instance<S, T>>, target_name: &str) {
        let before = entries.len();
        entries.retain(|_, instance| instance.owner.strong_count() > 0);
        let pruned = before - entries.len();
        if pruned > 0 {
            tracing::debug!(%target_name, pruned, "dropped callbacks of released owners");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MethodCallbacks
// ─────────────────────────────────────────────────────────────────────────────

/// Class-level callbacks of a method, plus the instance-level callbacks of
/// every owner it has been bound to.
///
/// Dereferences to the class-level [`AutoCallbacks`]; listeners registered
/// there fire for every owner.
///
/// ```
/// use std::sync::Arc;
///
/// use callhooks_core::{MethodCallbacks, Registration};
///
/// struct Greeter(&'static str);
///
/// let greet = MethodCallbacks::new("greet", |greeter: &Greeter, name: &String| {
///     Ok::<_, ()>(format!("{}, {name}", greeter.0))
/// });
///
/// let hello = Arc::new(Greeter("hello"));
/// let bound = greet.bind(&hello);
/// bound
///     .on_call()
///     .add_callback(|_| Ok(()), Registration::new())
///     .unwrap();
///
/// assert_eq!(bound.call(&"ann".to_string()), Ok("hello, ann".to_string()));
/// assert_eq!(greet.num_callbacks(), 0);
/// assert_eq!(greet.bind(&hello).num_callbacks(), 1);
/// ```
pub struct MethodCallbacks<S, A: 'static, R: 'static, E: 'static> {
    class: MethodCallbacksOf<S, A, R, E>,
    instances: InstanceCache<S, MethodCallbacksOf<S, A, R, E>>,
}

impl<S, A, R, E> MethodCallbacks<S, A, R, E>
where
    S: Send + Sync + 'static,
    A: 'static,
    R: 'static,
    E: 'static,
{
    /// Wraps `method`, displayed as `target_name`.
    pub fn new<T>(target_name: impl Into<String>, method: T) -> Self
    where
        T: Fn(&S, &A) -> Result<R, E> + Send + Sync + 'static,
    {
        Self {
            class: AutoCallbacks::from_target(target_name, Arc::new(method)),
            instances: InstanceCache::new(),
        }
    }

    /// The class-level callbacks.
    #[must_use]
    pub fn class(&self) -> &MethodCallbacksOf<S, A, R, E> {
        &self.class
    }

    /// Returns the method bound to `owner`.
    ///
    /// The first bind for an owner creates its instance-level callbacks;
    /// later binds for the same owner return the same ones.
    pub fn bind(&self, owner: &Arc<S>) -> BoundMethod<S, A, R, E> {
        let target_name = self.class.target_name();
        let callbacks = self
            .instances
            .get_or_insert_with(owner, target_name, || self.class.make_child(target_name));
        BoundMethod {
            owner: Arc::clone(owner),
            callbacks,
        }
    }

    /// Calls the method on `receiver` through the class-level callbacks
    /// only.
    ///
    /// # Errors
    ///
    /// Same as [`AutoCallbacks::call`].
    pub fn call_with(&self, receiver: &S, args: &A) -> Result<R, E> {
        self.class.call_with(receiver, args)
    }

    /// Number of owners with live instance-level callbacks.
    #[must_use]
    pub fn bound_instances(&self) -> usize {
        self.instances.live(self.class.target_name())
    }
}

impl<S, A: 'static, R: 'static, E: 'static> Deref for MethodCallbacks<S, A, R, E> {
    type Target = MethodCallbacksOf<S, A, R, E>;

    fn deref(&self) -> &Self::Target {
        &self.class
    }
}

impl<S, A: 'static, R: 'static, E: 'static> fmt::Debug for MethodCallbacks<S, A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodCallbacks")
            .field("class", &self.class)
            .field("instances", &self.instances.len())
            .finish()
    }
}

/// A method bound to one owner.
///
/// Dereferences to the owner's instance-level [`AutoCallbacks`].
pub struct BoundMethod<S, A: 'static, R: 'static, E: 'static> {
    owner: Arc<S>,
    callbacks: Arc<MethodCallbacksOf<S, A, R, E>>,
}

impl<S, A: 'static, R: 'static, E: 'static> BoundMethod<S, A, R, E> {
    /// Calls the method on the owner, running class-level and
    /// instance-level listeners.
    ///
    /// # Errors
    ///
    /// Same as [`AutoCallbacks::call`].
    pub fn call(&self, args: &A) -> Result<R, E> {
        self.callbacks.call_with(&self.owner, args)
    }

    /// The owner this method is bound to.
    #[must_use]
    pub fn owner(&self) -> &Arc<S> {
        &self.owner
    }
}

impl<S, A: 'static, R: 'static, E: 'static> Clone for BoundMethod<S, A, R, E> {
    fn clone(&self) -> Self {
        Self {
            owner: Arc::clone(&self.owner),
            callbacks: Arc::clone(&self.callbacks),
        }
    }
}

impl<S, A: 'static, R: 'static, E: 'static> Deref for BoundMethod<S, A, R, E> {
    type Target = MethodCallbacksOf<S, A, R, E>;

    fn deref(&self) -> &Self::Target {
        &self.callbacks
    }
}

impl<S, A: 'static, R: 'static, E: 'static> fmt::Debug for BoundMethod<S, A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MethodRegistry
// ─────────────────────────────────────────────────────────────────────────────

/// A method with its own event set, scoped per owner like
/// [`MethodCallbacks`].
///
/// The method is a [`ScopedTarget`]: it receives the events of the registry
/// it is called through and emits them itself. Calling through a
/// [`BoundRegistry`] hands it the owner's instance-level events, so
/// class-level and that owner's listeners run.
///
/// ```
/// use std::sync::Arc;
///
/// use callhooks_core::{EventSpec, Events, MethodRegistry, OnCall, Registration, Registry, ScopedTarget};
///
/// struct Counter;
///
/// let target: Arc<ScopedTarget<Counter, u32, u32, ()>> =
///     Arc::new(|_: &Counter, events: &Events, n: &u32| {
///         if let Some(on_step) = events.event::<OnCall<u32, ()>>("on_step") {
///             for i in 0..*n {
///                 on_step.emit(&i)?;
///             }
///         }
///         Ok(*n)
///     });
/// let count = MethodRegistry::new(
///     Registry::builder("count", target)
///         .event(EventSpec::new::<OnCall<u32, ()>>("on_step"))
///         .build()
///         .unwrap(),
/// );
///
/// let counter = Arc::new(Counter);
/// let bound = count.bind(&counter);
/// bound
///     .event::<OnCall<u32, ()>>("on_step")
///     .unwrap()
///     .add_callback(|_| Ok(()), Registration::new())
///     .unwrap();
///
/// assert_eq!(bound.call(&3), Ok(3));
/// assert_eq!(count.num_callbacks(), 0);
/// assert_eq!(count.bind(&counter).num_callbacks(), 1);
/// ```
pub struct MethodRegistry<S, A, R, E> {
    class: Registry<ScopedTarget<S, A, R, E>>,
    instances: InstanceCache<S, Registry<ScopedTarget<S, A, R, E>>>,
}

impl<S, A, R, E> MethodRegistry<S, A, R, E> {
    /// Wraps a class-level registry.
    #[must_use]
    pub fn new(class: Registry<ScopedTarget<S, A, R, E>>) -> Self {
        Self {
            class,
            instances: InstanceCache::new(),
        }
    }

    /// The class-level registry.
    #[must_use]
    pub fn class(&self) -> &Registry<ScopedTarget<S, A, R, E>> {
        &self.class
    }

    /// Returns the registry bound to `owner`.
    ///
    /// The first bind for an owner creates its instance-level events; later
    /// binds for the same owner return the same ones.
    pub fn bind(&self, owner: &Arc<S>) -> BoundRegistry<S, A, R, E> {
        let target_name = self.class.target_name();
        let registry = self
            .instances
            .get_or_insert_with(owner, target_name, || self.class.make_child(target_name));
        BoundRegistry {
            owner: Arc::clone(owner),
            registry,
        }
    }

    /// Number of owners with live instance-level events.
    #[must_use]
    pub fn bound_instances(&self) -> usize {
        self.instances.live(self.class.target_name())
    }
}

impl<S, A, R, E> From<Registry<ScopedTarget<S, A, R, E>>> for MethodRegistry<S, A, R, E> {
    fn from(class: Registry<ScopedTarget<S, A, R, E>>) -> Self {
        Self::new(class)
    }
}

impl<S, A, R, E> Deref for MethodRegistry<S, A, R, E> {
    type Target = Registry<ScopedTarget<S, A, R, E>>;

    fn deref(&self) -> &Self::Target {
        &self.class
    }
}

impl<S, A, R, E> fmt::Debug for MethodRegistry<S, A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("class", &self.class)
            .field("instances", &self.instances.len())
            .finish()
    }
}

/// A [`MethodRegistry`] bound to one owner.
///
/// Dereferences to the owner's instance-level [`Registry`].
pub struct BoundRegistry<S, A, R, E> {
    owner: Arc<S>,
    registry: Arc<Registry<ScopedTarget<S, A, R, E>>>,
}

impl<S, A, R, E> BoundRegistry<S, A, R, E> {
    /// Calls the method on the owner with the owner's events.
    ///
    /// # Errors
    ///
    /// Returns the target's error.
    pub fn call(&self, args: &A) -> Result<R, E> {
        self.registry.call_with(&self.owner, args)
    }

    /// The owner this registry is bound to.
    #[must_use]
    pub fn owner(&self) -> &Arc<S> {
        &self.owner
    }
}

impl<S, A, R, E> Clone for BoundRegistry<S, A, R, E> {
    fn clone(&self) -> Self {
        Self {
            owner: Arc::clone(&self.owner),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<S, A, R, E> Deref for BoundRegistry<S, A, R, E> {
    type Target = Registry<ScopedTarget<S, A, R, E>>;

    fn deref(&self) -> &Self::Target {
        &self.registry
    }
}

impl<S, A, R, E> fmt::Debug for BoundRegistry<S, A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundRegistry")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
