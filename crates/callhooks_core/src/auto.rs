//! The default event set: `on_call`, `on_return` and `on_exception`.
//!
//! [`AutoCallbacks`] wraps a target so that every call runs
//!
//! 1. the `on_call` listeners,
//! 2. the target,
//! 3. the `on_exception` listeners if the target failed,
//! 4. the `on_return` listeners with the (possibly recovered) result.
//!
//! An error still outstanding after `on_exception` is returned to the caller
//! and `on_return` does not run.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use callhooks_core::{AutoCallbacks, Registration};
//!
//! let foo = AutoCallbacks::new("foo", |(bar, baz): &(i32, i32)| Ok::<_, ()>((*bar, *baz)));
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! foo.on_return()
//!     .add_callback(
//!         move |result, _| {
//!             sink.lock().unwrap().push(*result.unwrap());
//!             Ok(())
//!         },
//!         Registration::new().pass_result(true),
//!     )
//!     .unwrap();
//!
//! assert_eq!(foo.call(&(10, 20)), Ok((10, 20)));
//! assert_eq!(*seen.lock().unwrap(), vec![(10, 20)]);
//! ```

use core::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::callback::Callback;
use crate::error::CallbackError;
use crate::event::{ErasedEvent, Event, ExceptionListener, OnCall, OnException, OnReturn};
use crate::id::{AsCallbackId, CallbackId};
use crate::listing::CallbackTable;
use crate::options::{OptionKey, Registration};
use crate::registry::{FnTarget, MethodTarget, Registry};

/// Name of the event emitted before the target runs.
pub const ON_CALL: &str = "on_call";
/// Name of the event emitted after the target returns.
pub const ON_RETURN: &str = "on_return";
/// Name of the event emitted when the target fails.
pub const ON_EXCEPTION: &str = "on_exception";

/// A target wrapped with the default event set.
///
/// `A` is the argument type (a tuple for several arguments), `R` the result
/// and `E` the error shared by the target and every listener.
pub struct AutoCallbacks<A: 'static, R: 'static, E: 'static, F: ?Sized = FnTarget<A, R, E>> {
    registry: Registry<F>,
    on_call: Arc<Event<OnCall<A, E>>>,
    on_return: Arc<Event<OnReturn<A, R, E>>>,
    on_exception: Arc<Event<OnException<A, R, E>>>,
}

impl<A: 'static, R: 'static, E: 'static, F: ?Sized> AutoCallbacks<A, R, E, F> {
    /// Wraps an already shared target.
    #[must_use]
    pub fn from_target(target_name: impl Into<String>, target: Arc<F>) -> Self {
        let target_name = target_name.into();
        let on_call = Arc::new(Event::new(ON_CALL, target_name.as_str()));
        let on_return = Arc::new(Event::new(ON_RETURN, target_name.as_str()));
        let on_exception = Arc::new(Event::new(ON_EXCEPTION, target_name.as_str()));
        Self::assemble(target_name, target, on_call, on_return, on_exception)
    }

    fn assemble(
        target_name: String,
        target: Arc<F>,
        on_call: Arc<Event<OnCall<A, E>>>,
        on_return: Arc<Event<OnReturn<A, R, E>>>,
        on_exception: Arc<Event<OnException<A, R, E>>>,
    ) -> Self {
        let mut events: IndexMap<String, Arc<dyn ErasedEvent>> = IndexMap::with_capacity(3);
        events.insert(ON_CALL.to_owned(), Arc::clone(&on_call) as Arc<dyn ErasedEvent>);
        events.insert(ON_RETURN.to_owned(), Arc::clone(&on_return) as Arc<dyn ErasedEvent>);
        events.insert(ON_EXCEPTION.to_owned(), Arc::clone(&on_exception) as Arc<dyn ErasedEvent>);
        Self {
            registry: Registry::from_parts(target_name, target, events),
            on_call,
            on_return,
            on_exception,
        }
    }

    /// Creates callbacks for the same target whose events inherit from
    /// these.
    #[must_use]
    pub fn make_child(&self, target_name: impl Into<String>) -> Self {
        let target_name = target_name.into();
        Self::assemble(
            target_name.clone(),
            Arc::clone(self.registry.target()),
            self.on_call.child(target_name.as_str()),
            self.on_return.child(target_name.as_str()),
            self.on_exception.child(target_name.as_str()),
        )
    }

    /// Listeners run before the target.
    #[must_use]
    pub fn on_call(&self) -> &Arc<Event<OnCall<A, E>>> {
        &self.on_call
    }

    /// Listeners run after the target returns.
    #[must_use]
    pub fn on_return(&self) -> &Arc<Event<OnReturn<A, R, E>>> {
        &self.on_return
    }

    /// Listeners run when the target fails.
    #[must_use]
    pub fn on_exception(&self) -> &Arc<Event<OnException<A, R, E>>> {
        &self.on_exception
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &Registry<F> {
        &self.registry
    }

    /// Display name of the target.
    #[must_use]
    pub fn target_name(&self) -> &str {
        self.registry.target_name()
    }

    /// See [`Registry::num_callbacks`].
    #[must_use]
    pub fn num_callbacks(&self) -> usize {
        self.registry.num_callbacks()
    }

    /// See [`Registry::num_visible_callbacks`].
    #[must_use]
    pub fn num_visible_callbacks(&self) -> usize {
        self.registry.num_visible_callbacks()
    }

    /// See [`Registry::remove_callback`].
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::CallbackNotRegistered`] if no event holds the
    /// id.
    pub fn remove_callback<I: AsCallbackId + ?Sized>(&self, id: &I) -> Result<(), CallbackError> {
        self.registry.remove_callback(id)
    }

    /// See [`Registry::remove_callbacks`].
    pub fn remove_callbacks(&self) {
        self.registry.remove_callbacks();
    }

    /// See [`Registry::list_callbacks`].
    #[must_use]
    pub fn list_callbacks(&self) -> CallbackTable {
        self.registry.list_callbacks()
    }

    /// See [`Registry::callbacks_info`].
    #[must_use]
    pub fn callbacks_info(&self) -> String {
        self.registry.callbacks_info()
    }

    /// See [`Registry::docs`].
    #[must_use]
    pub fn docs(&self) -> String {
        self.registry.docs()
    }

    // -- shorthands with the older argument defaults: `pass_args` is off
    // unless the registration turns it on.

    /// Registers an `on_call` listener.
    ///
    /// # Errors
    ///
    /// Same as [`Event::register`].
    pub fn add_pre_callback<C>(&self, listener: C, registration: Registration) -> Result<CallbackId, CallbackError>
    where
        C: Fn(Option<&A>) -> Result<(), E> + Send + Sync + 'static,
    {
        self.on_call
            .add_callback(listener, registration.or_option(OptionKey::PassArgs, false))
    }

    /// Registers an `on_return` listener.
    ///
    /// # Errors
    ///
    /// Same as [`Event::register`].
    pub fn add_post_callback<C>(&self, listener: C, registration: Registration) -> Result<CallbackId, CallbackError>
    where
        C: Fn(Option<&R>, Option<&A>) -> Result<(), E> + Send + Sync + 'static,
    {
        self.on_return
            .add_callback(listener, registration.or_option(OptionKey::PassArgs, false))
    }

    /// Alias of [`add_post_callback`](Self::add_post_callback).
    ///
    /// # Errors
    ///
    /// Same as [`Event::register`].
    pub fn add_callback<C>(&self, listener: C, registration: Registration) -> Result<CallbackId, CallbackError>
    where
        C: Fn(Option<&R>, Option<&A>) -> Result<(), E> + Send + Sync + 'static,
    {
        self.add_post_callback(listener, registration)
    }

    /// Registers an `on_exception` handler or observer.
    ///
    /// # Errors
    ///
    /// Same as [`Event::register`].
    pub fn add_exception_callback(
        &self,
        callback: Callback<ExceptionListener<A, R, E>>,
        registration: Registration,
    ) -> Result<CallbackId, CallbackError> {
        self.on_exception
            .register(callback, registration.or_option(OptionKey::PassArgs, false))
    }

    fn run(&self, args: &A, invoke: impl FnOnce() -> Result<R, E>) -> Result<R, E> {
        self.on_call.emit(args)?;
        let result = match invoke() {
            Ok(value) => value,
            Err(error) => self.on_exception.emit(error, args)?,
        };
        self.on_return.emit(Some(&result), args)?;
        Ok(result)
    }
}

impl<A: 'static, R: 'static, E: 'static> AutoCallbacks<A, R, E> {
    /// Wraps a free function.
    pub fn new<T>(target_name: impl Into<String>, target: T) -> Self
    where
        T: Fn(&A) -> Result<R, E> + Send + Sync + 'static,
    {
        Self::from_target(target_name, Arc::new(target))
    }

    /// Calls the target with every event emitted around it.
    ///
    /// # Errors
    ///
    /// Returns the first listener error, or the target's error if no
    /// `on_exception` handler recovered from it.
    pub fn call(&self, args: &A) -> Result<R, E> {
        self.run(args, || self.registry.call(args))
    }
}

impl<S, A: 'static, R: 'static, E: 'static> AutoCallbacks<A, R, E, MethodTarget<S, A, R, E>> {
    /// Calls the target method on `receiver` with every event emitted
    /// around it.
    ///
    /// # Errors
    ///
    /// Same as [`AutoCallbacks::call`].
    pub fn call_with(&self, receiver: &S, args: &A) -> Result<R, E> {
        self.run(args, || self.registry.call_with(receiver, args))
    }
}

impl<A: 'static, R: 'static, E: 'static, F: ?Sized> fmt::Debug for AutoCallbacks<A, R, E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoCallbacks")
            .field("target_name", &self.target_name())
            .field("on_call", &self.on_call)
            .field("on_return", &self.on_return)
            .field("on_exception", &self.on_exception)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn divide() -> AutoCallbacks<(i32, i32), i32, String> {
        AutoCallbacks::new("divide", |(a, b): &(i32, i32)| {
            if *b == 0 {
                Err("division by zero".to_string())
            } else {
                Ok(a / b)
            }
        })
    }

    fn mark(log: &Log, name: &'static str) -> impl Fn(Option<&(i32, i32)>) -> Result<(), String> + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |_: Option<&(i32, i32)>| {
            log.lock().unwrap().push(name);
            Ok(())
        }
    }

    #[test]
    fn events_fire_in_fixed_order() {
        let divide = divide();
        let log = Log::default();
        divide.on_call().add_callback(mark(&log, "call"), Registration::new()).unwrap();
        let returned = Arc::clone(&log);
        divide
            .on_return()
            .add_callback(
                move |_, _| {
                    returned.lock().unwrap().push("return");
                    Ok(())
                },
                Registration::new(),
            )
            .unwrap();
        divide
            .on_exception()
            .add_observer(mark(&log, "exception"), Registration::new())
            .unwrap();

        assert_eq!(divide.call(&(6, 3)), Ok(2));
        assert_eq!(*log.lock().unwrap(), vec!["call", "return"]);
    }

    #[test]
    fn unhandled_error_skips_on_return() {
        let divide = divide();
        let log = Log::default();
        let returned = Arc::clone(&log);
        divide
            .on_return()
            .add_callback(
                move |_, _| {
                    returned.lock().unwrap().push("return");
                    Ok(())
                },
                Registration::new(),
            )
            .unwrap();
        divide
            .on_exception()
            .add_observer(mark(&log, "exception"), Registration::new())
            .unwrap();

        assert_eq!(divide.call(&(1, 0)), Err("division by zero".to_string()));
        assert_eq!(*log.lock().unwrap(), vec!["exception"]);
    }

    #[test]
    fn recovered_value_reaches_on_return() {
        let divide = divide();
        divide
            .on_exception()
            .add_handler(|_, _| Ok(0), Registration::new())
            .unwrap();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        divide
            .on_return()
            .add_callback(
                move |result, _| {
                    *sink.lock().unwrap() = result.copied();
                    Ok(())
                },
                Registration::new().pass_result(true),
            )
            .unwrap();

        assert_eq!(divide.call(&(1, 0)), Ok(0));
        assert_eq!(*seen.lock().unwrap(), Some(0));
    }

    #[test]
    fn on_call_error_prevents_target() {
        let divide = divide();
        divide
            .on_call()
            .add_callback(|_| Err("vetoed".to_string()), Registration::new())
            .unwrap();
        assert_eq!(divide.call(&(6, 3)), Err("vetoed".to_string()));
    }

    #[test]
    fn shorthands_withhold_args_by_default() {
        let divide = divide();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pre = Arc::clone(&seen);
        divide
            .add_pre_callback(
                move |args| {
                    pre.lock().unwrap().push(args.is_some());
                    Ok(())
                },
                Registration::new(),
            )
            .unwrap();
        let post = Arc::clone(&seen);
        divide
            .add_callback(
                move |result, args| {
                    post.lock().unwrap().push(result.is_some() || args.is_some());
                    Ok(())
                },
                Registration::new(),
            )
            .unwrap();
        let with_args = Arc::clone(&seen);
        divide
            .add_post_callback(
                move |_, args| {
                    with_args.lock().unwrap().push(args.is_some());
                    Ok(())
                },
                Registration::new().pass_args(true),
            )
            .unwrap();

        divide.call(&(4, 2)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![false, false, true]);
    }

    #[test]
    fn exception_shorthand_accepts_both_shapes() {
        let divide = divide();
        divide
            .add_exception_callback(Callback::observer(|_| Ok(())), Registration::new())
            .unwrap();
        divide
            .add_exception_callback(Callback::handler(|_, _| Ok(-1)), Registration::new())
            .unwrap();
        assert_eq!(divide.call(&(1, 0)), Ok(-1));
        assert_eq!(divide.num_callbacks(), 2);
    }

    #[test]
    fn child_fires_parent_callbacks() {
        let divide = divide();
        let log = Log::default();
        divide.on_call().add_callback(mark(&log, "class"), Registration::new()).unwrap();
        let child = divide.make_child("divide");
        child.on_call().add_callback(mark(&log, "instance"), Registration::new()).unwrap();

        child.call(&(1, 1)).unwrap();
        divide.call(&(1, 1)).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["instance", "class", "class"]);
        assert_eq!(child.num_callbacks(), 1);
        assert_eq!(child.num_visible_callbacks(), 2);
    }
}
