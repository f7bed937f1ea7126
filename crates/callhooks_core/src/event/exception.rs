//! Listeners that run when the target fails.
//!
//! Listeners come in two shapes. A *handler* receives the outstanding error
//! and either recovers with a value or hands on an error. An *observer* only
//! learns that a failure happened. Dispatch threads a [`Pending`] state
//! through the listeners in priority order:
//!
//! - a handler runs only while an error is outstanding,
//! - an observer always runs, and its own error aborts dispatch,
//! - whatever is pending at the end is the outcome.

use core::fmt;
use core::marker::PhantomData;
use std::sync::Arc;

use super::{Event, EventKind};
use crate::callback::Callback;
use crate::error::CallbackError;
use crate::id::CallbackId;
use crate::options::{OptionKey, Registration};

type HandlerFn<A, R, E> = dyn Fn(E, Option<&A>) -> Result<R, E> + Send + Sync;
type ObserverFn<A, E> = dyn Fn(Option<&A>) -> Result<(), E> + Send + Sync;

/// Listener of an [`OnException`] event.
pub enum ExceptionListener<A, R, E> {
    /// Takes ownership of the outstanding error. `Ok` recovers with a value
    /// for the call; `Err` hands an error on to lower-priority handlers.
    Handler(Box<HandlerFn<A, R, E>>),
    /// Runs for every failure without touching the error.
    Observer(Box<ObserverFn<A, E>>),
}

impl<A, R, E> ExceptionListener<A, R, E> {
    /// Returns `true` for [`Handler`](Self::Handler).
    #[must_use]
    pub fn handles_exception(&self) -> bool {
        matches!(self, Self::Handler(_))
    }
}

impl<A, R, E> fmt::Debug for ExceptionListener<A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(_) => f.write_str("Handler"),
            Self::Observer(_) => f.write_str("Observer"),
        }
    }
}

/// Kind of events emitted with the target's error.
pub struct OnException<A, R, E>(PhantomData<fn(E, &A) -> Result<R, E>>);

impl<A: 'static, R: 'static, E: 'static> EventKind for OnException<A, R, E> {
    type Listener = ExceptionListener<A, R, E>;

    const KIND: &'static str = "exception";
    const DEFAULTS: &'static [(OptionKey, bool)] = &[
        (OptionKey::PassArgs, true),
        (OptionKey::HandlesException, false),
    ];

    fn fixed_option(listener: &Self::Listener) -> Option<(OptionKey, bool)> {
        Some((OptionKey::HandlesException, listener.handles_exception()))
    }
}

impl<A: 'static, R: 'static, E: 'static> Callback<ExceptionListener<A, R, E>> {
    /// Wraps a closure as an exception handler.
    pub fn handler<F>(listener: F) -> Self
    where
        F: Fn(E, Option<&A>) -> Result<R, E> + Send + Sync + 'static,
    {
        Self::from_arc(Arc::new(ExceptionListener::Handler(Box::new(listener))))
    }

    /// Wraps a closure as an exception observer.
    pub fn observer<F>(listener: F) -> Self
    where
        F: Fn(Option<&A>) -> Result<(), E> + Send + Sync + 'static,
    {
        Self::from_arc(Arc::new(ExceptionListener::Observer(Box::new(listener))))
    }

    /// Wraps a handler method bound to `receiver`.
    pub fn handler_method<S>(receiver: &Arc<S>, method: fn(&S, E, Option<&A>) -> Result<R, E>) -> Self
    where
        S: Send + Sync + 'static,
    {
        let owner = Arc::clone(receiver);
        Self::bound(
            receiver,
            method as usize,
            Arc::new(ExceptionListener::Handler(Box::new(
                move |error: E, args: Option<&A>| method(&owner, error, args),
            ))),
        )
    }

    /// Wraps an observer method bound to `receiver`.
    pub fn observer_method<S>(receiver: &Arc<S>, method: fn(&S, Option<&A>) -> Result<(), E>) -> Self
    where
        S: Send + Sync + 'static,
    {
        let owner = Arc::clone(receiver);
        Self::bound(
            receiver,
            method as usize,
            Arc::new(ExceptionListener::Observer(Box::new(
                move |args: Option<&A>| method(&owner, args),
            ))),
        )
    }
}

/// Outcome carried between exception listeners.
enum Pending<R, E> {
    Raised(E),
    Recovered(R),
}

impl<A: 'static, R: 'static, E: 'static> Event<OnException<A, R, E>> {
    /// Registers a handler closure. See [`Event::register`].
    ///
    /// # Errors
    ///
    /// Same as [`Event::register`]. Overriding `handles_exception` to
    /// `false` is an [`CallbackError::InvalidOption`].
    pub fn add_handler<F>(&self, listener: F, registration: Registration) -> Result<CallbackId, CallbackError>
    where
        F: Fn(E, Option<&A>) -> Result<R, E> + Send + Sync + 'static,
    {
        self.register(Callback::handler(listener), registration)
    }

    /// Registers an observer closure. See [`Event::register`].
    ///
    /// # Errors
    ///
    /// Same as [`Event::register`]. Overriding `handles_exception` to
    /// `true` is an [`CallbackError::InvalidOption`].
    pub fn add_observer<F>(&self, listener: F, registration: Registration) -> Result<CallbackId, CallbackError>
    where
        F: Fn(Option<&A>) -> Result<(), E> + Send + Sync + 'static,
    {
        self.register(Callback::observer(listener), registration)
    }

    /// Dispatches `error` to the visible listeners.
    ///
    /// Returns the value of the first handler that recovers; later handlers
    /// are skipped.
    ///
    /// # Errors
    ///
    /// Returns the error still outstanding after every listener ran, or the
    /// first error raised by an observer.
    pub fn emit(&self, error: E, args: &A) -> Result<R, E> {
        let listeners = self.dispatch_list();
        tracing::trace!(
            event = %self.name(),
            target_name = %self.target_name(),
            listeners = listeners.len(),
            "emitting"
        );

        let mut pending = Pending::Raised(error);
        for (id, entry) in listeners {
            let args = entry.flag(OptionKey::PassArgs).then_some(args);
            pending = match (entry.function().as_ref(), pending) {
                (ExceptionListener::Handler(handler), Pending::Raised(error)) => {
                    match handler(error, args) {
                        Ok(value) => Pending::Recovered(value),
                        Err(error) => {
                            tracing::warn!(
                                event = %self.name(),
                                target_name = %self.target_name(),
                                id = %id,
                                "exception handler failed, passing error on"
                            );
                            Pending::Raised(error)
                        }
                    }
                }
                (ExceptionListener::Handler(_), recovered @ Pending::Recovered(_)) => recovered,
                (ExceptionListener::Observer(observer), pending) => {
                    observer(args)?;
                    pending
                }
            };
        }

        match pending {
            Pending::Raised(error) => Err(error),
            Pending::Recovered(value) => Ok(value),
        }
    }
}
