//! Listeners that run after the target returns.

use core::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;

use super::{Event, EventKind};
use crate::callback::Callback;
use crate::error::CallbackError;
use crate::id::CallbackId;
use crate::options::{OptionKey, Registration};

/// Listener of an [`OnReturn`] event: `(result, args)`, each present only
/// when the matching option is set.
pub type ReturnListener<A, R, E, T = ()> =
    dyn Fn(Option<&R>, Option<&A>) -> Result<T, E> + Send + Sync;

/// Kind of events emitted with the target's result and arguments.
pub struct OnReturn<A, R, E, T = ()>(PhantomData<fn(&A, &R) -> Result<T, E>>);

impl<A: 'static, R: 'static, E: 'static, T: 'static> EventKind for OnReturn<A, R, E, T> {
    type Listener = ReturnListener<A, R, E, T>;

    const KIND: &'static str = "return";
    const DEFAULTS: &'static [(OptionKey, bool)] =
        &[(OptionKey::PassArgs, true), (OptionKey::PassResult, false)];
}

impl<A: 'static, R: 'static, E: 'static, T: 'static> Callback<ReturnListener<A, R, E, T>> {
    /// Wraps a closure as an [`OnReturn`] listener.
    pub fn on_return<F>(listener: F) -> Self
    where
        F: Fn(Option<&R>, Option<&A>) -> Result<T, E> + Send + Sync + 'static,
    {
        Self::from_arc(Arc::new(listener))
    }

    /// Wraps `method` bound to `receiver`.
    pub fn on_return_method<S>(
        receiver: &Arc<S>,
        method: fn(&S, Option<&R>, Option<&A>) -> Result<T, E>,
    ) -> Self
    where
        S: Send + Sync + 'static,
    {
        let owner = Arc::clone(receiver);
        Self::bound(
            receiver,
            method as usize,
            Arc::new(move |result: Option<&R>, args: Option<&A>| method(&owner, result, args)),
        )
    }
}

impl<A: 'static, R: 'static, E: 'static, T: 'static> Event<OnReturn<A, R, E, T>> {
    /// Registers a closure. See [`Event::register`].
    ///
    /// # Errors
    ///
    /// Same as [`Event::register`].
    pub fn add_callback<F>(
        &self,
        listener: F,
        registration: Registration,
    ) -> Result<CallbackId, CallbackError>
    where
        F: Fn(Option<&R>, Option<&A>) -> Result<T, E> + Send + Sync + 'static,
    {
        self.register(Callback::on_return(listener), registration)
    }

    /// Runs every visible callback in dispatch order.
    ///
    /// `result` reaches listeners with `pass_result` set, `args` those with
    /// `pass_args` set.
    ///
    /// # Errors
    ///
    /// The first listener error stops dispatch and is returned.
    pub fn emit(&self, result: Option<&R>, args: &A) -> Result<IndexMap<CallbackId, T>, E> {
        let listeners = self.dispatch_list();
        tracing::trace!(
            event = %self.name(),
            target_name = %self.target_name(),
            listeners = listeners.len(),
            "emitting"
        );

        let mut results = IndexMap::with_capacity(listeners.len());
        for (id, entry) in listeners {
            let result = result.filter(|_| entry.flag(OptionKey::PassResult));
            let args = entry.flag(OptionKey::PassArgs).then_some(args);
            let value = (entry.function())(result, args)?;
            results.insert(id, value);
        }
        Ok(results)
    }
}
