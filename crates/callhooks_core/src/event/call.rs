//! Listeners that run before the target.

use core::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;

use super::{Event, EventKind};
use crate::callback::Callback;
use crate::error::CallbackError;
use crate::id::CallbackId;
use crate::options::{OptionKey, Registration};

/// Listener of an [`OnCall`] event: receives the target's arguments when
/// its `pass_args` option is set.
pub type CallListener<A, E, T = ()> = dyn Fn(Option<&A>) -> Result<T, E> + Send + Sync;

/// Kind of events emitted with the target's arguments only.
///
/// `A` is the argument type, `E` the error a listener may fail with and `T`
/// the value each listener returns.
pub struct OnCall<A, E, T = ()>(PhantomData<fn(&A) -> Result<T, E>>);

impl<A: 'static, E: 'static, T: 'static> EventKind for OnCall<A, E, T> {
    type Listener = CallListener<A, E, T>;

    const KIND: &'static str = "call";
    const DEFAULTS: &'static [(OptionKey, bool)] = &[(OptionKey::PassArgs, true)];
}

impl<A: 'static, E: 'static, T: 'static> Callback<CallListener<A, E, T>> {
    /// Wraps a closure as an [`OnCall`] listener.
    pub fn on_call<F>(listener: F) -> Self
    where
        F: Fn(Option<&A>) -> Result<T, E> + Send + Sync + 'static,
    {
        Self::from_arc(Arc::new(listener))
    }

    /// Wraps `method` bound to `receiver`.
    ///
    /// The listener keeps `receiver` alive. Binding the same method to the
    /// same receiver twice yields the same id.
    pub fn on_call_method<S>(receiver: &Arc<S>, method: fn(&S, Option<&A>) -> Result<T, E>) -> Self
    where
        S: Send + Sync + 'static,
    {
        let owner = Arc::clone(receiver);
        Self::bound(
            receiver,
            method as usize,
            Arc::new(move |args: Option<&A>| method(&owner, args)),
        )
    }
}

impl<A: 'static, E: 'static, T: 'static> Event<OnCall<A, E, T>> {
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
        F: Fn(Option<&A>) -> Result<T, E> + Send + Sync + 'static,
    {
        self.register(Callback::on_call(listener), registration)
    }

    /// Runs every visible callback in dispatch order.
    ///
    /// Returns each callback's value keyed by id.
    ///
    /// # Errors
    ///
    /// The first listener error stops dispatch and is returned.
    pub fn emit(&self, args: &A) -> Result<IndexMap<CallbackId, T>, E> {
        let listeners = self.dispatch_list();
        tracing::trace!(
            event = %self.name(),
            target_name = %self.target_name(),
            listeners = listeners.len(),
            "emitting"
        );

        let mut results = IndexMap::with_capacity(listeners.len());
        for (id, entry) in listeners {
            let args = entry.flag(OptionKey::PassArgs).then_some(args);
            let value = (entry.function())(args)?;
            results.insert(id, value);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    type Seen = Arc<Mutex<Vec<Option<u32>>>>;

    fn recorder(seen: &Seen) -> impl Fn(Option<&u32>) -> Result<(), String> + Send + Sync + 'static {
        let seen = Arc::clone(seen);
        move |args: Option<&u32>| {
            seen.lock().unwrap().push(args.copied());
            Ok(())
        }
    }

    #[test]
    fn pass_args_controls_delivery() {
        let event = Event::<OnCall<u32, String>>::new("on_call", "foo");
        let seen = Seen::default();
        event
            .add_callback(recorder(&seen), Registration::new().with_id("with"))
            .unwrap();
        event
            .add_callback(
                recorder(&seen),
                Registration::new().with_id("without").pass_args(false),
            )
            .unwrap();

        let results = event.emit(&7).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(*seen.lock().unwrap(), vec![Some(7), None]);
    }

    #[test]
    fn event_defaults_apply_to_new_callbacks() {
        let event = Event::<OnCall<u32, String>>::with_options(
            "on_call",
            "foo",
            &[(OptionKey::PassArgs, false)],
        )
        .unwrap();
        let seen = Seen::default();
        event.add_callback(recorder(&seen), Registration::new()).unwrap();
        event.emit(&1).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![None]);
    }

    #[test]
    fn results_are_keyed_by_id() {
        let event = Event::<OnCall<u32, String, u32>>::new("on_call", "foo");
        event
            .add_callback(|args| Ok(args.copied().unwrap_or(0) * 2), Registration::new().with_id("double"))
            .unwrap();
        let results = event.emit(&21).unwrap();
        assert_eq!(results.get(&CallbackId::from("double")), Some(&42));
    }

    #[test]
    fn listener_error_stops_dispatch() {
        let event = Event::<OnCall<u32, String>>::new("on_call", "foo");
        let seen = Seen::default();
        event
            .add_callback(
                |_| Err("boom".to_string()),
                Registration::new().with_priority(1),
            )
            .unwrap();
        event.add_callback(recorder(&seen), Registration::new()).unwrap();
        assert_eq!(event.emit(&1), Err("boom".to_string()));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn listener_may_remove_itself() {
        let event = Arc::new(Event::<OnCall<u32, String>>::new("on_call", "foo"));
        let handle = Arc::downgrade(&event);
        event
            .add_callback(
                move |_| {
                    if let Some(event) = handle.upgrade() {
                        event.remove_callback("once").map_err(|err| err.to_string())?;
                    }
                    Ok(())
                },
                Registration::new().with_id("once"),
            )
            .unwrap();
        event.emit(&1).unwrap();
        assert!(event.is_empty());
    }

    struct Counter(Mutex<u32>);

    impl Counter {
        fn bump(&self, _args: Option<&u32>) -> Result<(), String> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[test]
    fn bound_method_identity_is_per_receiver() {
        let event = Event::<OnCall<u32, String>>::new("on_call", "foo");
        let a = Arc::new(Counter(Mutex::new(0)));
        let b = Arc::new(Counter(Mutex::new(0)));
        event
            .register(Callback::on_call_method(&a, Counter::bump), Registration::new())
            .unwrap();
        event
            .register(Callback::on_call_method(&b, Counter::bump), Registration::new())
            .unwrap();
        assert!(event
            .register(Callback::on_call_method(&a, Counter::bump), Registration::new())
            .is_err());

        event.emit(&0).unwrap();
        assert_eq!(*a.0.lock().unwrap(), 1);
        assert_eq!(*b.0.lock().unwrap(), 1);

        event
            .remove_callback(&Callback::on_call_method(&a, Counter::bump))
            .unwrap();
        assert_eq!(event.len(), 1);
    }
}
