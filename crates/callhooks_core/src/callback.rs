//! Shareable listener handles.
//!
//! A [`Callback`] pairs a listener with the identity it registers under when
//! no explicit id is supplied. Each event kind adds its own constructors
//! (`Callback::on_call`, `Callback::on_return`, `Callback::handler`,
//! `Callback::observer` and their `*_method` variants).

use core::fmt;
use std::sync::Arc;

use crate::id::{AsCallbackId, CallbackId};

/// A listener plus its identity.
///
/// Cloning a `Callback` keeps its identity, so the same handle can later be
/// passed to `remove_callback`. Handles built from separate closures never
/// share an identity; handles built from the same method on the same
/// receiver always do.
pub struct Callback<F: ?Sized> {
    function: Arc<F>,
    id: CallbackId,
}

impl<F: ?Sized> Callback<F> {
    /// Wraps an already shared listener. Its identity is the address of the
    /// shared allocation.
    #[must_use]
    pub fn from_arc(function: Arc<F>) -> Self {
        let id = CallbackId::Callable(Arc::as_ptr(&function).cast::<()>().addr());
        Self { function, id }
    }

    /// Wraps a listener that forwards to `method` on `receiver`.
    pub(crate) fn bound<S: ?Sized>(receiver: &Arc<S>, method: usize, function: Arc<F>) -> Self {
        let id = CallbackId::Method {
            receiver: Arc::as_ptr(receiver).cast::<()>().addr(),
            method,
        };
        Self { function, id }
    }

    /// The id this callback registers under when none is supplied.
    #[must_use]
    pub fn id(&self) -> &CallbackId {
        &self.id
    }

    /// The shared listener.
    #[must_use]
    pub fn function(&self) -> &Arc<F> {
        &self.function
    }
}

impl<F: ?Sized> Clone for Callback<F> {
    fn clone(&self) -> Self {
        Self {
            function: Arc::clone(&self.function),
            id: self.id.clone(),
        }
    }
}

impl<F: ?Sized> fmt::Debug for Callback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").field("id", &self.id).finish()
    }
}

impl<F: ?Sized> AsCallbackId for Callback<F> {
    fn callback_id(&self) -> CallbackId {
        self.id.clone()
    }
}
