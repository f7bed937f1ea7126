//! Callback identifiers.

use core::fmt;

/// Key a callback is stored under within one event.
///
/// Ids are unique within a single event's own callbacks. An instance-level
/// event and the class-level event it inherits from may each hold the same
/// id independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallbackId {
    /// Caller-supplied label.
    Label(String),
    /// Identity of a plain callable: the address of its shared allocation.
    Callable(usize),
    /// Identity of a method bound to a receiver, so the same method bound to
    /// two receivers never collides.
    Method {
        /// Address of the receiver's allocation.
        receiver: usize,
        /// Address of the method's function pointer.
        method: usize,
    },
}

impl CallbackId {
    /// Creates a [`Label`](Self::Label) id.
    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }

    /// Returns the label if this id was supplied by the caller.
    #[must_use]
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Label(label) => Some(label),
            _ => None,
        }
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => f.write_str(label),
            Self::Callable(addr) => write!(f, "{addr}"),
            Self::Method { receiver, method } => write!(f, "({receiver}, {method})"),
        }
    }
}

impl From<&str> for CallbackId {
    fn from(label: &str) -> Self {
        Self::Label(label.to_owned())
    }
}

impl From<String> for CallbackId {
    fn from(label: String) -> Self {
        Self::Label(label)
    }
}

impl From<&CallbackId> for CallbackId {
    fn from(id: &CallbackId) -> Self {
        id.clone()
    }
}

/// Anything that resolves to the [`CallbackId`] a callback was stored under.
///
/// Implemented for ids, string labels and [`Callback`](crate::Callback)
/// handles, so a callback can be removed by the id `add_callback` returned,
/// by its label, or by the original handle.
pub trait AsCallbackId {
    /// Returns the id this value resolves to.
    fn callback_id(&self) -> CallbackId;
}

impl AsCallbackId for CallbackId {
    fn callback_id(&self) -> CallbackId {
        self.clone()
    }
}

impl AsCallbackId for str {
    fn callback_id(&self) -> CallbackId {
        CallbackId::from(self)
    }
}

impl AsCallbackId for String {
    fn callback_id(&self) -> CallbackId {
        CallbackId::Label(self.clone())
    }
}

impl<T: AsCallbackId + ?Sized> AsCallbackId for &T {
    fn callback_id(&self) -> CallbackId {
        (**self).callback_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_variant() {
        assert_eq!(CallbackId::from("good_id").to_string(), "good_id");
        assert_eq!(CallbackId::Callable(42).to_string(), "42");
        assert_eq!(
            CallbackId::Method {
                receiver: 1,
                method: 2
            }
            .to_string(),
            "(1, 2)"
        );
    }

    #[test]
    fn labels_resolve_through_references() {
        let label = String::from("x");
        assert_eq!((&label).callback_id(), CallbackId::label("x"));
        assert_eq!("x".callback_id(), CallbackId::label("x"));
        assert_eq!(CallbackId::label("x").as_label(), Some("x"));
        assert_eq!(CallbackId::Callable(7).as_label(), None);
    }
}
