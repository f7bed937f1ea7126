//! Error types for event configuration and callback registration.

use crate::id::CallbackId;

/// Errors raised while configuring events or registering and removing
/// callbacks.
///
/// Failures raised by listeners or by the wrapped target use the caller's
/// own error type and never appear here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CallbackError {
    /// The priority could not be converted to an orderable float.
    #[error("priority '{value}' could not be cast into a float")]
    InvalidPriority {
        /// The rejected input, rendered as text.
        value: String,
    },

    /// An option was supplied that the event does not recognize, or that
    /// contradicts the shape of the listener being registered.
    #[error("invalid option '{option}' for event '{event}': expected one of {recognized:?}")]
    InvalidOption {
        /// Name of the event the option was given to.
        event: String,
        /// The offending option name.
        option: String,
        /// Options the event accepts.
        recognized: Vec<&'static str>,
    },

    /// A callback with this id is already registered on the event itself.
    #[error("{event}: callback with id \"{id}\" already registered on \"{target}\"")]
    DuplicateCallback {
        /// Name of the event.
        event: String,
        /// Display name of the wrapped target.
        target: String,
        /// The colliding id.
        id: CallbackId,
    },

    /// Two events with the same name were bound to one registry.
    #[error("event \"{name}\" already registered")]
    DuplicateEvent {
        /// The repeated event name.
        name: String,
    },

    /// One or more ids are not registered on the event itself.
    ///
    /// For batch removal every resolvable id has already been removed when
    /// this is returned.
    #[error("{event}: no callbacks with ids [{}] attached to \"{target}\"", join_ids(.ids))]
    UnknownCallback {
        /// Name of the event.
        event: String,
        /// Display name of the wrapped target.
        target: String,
        /// Every id that could not be found.
        ids: Vec<CallbackId>,
    },

    /// No event of the registry holds a callback with this id.
    #[error("no callback with id \"{id}\" attached to any event of \"{target}\"")]
    CallbackNotRegistered {
        /// Display name of the wrapped target.
        target: String,
        /// The id that was searched for.
        id: CallbackId,
    },
}

fn join_ids(ids: &[CallbackId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
