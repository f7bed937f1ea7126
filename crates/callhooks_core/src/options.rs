//! Per-callback options and registration parameters.
//!
//! Every event kind declares the options it recognizes together with their
//! class-level defaults. An event may override those defaults, and each
//! registration may override the event's. The resolved [`Options`] stored on
//! an entry always hold exactly the keys the event recognizes.

use core::fmt;

use indexmap::IndexMap;

use crate::error::CallbackError;
use crate::id::CallbackId;
use crate::priority::{IntoPriority, Priority};

/// Name of a per-callback option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionKey {
    /// The listener receives the exception raised by the target.
    HandlesException,
    /// The listener receives the target's arguments.
    PassArgs,
    /// The listener receives the target's result.
    PassResult,
}

impl OptionKey {
    /// Returns the option's name, e.g. `pass_args`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HandlesException => "handles_exception",
            Self::PassArgs => "pass_args",
            Self::PassResult => "pass_result",
        }
    }

    /// Returns the column heading used in callback listings, e.g. `Pass args`.
    #[must_use]
    pub fn heading(self) -> String {
        let spaced = self.as_str().replace('_', " ");
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved option values of an event or of a registered callback.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Options {
    values: IndexMap<OptionKey, bool>,
}

impl Options {
    /// Builds options from a kind's declared defaults.
    pub(crate) fn from_defaults(defaults: &[(OptionKey, bool)]) -> Self {
        Self {
            values: defaults.iter().copied().collect(),
        }
    }

    /// Returns a copy with `overrides` applied.
    ///
    /// Fails with [`CallbackError::InvalidOption`] if an override names a key
    /// these options do not hold.
    pub(crate) fn merged(
        &self,
        overrides: &[(OptionKey, bool)],
        event: &str,
    ) -> Result<Self, CallbackError> {
        let mut merged = self.clone();
        for &(key, value) in overrides {
            match merged.values.get_mut(&key) {
                Some(slot) => *slot = value,
                None => return Err(self.invalid(key, event)),
            }
        }
        Ok(merged)
    }

    pub(crate) fn invalid(&self, key: OptionKey, event: &str) -> CallbackError {
        CallbackError::InvalidOption {
            event: event.to_owned(),
            option: key.as_str().to_owned(),
            recognized: self.values.keys().map(|key| key.as_str()).collect(),
        }
    }

    pub(crate) fn set(&mut self, key: OptionKey, value: bool) {
        self.values.insert(key, value);
    }

    /// Returns the value of `key`, or `None` if it is not recognized.
    #[must_use]
    pub fn get(&self, key: OptionKey) -> Option<bool> {
        self.values.get(&key).copied()
    }

    /// Returns the value of `key`, treating unrecognized keys as `false`.
    #[must_use]
    pub fn flag(&self, key: OptionKey) -> bool {
        self.get(key).unwrap_or(false)
    }

    /// Iterates over `(key, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (OptionKey, bool)> + '_ {
        self.values.iter().map(|(key, value)| (*key, *value))
    }

    /// Iterates over the recognized keys.
    pub fn keys(&self) -> impl Iterator<Item = OptionKey> + '_ {
        self.values.keys().copied()
    }

    /// Number of recognized options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no option is recognized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parameters of one `add_callback` call.
///
/// # Example
///
/// ```
/// use callhooks_core::{OptionKey, Registration};
///
/// let registration = Registration::new()
///     .with_priority(1.1)
///     .with_id("c")
///     .pass_args(false)
///     .pass_result(true);
/// assert_eq!(registration.option(OptionKey::PassResult), Some(true));
/// assert_eq!(registration.option(OptionKey::HandlesException), None);
/// ```
#[derive(Debug, Clone)]
pub struct Registration {
    priority: Result<Priority, CallbackError>,
    id: Option<CallbackId>,
    overrides: Vec<(OptionKey, bool)>,
}

impl Default for Registration {
    fn default() -> Self {
        Self {
            priority: Ok(Priority::DEFAULT),
            id: None,
            overrides: Vec::new(),
        }
    }
}

impl Registration {
    /// Creates a registration with priority 0, no id and no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the priority. Conversion errors surface from `add_callback`.
    #[must_use]
    pub fn with_priority(mut self, priority: impl IntoPriority) -> Self {
        self.priority = priority.into_priority();
        self
    }

    /// Sets an explicit id instead of the callback's identity.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<CallbackId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Overrides one option for this callback.
    #[must_use]
    pub fn with_option(mut self, key: OptionKey, value: bool) -> Self {
        self.overrides.retain(|(existing, _)| *existing != key);
        self.overrides.push((key, value));
        self
    }

    /// Overrides `pass_args`.
    #[must_use]
    pub fn pass_args(self, value: bool) -> Self {
        self.with_option(OptionKey::PassArgs, value)
    }

    /// Overrides `pass_result`.
    #[must_use]
    pub fn pass_result(self, value: bool) -> Self {
        self.with_option(OptionKey::PassResult, value)
    }

    /// Overrides `handles_exception`.
    #[must_use]
    pub fn handles_exception(self, value: bool) -> Self {
        self.with_option(OptionKey::HandlesException, value)
    }

    /// Returns the override for `key`, if one was set.
    #[must_use]
    pub fn option(&self, key: OptionKey) -> Option<bool> {
        self.overrides
            .iter()
            .find(|(existing, _)| *existing == key)
            .map(|(_, value)| *value)
    }

    /// Sets `key` unless an override for it already exists.
    pub(crate) fn or_option(self, key: OptionKey, value: bool) -> Self {
        if self.option(key).is_some() {
            self
        } else {
            self.with_option(key, value)
        }
    }

    pub(crate) fn priority(&self) -> Result<Priority, CallbackError> {
        self.priority.clone()
    }

    pub(crate) fn id(&self) -> Option<&CallbackId> {
        self.id.as_ref()
    }

    pub(crate) fn overrides(&self) -> &[(OptionKey, bool)] {
        &self.overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RETURN_DEFAULTS: &[(OptionKey, bool)] =
        &[(OptionKey::PassArgs, true), (OptionKey::PassResult, false)];

    #[test]
    fn heading_capitalizes_first_word() {
        assert_eq!(OptionKey::HandlesException.heading(), "Handles exception");
        assert_eq!(OptionKey::PassArgs.heading(), "Pass args");
    }

    #[test]
    fn merge_applies_overrides() {
        let defaults = Options::from_defaults(RETURN_DEFAULTS);
        let merged = defaults
            .merged(&[(OptionKey::PassResult, true)], "on_return")
            .unwrap();
        assert_eq!(merged.get(OptionKey::PassArgs), Some(true));
        assert_eq!(merged.get(OptionKey::PassResult), Some(true));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_rejects_unrecognized_keys() {
        let defaults = Options::from_defaults(RETURN_DEFAULTS);
        let err = defaults
            .merged(&[(OptionKey::HandlesException, true)], "on_return")
            .unwrap_err();
        assert_eq!(
            err,
            CallbackError::InvalidOption {
                event: "on_return".to_string(),
                option: "handles_exception".to_string(),
                recognized: vec!["pass_args", "pass_result"],
            }
        );
    }

    #[test]
    fn registration_keeps_last_override() {
        let registration = Registration::new().pass_args(true).pass_args(false);
        assert_eq!(registration.option(OptionKey::PassArgs), Some(false));
        assert_eq!(registration.overrides().len(), 1);
    }

    #[test]
    fn or_option_does_not_replace_explicit_choice() {
        let registration = Registration::new()
            .pass_args(true)
            .or_option(OptionKey::PassArgs, false)
            .or_option(OptionKey::PassResult, false);
        assert_eq!(registration.option(OptionKey::PassArgs), Some(true));
        assert_eq!(registration.option(OptionKey::PassResult), Some(false));
    }

    #[test]
    fn invalid_priority_is_deferred() {
        let registration = Registration::new().with_priority("boo");
        assert!(registration.priority().is_err());
    }
}
