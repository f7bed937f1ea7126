//! Callback priorities.

use core::fmt;

use crate::error::CallbackError;

/// Dispatch priority of a callback. Higher priorities run first.
///
/// Always an orderable float: NaN is rejected and negative zero is stored as
/// zero so that both tie with each other. Infinities are accepted and sort
/// before or after every finite priority.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Priority(f64);

impl Priority {
    /// The priority used when none is given.
    pub const DEFAULT: Self = Self(0.0);

    /// Creates a priority, rejecting NaN.
    pub fn new(value: f64) -> Result<Self, CallbackError> {
        if value.is_nan() {
            return Err(CallbackError::InvalidPriority {
                value: value.to_string(),
            });
        }
        Ok(Self(if value == 0.0 { 0.0 } else { value }))
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Debug keeps the fractional part of integral values ("0.0", "1.1").
        fmt::Debug::fmt(&self.0, f)
    }
}

/// Conversion into a [`Priority`], failing with
/// [`CallbackError::InvalidPriority`] when the value is not a number.
pub trait IntoPriority {
    /// Performs the conversion.
    fn into_priority(self) -> Result<Priority, CallbackError>;
}

impl IntoPriority for Priority {
    fn into_priority(self) -> Result<Priority, CallbackError> {
        Ok(self)
    }
}

impl IntoPriority for f64 {
    fn into_priority(self) -> Result<Priority, CallbackError> {
        Priority::new(self)
    }
}

impl IntoPriority for f32 {
    fn into_priority(self) -> Result<Priority, CallbackError> {
        Priority::new(f64::from(self))
    }
}

macro_rules! lossless_priority {
    ($($ty:ty),*) => {
        $(
            impl IntoPriority for $ty {
                fn into_priority(self) -> Result<Priority, CallbackError> {
                    Priority::new(f64::from(self))
                }
            }
        )*
    };
}

lossless_priority!(i8, i16, i32, u8, u16, u32);

macro_rules! wide_priority {
    ($($ty:ty),*) => {
        $(
            impl IntoPriority for $ty {
                fn into_priority(self) -> Result<Priority, CallbackError> {
                    Priority::new(self as f64)
                }
            }
        )*
    };
}

wide_priority!(i64, u64, isize, usize);

impl IntoPriority for &str {
    fn into_priority(self) -> Result<Priority, CallbackError> {
        self.trim()
            .parse::<f64>()
            .map_err(|_| CallbackError::InvalidPriority {
                value: self.to_owned(),
            })
            .and_then(Priority::new)
    }
}

impl IntoPriority for String {
    fn into_priority(self) -> Result<Priority, CallbackError> {
        self.as_str().into_priority()
    }
}
