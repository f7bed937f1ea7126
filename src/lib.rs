//! Prioritized before/after/on-error listeners for functions and methods.
//!

pub use callhooks_core;
pub use callhooks_core::*;
pub use callhooks_macros::supports_callbacks;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use callhooks_core::{
        AutoCallbacks, BoundMethod, BoundRegistry, Callback, CallbackError, CallbackId, Event,
        EventSpec, Events, MethodCallbacks, MethodRegistry, OnCall, OnException, OnReturn,
        OptionKey, Registration, Registry, ScopedTarget,
    };
    pub use callhooks_macros::supports_callbacks;
}
