//! Event and registry engine for callhooks.
//!
//! A target function or method acquires a fixed set of named events.
//! Listeners registered on an event run in priority order whenever the event
//! is emitted, and an instance-level registry inherits every listener of the
//! class-level registry it was made from.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use callhooks_core::{AutoCallbacks, Callback, Registration};
//!
//! let parse = AutoCallbacks::new("parse", |text: &String| text.parse::<i32>().map_err(|e| e.to_string()));
//!
//! let calls = Arc::new(Mutex::new(0));
//! let counter = Arc::clone(&calls);
//! parse
//!     .on_call()
//!     .add_callback(move |_| {
//!         *counter.lock().unwrap() += 1;
//!         Ok(())
//!     }, Registration::new())
//!     .unwrap();
//! parse
//!     .on_exception()
//!     .register(Callback::handler(|_, _| Ok(0)), Registration::new().with_id("fallback"))
//!     .unwrap();
//!
//! assert_eq!(parse.call(&"12".to_string()), Ok(12));
//! assert_eq!(parse.call(&"twelve".to_string()), Ok(0));
//! assert_eq!(*calls.lock().unwrap(), 2);
//! ```
//!
//! # Architecture
//!
//! - [`Event`]: prioritized callbacks with a dispatch rule given by its [`EventKind`]
//! - [`OnCall`], [`OnReturn`], [`OnException`]: the built-in kinds
//! - [`Registry`]: a target and its ordered [`Events`], built from [`EventSpec`]s
//! - [`AutoCallbacks`]: the default `on_call`/`on_return`/`on_exception` set
//! - [`MethodCallbacks`] / [`BoundMethod`]: class-level and per-owner callbacks
//! - [`MethodRegistry`] / [`BoundRegistry`]: the same for methods with their own events
//! - [`CallbackTable`]: introspection listing

pub mod auto;
pub mod callback;
pub mod error;
pub mod event;
pub mod id;
pub mod listing;
pub mod method;
pub mod options;
pub mod priority;
pub mod registry;

pub use auto::{AutoCallbacks, ON_CALL, ON_EXCEPTION, ON_RETURN};
pub use callback::Callback;
pub use error::CallbackError;
pub use event::{
    CallListener, Entry, Event, EventKind, ExceptionListener, OnCall, OnException, OnReturn,
    ReturnListener,
};
pub use id::{AsCallbackId, CallbackId};
pub use listing::{CallbackRow, CallbackTable};
pub use method::{BoundMethod, BoundRegistry, MethodCallbacks, MethodRegistry};
pub use options::{OptionKey, Options, Registration};
pub use priority::{IntoPriority, Priority};
pub use registry::{
    EventSpec, Events, FnTarget, MethodTarget, Registry, RegistryBuilder, ScopedTarget,
};
