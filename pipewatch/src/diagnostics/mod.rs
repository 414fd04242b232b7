//! Process-wide diagnostic broadcast the pipeline reports activities into.
//!
//! # Overview
//!
//! An instrumented pipeline emits one [`Activity`](crate::Activity) per
//! completed stage into a [`DiagnosticSource`]. Every registered
//! [`ActivityListener`] receives each activity synchronously, on the
//! emitting task, in emission order. The source knows nothing about
//! categories or sessions; the [`EventBus`](crate::EventBus) listens here
//! and does the classification.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use pipewatch::{Activity, DiagnosticSource};
//!
//! let source = DiagnosticSource::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = seen.clone();
//! let handle = source.subscribe(move |activity: &Activity| {
//!     sink.lock().unwrap().push(activity.name().to_string());
//! });
//!
//! source.emit(&Activity::new("pipeline.subscribe"));
//! handle.remove();
//! source.emit(&Activity::new("pipeline.unsubscribe"));
//!
//! assert_eq!(*seen.lock().unwrap(), vec!["pipeline.subscribe".to_string()]);
//! ```

mod listener;
mod listener_handle;
mod source;

/// Unique identifier for a registered listener.
pub type ListenerId = u64;

pub use listener::ActivityListener;
pub use listener_handle::ListenerHandle;
pub use source::DiagnosticSource;
pub(crate) use source::SourceInner;
