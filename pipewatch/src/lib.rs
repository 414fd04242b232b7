#![cfg_attr(docsrs, feature(doc_cfg))]
//! # Pipewatch
//!
//! Wait-for-completion testing for asynchronous message pipelines.
//!
//! An instrumented pipeline reports what it does (messages received, sent,
//! published, handlers invoked) as named activities into a
//! [`DiagnosticSource`]. Pipewatch listens there, classifies those
//! activities into typed [`PipelineEvent`]s and lets a test run an action,
//! then suspend until a specific downstream event has happened, without
//! sleeps or polling. The test gets back everything the pipeline did in
//! between.
//!
//! ## Quick Start
//!
//! ```rust
//! use pipewatch::{Activity, DiagnosticSource, EventBus, Harness, IncomingContext, LogicalMessage};
//!
//! #[derive(Debug)]
//! struct OrderShipped {
//!     id: u32,
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> pipewatch::Result {
//!     let source = DiagnosticSource::new();
//!     let harness = Harness::new(EventBus::new(&source));
//!
//!     let observed = harness
//!         .execute_and_wait_for_received::<OrderShipped>(|| async {
//!             // Stands in for the pipeline receiving a message.
//!             source.emit(&Activity::receive_message(IncomingContext::new(
//!                 LogicalMessage::new(OrderShipped { id: 7 }),
//!             )));
//!             Ok::<_, pipewatch::Error>(())
//!         })
//!         .await?;
//!
//!     assert_eq!(observed.received::<OrderShipped>().next().map(|m| m.id), Some(7));
//!     Ok(())
//! }
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DiagnosticSource`] | Broadcast the pipeline emits [`Activity`] records into |
//! | [`EventBus`] | Classifies activities and forwards them to one attached [`EventSink`] |
//! | [`Harness`] | Runs correlation sessions on a bus |
//! | [`Matcher`] | Completion predicate over one stage context type |
//! | [`ObservedMessageContexts`] | Everything a session recorded |
//! | [`EventQuery`] | Filters and inspects recorded events |
//! | [`Config`] | Timeouts and session serialization |
//!
//! ## Instrumenting a Pipeline
//!
//! Each stage builds its context and emits it once the stage completes:
//!
//! ```rust,ignore
//! let ctx = IncomingContext::new(LogicalMessage::new(message)).with_message_id(id);
//! source.emit(&Activity::receive_message(ctx));
//!
//! // ... run handlers ...
//! source.emit(&Activity::invoke_handler(
//!     InvokeHandlerContext::new::<OrderSaga>(LogicalMessage::new(message))
//!         .with_saga_instance(ActiveSagaInstance::new::<OrderSaga, _>(saga_id, data).mark_completed()),
//! ));
//! ```
//!
//! Activity names and tag keys live in [`activity::names`] and
//! [`activity::tags`].
//!
//! ## Features
//!
//! - **`serde`** - `Serialize`/`Deserialize` for [`Config`], [`ActivityId`],
//!   [`EventCategory`] and [`MessageIntent`]

pub mod activity;
mod activity_id;
mod bus;
mod category;
mod config;
mod context;
pub mod diagnostics;
mod error;
mod event;
mod extensions;
pub mod harness;
mod message;
mod observed_event;
mod saga;
mod type_key;

pub use activity::Activity;
pub use activity_id::ActivityId;
pub use bus::{EventBus, EventSink, Subscription};
pub use category::EventCategory;
pub use config::{Config, INTERACTIVE_ENV, TIMEOUT_MS_ENV};
pub use context::{
    IncomingContext, InvokeHandlerContext, MessageIntent, OutgoingContext, StageContext,
};
pub use diagnostics::{ActivityListener, DiagnosticSource, ListenerHandle};
pub use error::Error;
pub use event::PipelineEvent;
pub use extensions::Extensions;
pub use harness::{
    EventQuery, ExecuteAndWait, Harness, Matcher, MessageSession, ObservedMessageContexts,
    TestAction,
};
pub use message::{LogicalMessage, Message};
pub use observed_event::ObservedEvent;
pub use saga::ActiveSagaInstance;
pub use type_key::TypeKey;

/// Convenience alias for `Result<T, pipewatch::Error>`.
pub type Result<T = ()> = std::result::Result<T, Error>;
