//! Correlation sessions: run an action, wait for a matching pipeline event,
//! inspect what happened in between.
//!
//! # Example
//!
//! ```ignore
//! use pipewatch::{EventBus, Harness, IncomingContext, Matcher};
//!
//! let harness = Harness::new(EventBus::new(&source));
//!
//! // Wait for a typed message
//! let observed = harness
//!     .execute_and_wait_for_received::<OrderShipped>(|| endpoint.send(PlaceOrder { id: 7 }))
//!     .await?;
//!
//! // Or with a custom predicate and deadline
//! let observed = harness
//!     .execute_and_wait(
//!         || endpoint.send(PlaceOrder { id: 7 }),
//!         Matcher::<IncomingContext>::by_message(|m: &OrderShipped| m.id == 7),
//!     )
//!     .within(Duration::from_secs(2))
//!     .await?;
//!
//! // Query the recorded events
//! assert_eq!(observed.incoming_message_contexts().len(), 3);
//! assert!(observed.events().of_message_type::<OrderShipped>().exists());
//! ```
//!
//! # Note
//!
//! [`EventQuery`] uses `Rc` internally and is `!Send`. It is meant for
//! inspecting results inside the test that produced them.

pub(crate) mod action;
mod event_query;
mod execution;
#[allow(clippy::module_inception)]
mod harness;
mod matcher;
mod message_session;
pub(crate) mod observed;
mod session;

pub use action::TestAction;
pub use event_query::EventQuery;
pub use execution::ExecuteAndWait;
pub use harness::Harness;
pub use matcher::Matcher;
pub use message_session::MessageSession;
pub use observed::ObservedMessageContexts;
pub(crate) use session::SessionSink;
