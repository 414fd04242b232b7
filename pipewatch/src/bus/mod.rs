//! Adapter from the diagnostic broadcast to one typed event consumer.
//!
//! The [`EventBus`] listens on a [`DiagnosticSource`](crate::DiagnosticSource),
//! classifies every activity through the static name table and forwards the
//! resulting [`ObservedEvent`](crate::ObservedEvent)s to the single attached
//! [`EventSink`]. Attaching hands back a [`Subscription`] guard; the sink is
//! detached when the guard is dropped.

mod event_bus;
mod sink;
mod subscription;

pub use event_bus::EventBus;
pub(crate) use event_bus::BusCore;
pub use sink::EventSink;
pub use subscription::Subscription;
