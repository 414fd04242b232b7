use std::{fmt, sync::Arc};

use crate::{
    EventCategory, IncomingContext, InvokeHandlerContext, LogicalMessage, Message, ObservedEvent,
    OutgoingContext, PipelineEvent, StageContext, harness::EventQuery,
};

/// Append-only record of one session, partitioned by category.
#[derive(Debug, Default)]
pub(crate) struct EventLog {
    events: Vec<ObservedEvent>,
    incoming: Vec<Arc<IncomingContext>>,
    outgoing: Vec<Arc<OutgoingContext>>,
    invoked_handlers: Vec<Arc<InvokeHandlerContext>>,
}

impl EventLog {
    pub(crate) fn append(&mut self, event: &ObservedEvent) {
        match event.event() {
            PipelineEvent::Incoming(ctx) => self.incoming.push(ctx.clone()),
            PipelineEvent::Outgoing(ctx) => self.outgoing.push(ctx.clone()),
            PipelineEvent::InvokedHandler(ctx) => self.invoked_handlers.push(ctx.clone()),
        }
        self.events.push(event.clone());
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn into_observed(self) -> ObservedMessageContexts {
        ObservedMessageContexts {
            events: self.events.into(),
            incoming: self.incoming.into(),
            outgoing: self.outgoing.into(),
            invoked_handlers: self.invoked_handlers.into(),
        }
    }
}

/// Everything a correlation session recorded, in delivery order.
///
/// Returned by every wait call on success, and carried by
/// [`Error::Timeout`](crate::Error::Timeout) with whatever was recorded
/// before the deadline. Cloning is cheap; the contents are shared and
/// immutable.
///
/// # Example
///
/// ```ignore
/// let observed = harness
///     .execute_and_wait_for_received::<OrderShipped>(|| session.send(PlaceOrder { id: 7 }))
///     .await?;
///
/// assert_eq!(observed.incoming_message_contexts().len(), 3);
/// let shipped: Vec<&OrderShipped> = observed.received::<OrderShipped>().collect();
/// assert_eq!(shipped[0].id, 7);
///
/// let publishes = observed
///     .events()
///     .with_activity_name(pipewatch::activity::names::PUBLISH_MESSAGE)
///     .count();
/// ```
#[derive(Clone, Default)]
pub struct ObservedMessageContexts {
    events: Arc<[ObservedEvent]>,
    incoming: Arc<[Arc<IncomingContext>]>,
    outgoing: Arc<[Arc<OutgoingContext>]>,
    invoked_handlers: Arc<[Arc<InvokeHandlerContext>]>,
}

impl ObservedMessageContexts {
    /// Received messages, in the order they were received.
    pub fn incoming_message_contexts(&self) -> &[Arc<IncomingContext>] {
        &self.incoming
    }

    /// Sent and published messages, in the order they left the pipeline.
    pub fn outgoing_message_contexts(&self) -> &[Arc<OutgoingContext>] {
        &self.outgoing
    }

    /// Handler invocations, in the order they completed.
    pub fn invoked_handlers(&self) -> &[Arc<InvokeHandlerContext>] {
        &self.invoked_handlers
    }

    pub fn received_messages(&self) -> impl Iterator<Item = &LogicalMessage> {
        self.incoming.iter().map(|ctx| ctx.message())
    }

    pub fn sent_messages(&self) -> impl Iterator<Item = &LogicalMessage> {
        self.outgoing.iter().map(|ctx| ctx.message())
    }

    /// Received payloads of type `T`.
    pub fn received<T: Message>(&self) -> impl Iterator<Item = &T> {
        self.received_messages().filter_map(LogicalMessage::instance_as::<T>)
    }

    /// Sent or published payloads of type `T`.
    pub fn sent<T: Message>(&self) -> impl Iterator<Item = &T> {
        self.sent_messages().filter_map(LogicalMessage::instance_as::<T>)
    }

    /// Invocations of handler type `H`.
    pub fn handled_by<H: 'static>(&self) -> impl Iterator<Item = &Arc<InvokeHandlerContext>> {
        self.invoked_handlers
            .iter()
            .filter(|ctx| ctx.handler_type().is::<H>())
    }

    /// Query over every recorded event regardless of category.
    pub fn events(&self) -> EventQuery {
        EventQuery::new(self.events.clone())
    }

    /// Number of recorded events of `category`.
    pub fn count(&self, category: EventCategory) -> usize {
        match category {
            EventCategory::Incoming => self.incoming.len(),
            EventCategory::Outgoing => self.outgoing.len(),
            EventCategory::InvokedHandler => self.invoked_handlers.len(),
        }
    }

    /// Total number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Print a chronological listing of recorded events to stdout.
    pub fn dump(&self) {
        println!("{} observed events:", self.len());
        for event in self.events.iter() {
            println!(
                "  #{:<3} {:<16} {:<28} {}",
                event.sequence(),
                event.category(),
                event.activity_name(),
                event.message().message_type().short_name(),
            );
        }
    }
}

impl fmt::Debug for ObservedMessageContexts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedMessageContexts")
            .field("incoming", &self.incoming.len())
            .field("outgoing", &self.outgoing.len())
            .field("invoked_handlers", &self.invoked_handlers.len())
            .finish()
    }
}
