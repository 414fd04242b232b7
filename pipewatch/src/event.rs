use std::sync::Arc;

use crate::{
    EventCategory, Extensions, IncomingContext, InvokeHandlerContext, LogicalMessage,
    OutgoingContext, StageContext,
};

/// A classified pipeline event.
///
/// Built once by the [`EventBus`](crate::EventBus) when an activity with a
/// recognized name arrives. The variant is the category; the payload is the
/// stage context the pipeline attached to the activity.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Incoming(Arc<IncomingContext>),
    Outgoing(Arc<OutgoingContext>),
    InvokedHandler(Arc<InvokeHandlerContext>),
}

impl PipelineEvent {
    pub fn category(&self) -> EventCategory {
        match self {
            PipelineEvent::Incoming(_) => EventCategory::Incoming,
            PipelineEvent::Outgoing(_) => EventCategory::Outgoing,
            PipelineEvent::InvokedHandler(_) => EventCategory::InvokedHandler,
        }
    }

    /// The message the stage is processing.
    pub fn message(&self) -> &LogicalMessage {
        match self {
            PipelineEvent::Incoming(ctx) => ctx.message(),
            PipelineEvent::Outgoing(ctx) => ctx.message(),
            PipelineEvent::InvokedHandler(ctx) => ctx.message(),
        }
    }

    pub fn extensions(&self) -> &Extensions {
        match self {
            PipelineEvent::Incoming(ctx) => ctx.extensions(),
            PipelineEvent::Outgoing(ctx) => ctx.extensions(),
            PipelineEvent::InvokedHandler(ctx) => ctx.extensions(),
        }
    }

    /// Returns the context if this event is of `C`'s category.
    #[inline]
    pub fn context<C: StageContext>(&self) -> Option<&Arc<C>> {
        C::from_event(self)
    }
}

impl From<IncomingContext> for PipelineEvent {
    fn from(ctx: IncomingContext) -> Self {
        PipelineEvent::Incoming(Arc::new(ctx))
    }
}

impl From<OutgoingContext> for PipelineEvent {
    fn from(ctx: OutgoingContext) -> Self {
        PipelineEvent::Outgoing(Arc::new(ctx))
    }
}

impl From<InvokeHandlerContext> for PipelineEvent {
    fn from(ctx: InvokeHandlerContext) -> Self {
        PipelineEvent::InvokedHandler(Arc::new(ctx))
    }
}
