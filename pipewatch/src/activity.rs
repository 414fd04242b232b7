use std::{
    any::Any,
    borrow::Cow,
    collections::HashMap,
    fmt,
    sync::Arc,
    time::SystemTime,
};

use crate::{ActivityId, EventCategory, IncomingContext, InvokeHandlerContext, OutgoingContext};

/// Activity names the pipeline reports into a [`DiagnosticSource`](crate::DiagnosticSource).
pub mod names {
    pub const RECEIVE_MESSAGE: &str = "pipeline.receive_message";
    pub const SEND_MESSAGE: &str = "pipeline.send_message";
    pub const PUBLISH_MESSAGE: &str = "pipeline.publish_message";
    pub const INVOKE_HANDLER: &str = "pipeline.invoke_handler";
    pub const SUBSCRIBE: &str = "pipeline.subscribe";
    pub const UNSUBSCRIBE: &str = "pipeline.unsubscribe";
}

/// Tag keys under which stage contexts are attached to activities.
pub mod tags {
    pub const INCOMING_MESSAGE_CONTEXT: &str = "testing.incoming.message.context";
    pub const OUTGOING_MESSAGE_CONTEXT: &str = "testing.outgoing.message.context";
    pub const INVOKE_HANDLER_CONTEXT: &str = "testing.invoke.handler.context";
}

/// Name → (category, context tag) table used to classify activities.
///
/// Names not listed here (including subscribe/unsubscribe) are not observed.
pub(crate) const CLASSIFICATION: [(&str, EventCategory, &str); 4] = [
    (
        names::RECEIVE_MESSAGE,
        EventCategory::Incoming,
        tags::INCOMING_MESSAGE_CONTEXT,
    ),
    (
        names::SEND_MESSAGE,
        EventCategory::Outgoing,
        tags::OUTGOING_MESSAGE_CONTEXT,
    ),
    (
        names::PUBLISH_MESSAGE,
        EventCategory::Outgoing,
        tags::OUTGOING_MESSAGE_CONTEXT,
    ),
    (
        names::INVOKE_HANDLER,
        EventCategory::InvokedHandler,
        tags::INVOKE_HANDLER_CONTEXT,
    ),
];

/// Looks up the category and context tag for an activity name.
pub(crate) fn classify(name: &str) -> Option<(EventCategory, &'static str)> {
    CLASSIFICATION
        .iter()
        .find(|(known, _, _)| *known == name)
        .map(|(_, category, tag)| (*category, *tag))
}

type TagValue = Arc<dyn Any + Send + Sync>;

/// A named unit of pipeline work, reported when the stage completes.
///
/// Activities carry arbitrary tags. Instrumented pipelines attach the stage
/// context under the well-known key for the activity name; the
/// constructors below do this for the four observed stages.
///
/// # Example
///
/// ```rust
/// use pipewatch::{Activity, DiagnosticSource, IncomingContext, LogicalMessage};
///
/// #[derive(Debug)]
/// struct OrderPlaced;
///
/// let source = DiagnosticSource::new();
/// let ctx = IncomingContext::new(LogicalMessage::new(OrderPlaced));
/// source.emit(&Activity::receive_message(ctx));
/// ```
#[derive(Clone)]
pub struct Activity {
    id: ActivityId,
    name: Cow<'static, str>,
    timestamp: u64,
    tags: HashMap<Cow<'static, str>, TagValue>,
}

impl Activity {
    /// Create an untagged activity with the given name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: ActivityId::new(),
            name: name.into(),
            timestamp: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default(),
            tags: HashMap::new(),
        }
    }

    /// Attach a tag value, replacing any previous value under `key`.
    pub fn with_tag<V: Any + Send + Sync>(mut self, key: impl Into<Cow<'static, str>>, value: V) -> Self {
        self.tags.insert(key.into(), Arc::new(value));
        self
    }

    fn with_shared_tag(mut self, key: &'static str, value: TagValue) -> Self {
        self.tags.insert(Cow::Borrowed(key), value);
        self
    }

    /// `pipeline.receive_message` carrying the incoming context.
    pub fn receive_message(ctx: impl Into<Arc<IncomingContext>>) -> Self {
        let ctx: Arc<IncomingContext> = ctx.into();
        Self::new(names::RECEIVE_MESSAGE).with_shared_tag(tags::INCOMING_MESSAGE_CONTEXT, ctx)
    }

    /// `pipeline.send_message` carrying the outgoing context.
    pub fn send_message(ctx: impl Into<Arc<OutgoingContext>>) -> Self {
        let ctx: Arc<OutgoingContext> = ctx.into();
        Self::new(names::SEND_MESSAGE).with_shared_tag(tags::OUTGOING_MESSAGE_CONTEXT, ctx)
    }

    /// `pipeline.publish_message` carrying the outgoing context.
    pub fn publish_message(ctx: impl Into<Arc<OutgoingContext>>) -> Self {
        let ctx: Arc<OutgoingContext> = ctx.into();
        Self::new(names::PUBLISH_MESSAGE).with_shared_tag(tags::OUTGOING_MESSAGE_CONTEXT, ctx)
    }

    /// `pipeline.invoke_handler` carrying the handler invocation context.
    pub fn invoke_handler(ctx: impl Into<Arc<InvokeHandlerContext>>) -> Self {
        let ctx: Arc<InvokeHandlerContext> = ctx.into();
        Self::new(names::INVOKE_HANDLER).with_shared_tag(tags::INVOKE_HANDLER_CONTEXT, ctx)
    }

    #[inline]
    pub fn id(&self) -> ActivityId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creation time in nanoseconds since the Unix epoch.
    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Returns the tag under `key` if it holds a `V`.
    pub fn tag<V: Any + Send + Sync>(&self, key: &str) -> Option<&V> {
        self.tags.get(key).and_then(|value| value.downcast_ref::<V>())
    }

    /// Returns a shared handle to the tag under `key` if it holds a `V`.
    pub(crate) fn shared_tag<V: Any + Send + Sync>(&self, key: &str) -> Option<Arc<V>> {
        self.tags
            .get(key)
            .and_then(|value| value.clone().downcast::<V>().ok())
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }
}

impl fmt::Debug for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.tags.keys().map(|k| k.as_ref()).collect();
        keys.sort_unstable();
        f.debug_struct("Activity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("timestamp", &self.timestamp)
            .field("tags", &keys)
            .finish()
    }
}
