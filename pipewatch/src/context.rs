//! Stage contexts carried by pipeline events.
//!
//! The pipeline builds one context per stage (receive, send/publish, handler
//! invocation), fills its [`Extensions`] and attaches it to the emitted
//! [`Activity`](crate::Activity). After emission a context is only ever
//! shared behind an `Arc`.

use std::{collections::BTreeMap, sync::Arc};

use uuid::Uuid;

use crate::{ActiveSagaInstance, EventCategory, Extensions, LogicalMessage, PipelineEvent, TypeKey};

mod sealed {
    pub trait Sealed {}
}

/// Common view over the three stage context types.
///
/// The context type selects the category a wait call observes, so the
/// category check is a variant match resolved once per event rather than a
/// runtime type test.
pub trait StageContext: sealed::Sealed + Send + Sync + 'static {
    /// The category whose events carry this context.
    const CATEGORY: EventCategory;

    /// Returns the context if `event` belongs to this context's category.
    fn from_event(event: &PipelineEvent) -> Option<&Arc<Self>>;

    fn message(&self) -> &LogicalMessage;

    fn message_id(&self) -> &str;

    fn headers(&self) -> &BTreeMap<String, String>;

    fn extensions(&self) -> &Extensions;
}

/// Whether an outgoing message is a command sent to one destination or an
/// event published to all subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageIntent {
    Send,
    Publish,
}

fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

/// Context of a received message about to be processed.
#[derive(Debug, Clone)]
pub struct IncomingContext {
    message_id: String,
    message: LogicalMessage,
    headers: BTreeMap<String, String>,
    extensions: Extensions,
}

impl IncomingContext {
    pub fn new(message: LogicalMessage) -> Self {
        Self {
            message_id: new_message_id(),
            message,
            headers: BTreeMap::new(),
            extensions: Extensions::new(),
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = message_id.into();
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

/// Context of a message being sent, published or replied.
#[derive(Debug, Clone)]
pub struct OutgoingContext {
    message_id: String,
    message: LogicalMessage,
    intent: MessageIntent,
    destination: Option<String>,
    headers: BTreeMap<String, String>,
    extensions: Extensions,
}

impl OutgoingContext {
    pub fn new(message: LogicalMessage, intent: MessageIntent) -> Self {
        Self {
            message_id: new_message_id(),
            message,
            intent,
            destination: None,
            headers: BTreeMap::new(),
            extensions: Extensions::new(),
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = message_id.into();
        self
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub fn intent(&self) -> MessageIntent {
        self.intent
    }

    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }
}

/// Context of one handler invocation.
///
/// When the handler is a saga, the pipeline stores the
/// [`ActiveSagaInstance`] in the extensions; [`saga_instance`](Self::saga_instance)
/// reads it back.
#[derive(Debug, Clone)]
pub struct InvokeHandlerContext {
    handler_type: TypeKey,
    message_id: String,
    message: LogicalMessage,
    headers: BTreeMap<String, String>,
    extensions: Extensions,
}

impl InvokeHandlerContext {
    pub fn new<H: 'static>(message: LogicalMessage) -> Self {
        Self::for_handler(TypeKey::of::<H>(), message)
    }

    pub fn for_handler(handler_type: TypeKey, message: LogicalMessage) -> Self {
        Self {
            handler_type,
            message_id: new_message_id(),
            message,
            headers: BTreeMap::new(),
            extensions: Extensions::new(),
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = message_id.into();
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Attaches the saga instance the handler ran against.
    pub fn with_saga_instance(mut self, saga: ActiveSagaInstance) -> Self {
        self.extensions.insert(saga);
        self
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub fn handler_type(&self) -> TypeKey {
        self.handler_type
    }

    pub fn saga_instance(&self) -> Option<&ActiveSagaInstance> {
        self.extensions.get::<ActiveSagaInstance>()
    }
}

macro_rules! impl_stage_context {
    ($ty:ty, $category:expr, $variant:ident) => {
        impl sealed::Sealed for $ty {}

        impl StageContext for $ty {
            const CATEGORY: EventCategory = $category;

            #[inline]
            fn from_event(event: &PipelineEvent) -> Option<&Arc<Self>> {
                match event {
                    PipelineEvent::$variant(ctx) => Some(ctx),
                    _ => None,
                }
            }

            #[inline]
            fn message(&self) -> &LogicalMessage {
                &self.message
            }

            #[inline]
            fn message_id(&self) -> &str {
                &self.message_id
            }

            #[inline]
            fn headers(&self) -> &BTreeMap<String, String> {
                &self.headers
            }

            #[inline]
            fn extensions(&self) -> &Extensions {
                &self.extensions
            }
        }
    };
}

impl_stage_context!(IncomingContext, EventCategory::Incoming, Incoming);
impl_stage_context!(OutgoingContext, EventCategory::Outgoing, Outgoing);
impl_stage_context!(
    InvokeHandlerContext,
    EventCategory::InvokedHandler,
    InvokedHandler
);
