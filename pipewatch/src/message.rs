use std::{any::Any, fmt, sync::Arc};

use crate::TypeKey;

/// Marker trait for message payloads flowing through an observed pipeline.
///
/// Messages must be `Send + Sync + 'static` because contexts carrying them
/// are shared across the pipeline's worker tasks and the waiting test.
/// The trait is implemented for every type meeting those bounds plus
/// [`Debug`](fmt::Debug), so fixtures only need `#[derive(Debug)]`.
///
/// # Example
///
/// ```rust
/// use pipewatch::LogicalMessage;
///
/// #[derive(Debug)]
/// struct PlaceOrder {
///     order_id: u32,
/// }
///
/// let message = LogicalMessage::new(PlaceOrder { order_id: 7 });
/// assert!(message.is::<PlaceOrder>());
/// assert_eq!(message.instance_as::<PlaceOrder>().map(|m| m.order_id), Some(7));
/// ```
pub trait Message: Any + Send + Sync + fmt::Debug {}

impl<T: Any + Send + Sync + fmt::Debug> Message for T {}

/// A message instance together with its declared type.
///
/// Cloning is cheap: the instance is shared.
#[derive(Clone)]
pub struct LogicalMessage {
    message_type: TypeKey,
    instance: Arc<dyn Any + Send + Sync>,
    debug: Arc<dyn fmt::Debug + Send + Sync>,
}

impl LogicalMessage {
    pub fn new<M: Message>(message: M) -> Self {
        let instance = Arc::new(message);
        Self {
            message_type: TypeKey::of::<M>(),
            instance: instance.clone(),
            debug: instance,
        }
    }

    #[inline]
    pub fn message_type(&self) -> TypeKey {
        self.message_type
    }

    /// Returns the type-erased message instance.
    #[inline]
    pub fn instance(&self) -> &(dyn Any + Send + Sync) {
        self.instance.as_ref()
    }

    /// Returns the instance as `M` if the message is of that type.
    pub fn instance_as<M: Message>(&self) -> Option<&M> {
        self.instance.downcast_ref::<M>()
    }

    #[inline]
    pub fn is<M: Message>(&self) -> bool {
        self.message_type.is::<M>()
    }
}

impl fmt::Debug for LogicalMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicalMessage")
            .field("message_type", &self.message_type)
            .field("instance", &self.debug)
            .finish()
    }
}
