use crate::ObservedEvent;

/// Receiver of classified events from an [`EventBus`](crate::EventBus).
///
/// Called on the pipeline task that emitted the activity, while the bus
/// holds its delivery lock: deliveries are strictly ordered and never
/// concurrent, but the sink must not block and must not attach or detach
/// sinks on the same bus.
///
/// Closures `Fn(&ObservedEvent) + Send + Sync` implement this trait.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &ObservedEvent);
}

impl<F> EventSink for F
where
    F: Fn(&ObservedEvent) + Send + Sync,
{
    fn on_event(&self, event: &ObservedEvent) {
        self(event)
    }
}
