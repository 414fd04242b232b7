use std::sync::Arc;

use crate::{Activity, ActivityId, EventCategory, LogicalMessage, PipelineEvent, StageContext};

/// A record of one classified event delivered to an attached sink.
///
/// # Fields
///
/// - `sequence`: delivery position within the attachment, starting at 0
/// - `activity_id`, `activity_name`, `timestamp`: taken from the activity
/// - `event`: the classified pipeline event
#[derive(Debug, Clone)]
pub struct ObservedEvent {
    pub(crate) sequence: u64,
    pub(crate) activity_id: ActivityId,
    pub(crate) activity_name: Arc<str>,
    pub(crate) timestamp: u64,
    pub(crate) event: PipelineEvent,
}

impl ObservedEvent {
    pub(crate) fn new(sequence: u64, activity: &Activity, event: PipelineEvent) -> Self {
        Self {
            sequence,
            activity_id: activity.id(),
            activity_name: Arc::from(activity.name()),
            timestamp: activity.timestamp(),
            event,
        }
    }

    /// Position of this event in delivery order.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[inline]
    pub fn activity_id(&self) -> ActivityId {
        self.activity_id
    }

    /// Name of the activity the event was classified from.
    #[inline]
    pub fn activity_name(&self) -> &str {
        &self.activity_name
    }

    /// Activity creation time in nanoseconds since the Unix epoch.
    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    #[inline]
    pub fn event(&self) -> &PipelineEvent {
        &self.event
    }

    #[inline]
    pub fn category(&self) -> EventCategory {
        self.event.category()
    }

    #[inline]
    pub fn message(&self) -> &LogicalMessage {
        self.event.message()
    }

    /// Returns the stage context if this event is of `C`'s category.
    #[inline]
    pub fn context<C: StageContext>(&self) -> Option<&Arc<C>> {
        C::from_event(&self.event)
    }
}
