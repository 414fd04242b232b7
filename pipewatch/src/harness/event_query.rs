use std::{collections::HashMap, fmt, rc::Rc, sync::Arc};

use crate::{EventCategory, Message, ObservedEvent, StageContext};

type Filter = Rc<dyn Fn(&ObservedEvent) -> bool>;

/// A composable query builder over the events of one session.
///
/// Filters narrow the selection and are combined with AND; terminal
/// operations inspect what is left. Results are always in delivery order.
///
/// # Example
///
/// ```ignore
/// let published = observed
///     .events()
///     .with_category(EventCategory::Outgoing)
///     .of_message_type::<OrderPlaced>()
///     .count();
/// ```
#[derive(Clone)]
pub struct EventQuery {
    events: Arc<[ObservedEvent]>,
    filters: Vec<Filter>,
}

impl fmt::Debug for EventQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQuery")
            .field("records", &self.events.len())
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl EventQuery {
    pub(crate) fn new(events: Arc<[ObservedEvent]>) -> Self {
        Self {
            events,
            filters: Vec::new(),
        }
    }

    fn add_filter<F>(&mut self, filter: F)
    where
        F: Fn(&ObservedEvent) -> bool + 'static,
    {
        self.filters.push(Rc::new(filter));
    }

    fn apply_filters(&self) -> impl Iterator<Item = &ObservedEvent> {
        self.events
            .iter()
            .filter(|e| self.filters.iter().all(|f| f(e)))
    }

    // ==================== Terminal Operations ====================

    /// Returns the number of events matching all filters.
    pub fn count(&self) -> usize {
        self.apply_filters().count()
    }

    /// Returns true if no events match the filters.
    pub fn is_empty(&self) -> bool {
        self.apply_filters().next().is_none()
    }

    /// Returns true if any events match the filters.
    pub fn exists(&self) -> bool {
        !self.is_empty()
    }

    /// Returns the first matching event, if any.
    pub fn first(&self) -> Option<ObservedEvent> {
        self.apply_filters().next().cloned()
    }

    /// Returns the last matching event, if any.
    pub fn last(&self) -> Option<ObservedEvent> {
        self.apply_filters().last().cloned()
    }

    /// Returns the nth matching event (0-indexed), if any.
    pub fn nth(&self, index: usize) -> Option<ObservedEvent> {
        self.apply_filters().nth(index).cloned()
    }

    pub fn collect(&self) -> Vec<ObservedEvent> {
        self.apply_filters().cloned().collect()
    }

    /// Returns a count of matching events grouped by message type name.
    pub fn count_by_message_type(&self) -> HashMap<&'static str, usize> {
        let mut counts = HashMap::new();
        for event in self.apply_filters() {
            *counts
                .entry(event.message().message_type().short_name())
                .or_insert(0) += 1;
        }
        counts
    }

    /// Returns true if all matching events satisfy the predicate.
    pub fn all(&self, predicate: impl Fn(&ObservedEvent) -> bool) -> bool {
        self.apply_filters().all(predicate)
    }

    /// Returns true if any matching event satisfies the predicate.
    pub fn any(&self, predicate: impl Fn(&ObservedEvent) -> bool) -> bool {
        self.apply_filters().any(predicate)
    }

    // ==================== Filter Operations ====================

    pub fn with_category(mut self, category: EventCategory) -> Self {
        self.add_filter(move |e| e.category() == category);
        self
    }

    /// Filter to events classified from the named activity.
    pub fn with_activity_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.add_filter(move |e| e.activity_name() == name);
        self
    }

    /// Filter to events whose message payload is a `T`.
    pub fn of_message_type<T: Message>(mut self) -> Self {
        self.add_filter(|e| e.message().is::<T>());
        self
    }

    /// Filter using a custom predicate on the observed event.
    pub fn matching<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ObservedEvent) -> bool + 'static,
    {
        self.add_filter(predicate);
        self
    }

    /// Filter to events of `C`'s category whose context satisfies `predicate`.
    pub fn matching_context<C, F>(mut self, predicate: F) -> Self
    where
        C: StageContext,
        F: Fn(&C) -> bool + 'static,
    {
        self.add_filter(move |e| e.context::<C>().is_some_and(|ctx| predicate(ctx)));
        self
    }

    /// Filter to events delivered after the given event.
    pub fn after(mut self, event: &ObservedEvent) -> Self {
        let sequence = event.sequence();
        self.add_filter(move |e| e.sequence() > sequence);
        self
    }

    /// Filter to events delivered before the given event.
    pub fn before(mut self, event: &ObservedEvent) -> Self {
        let sequence = event.sequence();
        self.add_filter(move |e| e.sequence() < sequence);
        self
    }
}
