use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, Mutex, OnceLock, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    Activity, DiagnosticSource, Error, EventCategory, IncomingContext, InvokeHandlerContext,
    ListenerHandle, ObservedEvent, OutgoingContext, PipelineEvent, Result,
    activity::classify,
    bus::{EventSink, Subscription},
};

static GLOBAL: OnceLock<Arc<EventBus>> = OnceLock::new();

struct Attached {
    generation: u64,
    sink: Arc<dyn EventSink>,
    next_sequence: u64,
}

pub(crate) struct BusCore {
    slot: Mutex<Option<Attached>>,
    generation: AtomicU64,
}

impl BusCore {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Attached>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn attach(&self, sink: Arc<dyn EventSink>) -> Result<u64> {
        let mut slot = self.lock();
        if let Some(current) = slot.as_ref() {
            tracing::warn!(armed = current.generation, "rejecting second sink");
            return Err(Error::SessionAlreadyArmed);
        }
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        *slot = Some(Attached {
            generation,
            sink,
            next_sequence: 0,
        });
        tracing::debug!(generation, "sink attached");
        Ok(generation)
    }

    /// Detach the sink if it still belongs to `generation`.
    pub(crate) fn detach(&self, generation: u64) -> bool {
        let mut slot = self.lock();
        match slot.as_ref() {
            Some(current) if current.generation == generation => {
                let delivered = current.next_sequence;
                *slot = None;
                tracing::debug!(generation, delivered, "sink detached");
                true
            }
            _ => false,
        }
    }

    fn is_attached(&self) -> bool {
        self.lock().is_some()
    }

    fn forward(&self, activity: &Activity) {
        let Some((category, tag)) = classify(activity.name()) else {
            tracing::trace!(activity = %activity.name(), "ignoring unrecognized activity");
            return;
        };

        let event = match category {
            EventCategory::Incoming => activity
                .shared_tag::<IncomingContext>(tag)
                .map(PipelineEvent::Incoming),
            EventCategory::Outgoing => activity
                .shared_tag::<OutgoingContext>(tag)
                .map(PipelineEvent::Outgoing),
            EventCategory::InvokedHandler => activity
                .shared_tag::<InvokeHandlerContext>(tag)
                .map(PipelineEvent::InvokedHandler),
        };
        let Some(event) = event else {
            tracing::warn!(
                activity = %activity.name(),
                activity_id = %activity.id(),
                tag,
                "activity carries no stage context, dropping"
            );
            return;
        };

        let mut slot = self.lock();
        let Some(attached) = slot.as_mut() else {
            return;
        };

        let observed = ObservedEvent::new(attached.next_sequence, activity, event);
        attached.next_sequence += 1;
        tracing::trace!(
            generation = attached.generation,
            sequence = observed.sequence(),
            category = %category,
            message_type = %observed.message().message_type(),
            "event forwarded"
        );

        let sink = &attached.sink;
        if catch_unwind(AssertUnwindSafe(|| sink.on_event(&observed))).is_err() {
            tracing::error!(
                generation = attached.generation,
                sequence = observed.sequence(),
                "event sink panicked"
            );
        }
    }
}

/// Typed view of one [`DiagnosticSource`] for a single consumer at a time.
///
/// The bus registers itself as a listener when created and unregisters when
/// dropped. At most one [`EventSink`] may be attached; a second
/// [`attach`](Self::attach) fails with [`Error::SessionAlreadyArmed`] until
/// the first [`Subscription`] is detached.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use pipewatch::{Activity, DiagnosticSource, EventBus, IncomingContext, LogicalMessage, ObservedEvent};
///
/// #[derive(Debug)]
/// struct OrderPlaced;
///
/// let source = DiagnosticSource::new();
/// let bus = EventBus::new(&source);
///
/// let seen = Arc::new(Mutex::new(0));
/// let counter = seen.clone();
/// let subscription = bus
///     .attach(Arc::new(move |_: &ObservedEvent| *counter.lock().unwrap() += 1))
///     .unwrap();
///
/// source.emit(&Activity::receive_message(IncomingContext::new(LogicalMessage::new(OrderPlaced))));
/// subscription.detach();
/// source.emit(&Activity::receive_message(IncomingContext::new(LogicalMessage::new(OrderPlaced))));
///
/// assert_eq!(*seen.lock().unwrap(), 1);
/// assert!(!bus.is_attached());
/// ```
pub struct EventBus {
    core: Arc<BusCore>,
    session_gate: tokio::sync::Mutex<()>,
    _registration: ListenerHandle,
}

impl EventBus {
    /// Create a bus listening on `source`.
    pub fn new(source: &DiagnosticSource) -> Self {
        let core = Arc::new(BusCore::new());
        let listener = core.clone();
        let registration = source.subscribe(move |activity: &Activity| listener.forward(activity));
        Self {
            core,
            session_gate: tokio::sync::Mutex::new(()),
            _registration: registration,
        }
    }

    /// The process-wide bus listening on [`DiagnosticSource::global`].
    ///
    /// Every call returns the same bus, so sessions on the global source
    /// share one slot and one session gate.
    pub fn global() -> Arc<EventBus> {
        GLOBAL.get_or_init(|| Arc::new(Self::new(&DiagnosticSource::global()))).clone()
    }

    /// Attach `sink` as the receiver of every classified event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionAlreadyArmed`] if another sink is attached.
    pub fn attach(&self, sink: Arc<dyn EventSink>) -> Result<Subscription> {
        let generation = self.core.attach(sink)?;
        Ok(Subscription::new(self.core.clone(), generation))
    }

    /// Returns true while a sink is attached.
    pub fn is_attached(&self) -> bool {
        self.core.is_attached()
    }

    /// Queue for harnesses running with serialized sessions.
    pub(crate) fn session_gate(&self) -> &tokio::sync::Mutex<()> {
        &self.session_gate
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("attached", &self.is_attached())
            .field("registration", &self._registration)
            .finish()
    }
}
