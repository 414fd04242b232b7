use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, OnceLock, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    Activity,
    diagnostics::{ActivityListener, ListenerHandle, ListenerId},
};

static GLOBAL: OnceLock<DiagnosticSource> = OnceLock::new();

struct ListenerEntry {
    id: ListenerId,
    listener: Arc<dyn ActivityListener>,
}

pub(crate) struct SourceInner {
    listeners: RwLock<Vec<ListenerEntry>>,
    last_id: AtomicU64,
}

impl SourceInner {
    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|entry| entry.id != id);
        before != listeners.len()
    }
}

/// Broadcast point for pipeline activities.
///
/// Cheap to clone; clones share the same listener set. Use
/// [`DiagnosticSource::new`] for an isolated source (one per test pipeline)
/// or [`DiagnosticSource::global`] for the process-wide instance.
///
/// # Example
///
/// ```ignore
/// let source = DiagnosticSource::new();
///
/// // Register a listener
/// let handle = source.subscribe(MyListener);
///
/// // Pipeline side
/// source.emit(&Activity::receive_message(ctx));
///
/// // Unregister (also happens when the handle is dropped)
/// handle.remove();
/// ```
#[derive(Clone)]
pub struct DiagnosticSource {
    inner: Arc<SourceInner>,
}

impl Default for DiagnosticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticSource {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SourceInner {
                listeners: RwLock::new(Vec::new()),
                last_id: AtomicU64::new(0),
            }),
        }
    }

    /// The process-wide source.
    ///
    /// Every [`EventBus`](crate::EventBus) built on it observes every
    /// pipeline in the process, so tests sharing it must not run
    /// concurrently.
    pub fn global() -> DiagnosticSource {
        GLOBAL.get_or_init(DiagnosticSource::new).clone()
    }

    /// Register a listener and return a handle controlling its registration.
    ///
    /// The listener stays registered until the handle is removed or dropped.
    pub fn subscribe<L: ActivityListener + 'static>(&self, listener: L) -> ListenerHandle {
        let id = self.inner.last_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ListenerEntry {
                id,
                listener: Arc::new(listener),
            });
        tracing::trace!(listener_id = %id, "activity listener registered");
        ListenerHandle::new(id, Arc::downgrade(&self.inner))
    }

    /// Deliver `activity` to every registered listener, in registration order.
    ///
    /// Listeners are called outside the registry lock, so a listener may
    /// (un)register listeners from within its callback. A listener removed
    /// concurrently with an `emit` may still see that one activity.
    pub fn emit(&self, activity: &Activity) {
        let listeners: Vec<(ListenerId, Arc<dyn ActivityListener>)> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|entry| (entry.id, entry.listener.clone()))
            .collect();

        for (id, listener) in listeners {
            let result = catch_unwind(AssertUnwindSafe(|| listener.on_activity(activity)));
            if result.is_err() {
                tracing::error!(listener_id = %id, activity = %activity.name(), "Activity listener panicked, removing");
                self.inner.remove(id);
            }
        }
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for DiagnosticSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticSource")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn recording(source: &DiagnosticSource) -> (ListenerHandle, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = source.subscribe(move |activity: &Activity| {
            sink.lock().unwrap().push(activity.name().to_string());
        });
        (handle, seen)
    }

    #[test]
    fn delivers_in_emission_order() {
        let source = DiagnosticSource::new();
        let (_handle, seen) = recording(&source);

        for name in ["a", "b", "c"] {
            source.emit(&Activity::new(name));
        }

        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn every_listener_receives_each_activity() {
        let source = DiagnosticSource::new();
        let (_h1, first) = recording(&source);
        let (_h2, second) = recording(&source);

        source.emit(&Activity::new("x"));

        assert_eq!(first.lock().unwrap().len(), 1);
        assert_eq!(second.lock().unwrap().len(), 1);
    }

    #[test]
    fn dropping_handle_unsubscribes() {
        let source = DiagnosticSource::new();
        let (handle, seen) = recording(&source);
        assert_eq!(source.listener_count(), 1);

        drop(handle);
        source.emit(&Activity::new("late"));

        assert_eq!(source.listener_count(), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn panicking_listener_is_removed() {
        let source = DiagnosticSource::new();
        fn explode(_: &Activity) {
            panic!("boom");
        }

        let _bad = source.subscribe(explode);
        let (_good, seen) = recording(&source);

        source.emit(&Activity::new("first"));
        source.emit(&Activity::new("second"));

        assert_eq!(source.listener_count(), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn clones_share_listeners() {
        let source = DiagnosticSource::new();
        let (_handle, seen) = recording(&source);

        source.clone().emit(&Activity::new("via clone"));

        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
