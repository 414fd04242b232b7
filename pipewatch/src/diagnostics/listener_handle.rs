use std::{fmt, sync::Weak};

use crate::diagnostics::{ListenerId, SourceInner};

/// Handle to a listener registered with a [`DiagnosticSource`](crate::DiagnosticSource).
///
/// Dropping the handle unregisters the listener.
pub struct ListenerHandle {
    id: ListenerId,
    source: Weak<SourceInner>,
}

impl ListenerHandle {
    pub(crate) fn new(id: ListenerId, source: Weak<SourceInner>) -> Self {
        Self { id, source }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Unregister the listener now.
    pub fn remove(self) {
        drop(self);
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(source) = self.source.upgrade() {
            if source.remove(self.id) {
                tracing::trace!(listener_id = %self.id, "activity listener removed");
            }
        }
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle").field("id", &self.id).finish()
    }
}
