use std::{fmt, sync::Arc};

use crate::bus::BusCore;

/// Guard for a sink attached to an [`EventBus`](crate::EventBus).
///
/// The sink stays attached until [`detach`](Self::detach) is called or the
/// guard is dropped, whichever comes first. Once detached, the sink receives
/// no further events even if the pipeline keeps emitting.
pub struct Subscription {
    core: Arc<BusCore>,
    generation: u64,
    detached: bool,
}

impl Subscription {
    pub(crate) fn new(core: Arc<BusCore>, generation: u64) -> Self {
        Self {
            core,
            generation,
            detached: false,
        }
    }

    /// Attachment counter value identifying this subscription on its bus.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Detach the sink now.
    pub fn detach(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.detached {
            self.detached = true;
            self.core.detach(self.generation);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("generation", &self.generation)
            .field("detached", &self.detached)
            .finish()
    }
}
