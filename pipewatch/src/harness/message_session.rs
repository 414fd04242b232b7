use std::future::Future;

use crate::{Message, Result};

/// The pipeline entry points a test drives.
///
/// Implemented by whatever hands messages to the pipeline under test. The
/// harness only calls these from inside a session's action, so the resulting
/// outgoing activity is always recorded.
pub trait MessageSession: Send + Sync {
    /// Send `message` to its configured destination.
    fn send<M: Message>(&self, message: M) -> impl Future<Output = Result> + Send;

    /// Send `message` to the local endpoint.
    fn send_local<M: Message>(&self, message: M) -> impl Future<Output = Result> + Send {
        self.send(message)
    }

    /// Publish `message` to all subscribers.
    fn publish<M: Message>(&self, message: M) -> impl Future<Output = Result> + Send;
}
