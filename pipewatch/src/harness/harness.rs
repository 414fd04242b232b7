use std::{fmt, sync::Arc};

use crate::{
    Config, EventBus, IncomingContext, InvokeHandlerContext, Message, MessageSession,
    OutgoingContext, StageContext,
    harness::{ExecuteAndWait, Matcher, TestAction},
};

/// Wait-for-completion harness for message pipeline tests.
///
/// A harness wraps one [`EventBus`] and runs correlation sessions on it:
/// each wait call arms a sink, runs the test action, waits until a matching
/// event has been observed and returns everything recorded in between as
/// [`ObservedMessageContexts`](crate::ObservedMessageContexts).
///
/// The harness provides:
/// - The generic entry point [`execute_and_wait`](Self::execute_and_wait)
/// - Typed shortcuts: [`execute_and_wait_for_received`](Self::execute_and_wait_for_received),
///   [`execute_and_wait_for_sent`](Self::execute_and_wait_for_sent),
///   [`execute_and_wait_for_handled`](Self::execute_and_wait_for_handled),
///   [`execute_and_wait_for_saga_completion`](Self::execute_and_wait_for_saga_completion)
/// - Session shortcuts: [`send_and_wait_for_handled`](Self::send_and_wait_for_handled),
///   [`publish_and_wait_for_handled`](Self::publish_and_wait_for_handled)
///
/// # Example
///
/// ```ignore
/// let source = DiagnosticSource::new();
/// let endpoint = Endpoint::start(&source);
/// let harness = Harness::new(EventBus::new(&source));
///
/// let observed = harness
///     .execute_and_wait_for_received::<OrderShipped>(|| endpoint.send(PlaceOrder { id: 7 }))
///     .await?;
///
/// assert_eq!(observed.received::<OrderShipped>().next().map(|m| m.id), Some(7));
/// ```
///
/// # Concurrency
///
/// One bus carries at most one session at a time. By default a second
/// concurrent session fails with
/// [`Error::SessionAlreadyArmed`](crate::Error::SessionAlreadyArmed); with
/// [`Config::with_serialized_sessions`] it waits for the first to close.
pub struct Harness {
    bus: Arc<EventBus>,
    config: Config,
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("bus", &self.bus)
            .field("config", &self.config)
            .finish()
    }
}

impl Harness {
    /// Create a harness over `bus` with the default [`Config`].
    pub fn new(bus: impl Into<Arc<EventBus>>) -> Self {
        Self {
            bus: bus.into(),
            config: Config::default(),
        }
    }

    /// Create a harness over the process-wide [`EventBus::global`],
    /// configured from the environment (see [`Config::from_env`]).
    ///
    /// All global harnesses share that bus, so at most one of them has a
    /// session armed at any time.
    pub fn global() -> Self {
        Self::new(EventBus::global()).with_config(Config::from_env())
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    // ==================== Generic Entry Point ====================

    /// Run `action` and wait until an event of `C`'s category satisfies
    /// `matcher`.
    ///
    /// Returns a builder; await it directly or adjust the deadline first
    /// with [`within`](ExecuteAndWait::within) or
    /// [`without_timeout`](ExecuteAndWait::without_timeout).
    pub fn execute_and_wait<'a, C: StageContext>(
        &'a self,
        action: impl TestAction<'a> + 'a,
        matcher: Matcher<C>,
    ) -> ExecuteAndWait<'a, C> {
        ExecuteAndWait::new(self, action, matcher)
    }

    // ==================== Typed Shortcuts ====================

    /// Wait until a message of type `T` is received.
    pub fn execute_and_wait_for_received<'a, T: Message>(
        &'a self,
        action: impl TestAction<'a> + 'a,
    ) -> ExecuteAndWait<'a, IncomingContext> {
        self.execute_and_wait(action, Matcher::by_message_type::<T>())
    }

    /// Wait until a message of type `T` is sent or published.
    pub fn execute_and_wait_for_sent<'a, T: Message>(
        &'a self,
        action: impl TestAction<'a> + 'a,
    ) -> ExecuteAndWait<'a, OutgoingContext> {
        self.execute_and_wait(action, Matcher::by_message_type::<T>())
    }

    /// Wait until a message of type `T` leaves the pipeline.
    ///
    /// Same completion condition as
    /// [`execute_and_wait_for_sent`](Self::execute_and_wait_for_sent): the
    /// pipeline has finished handling the step that produced `T`.
    pub fn execute_and_wait_for_handled<'a, T: Message>(
        &'a self,
        action: impl TestAction<'a> + 'a,
    ) -> ExecuteAndWait<'a, OutgoingContext> {
        self.execute_and_wait_for_sent::<T>(action)
    }

    /// Wait until saga `S` is marked completed.
    pub fn execute_and_wait_for_saga_completion<'a, S: 'static>(
        &'a self,
        action: impl TestAction<'a> + 'a,
    ) -> ExecuteAndWait<'a, InvokeHandlerContext> {
        self.execute_and_wait(action, Matcher::by_saga_completion::<S>())
    }

    // ==================== Session Shortcuts ====================

    /// Send `message` through `session` and wait until a message of type `T`
    /// leaves the pipeline.
    pub fn send_and_wait_for_handled<'a, T, S, M>(
        &'a self,
        session: &'a S,
        message: M,
    ) -> ExecuteAndWait<'a, OutgoingContext>
    where
        T: Message,
        S: MessageSession,
        M: Message,
    {
        self.execute_and_wait_for_handled::<T>(move || session.send(message))
    }

    /// Publish `message` through `session` and wait until a message of type
    /// `T` leaves the pipeline.
    pub fn publish_and_wait_for_handled<'a, T, S, M>(
        &'a self,
        session: &'a S,
        message: M,
    ) -> ExecuteAndWait<'a, OutgoingContext>
    where
        T: Message,
        S: MessageSession,
        M: Message,
    {
        self.execute_and_wait_for_handled::<T>(move || session.publish(message))
    }
}

#[cfg(test)]
mod tests {
    use std::{any::Any, time::Duration};

    use uuid::Uuid;

    use super::*;
    use crate::{
        Activity, ActiveSagaInstance, DiagnosticSource, Error, LogicalMessage, MessageIntent,
        Result,
    };

    #[derive(Debug)]
    struct Ping(u32);

    #[derive(Debug)]
    struct Pong(u32);

    struct PingSaga;

    /// Session that answers every sent `Ping(n)` with a sent `Pong(n)`.
    struct Echo {
        source: DiagnosticSource,
    }

    impl Echo {
        fn outgoing<M: Message>(&self, message: M, intent: MessageIntent) {
            let ctx = OutgoingContext::new(LogicalMessage::new(message), intent);
            let activity = match intent {
                MessageIntent::Publish => Activity::publish_message(ctx),
                MessageIntent::Send => Activity::send_message(ctx),
            };
            self.source.emit(&activity);
        }

        fn respond(&self, message: &dyn Any) {
            if let Some(Ping(n)) = message.downcast_ref::<Ping>() {
                self.outgoing(Pong(*n), MessageIntent::Send);
            }
        }
    }

    impl MessageSession for Echo {
        async fn send<M: Message>(&self, message: M) -> Result {
            self.respond(&message);
            Ok(())
        }

        async fn publish<M: Message>(&self, message: M) -> Result {
            self.outgoing(message, MessageIntent::Publish);
            Ok(())
        }
    }

    fn fixture() -> (DiagnosticSource, Harness) {
        let source = DiagnosticSource::new();
        let harness = Harness::new(EventBus::new(&source));
        (source, harness)
    }

    #[tokio::test]
    async fn waits_for_received_type() {
        let (source, harness) = fixture();

        let observed = harness
            .execute_and_wait_for_received::<Ping>(|| async {
                source.emit(&Activity::receive_message(IncomingContext::new(
                    LogicalMessage::new(Ping(3)),
                )));
                Ok::<_, Error>(())
            })
            .await
            .unwrap();

        assert_eq!(observed.received::<Ping>().map(|p| p.0).collect::<Vec<_>>(), vec![3]);
    }

    #[tokio::test]
    async fn waits_for_saga_completion() {
        let (source, harness) = fixture();
        let id = Uuid::new_v4();
        let invocation = |saga: ActiveSagaInstance| {
            Activity::invoke_handler(
                InvokeHandlerContext::new::<PingSaga>(LogicalMessage::new(Ping(1)))
                    .with_saga_instance(saga),
            )
        };

        let observed = harness
            .execute_and_wait_for_saga_completion::<PingSaga>(|| async {
                source.emit(&invocation(ActiveSagaInstance::new::<PingSaga, _>(id, 1_u32)));
                source.emit(&invocation(
                    ActiveSagaInstance::new::<PingSaga, _>(id, 2_u32).mark_completed(),
                ));
                Ok::<_, Error>(())
            })
            .await
            .unwrap();

        let last = observed.invoked_handlers().last().unwrap();
        assert_eq!(last.saga_instance().and_then(|s| s.entity::<u32>()), Some(&2));
        assert_eq!(observed.handled_by::<PingSaga>().count(), 2);
    }

    #[tokio::test]
    async fn send_and_wait_for_handled_uses_session() {
        let (source, harness) = fixture();
        let echo = Echo {
            source: source.clone(),
        };

        let observed = harness
            .send_and_wait_for_handled::<Pong, _, _>(&echo, Ping(5))
            .within(Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(observed.sent::<Pong>().map(|p| p.0).collect::<Vec<_>>(), vec![5]);
    }

    #[tokio::test]
    async fn publish_and_wait_for_handled_uses_session() {
        let (source, harness) = fixture();
        let echo = Echo { source };

        let observed = harness
            .publish_and_wait_for_handled::<Pong, _, _>(&echo, Pong(8))
            .await
            .unwrap();

        let published = observed.outgoing_message_contexts();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].intent(), MessageIntent::Publish);
    }

    #[tokio::test]
    async fn sessions_run_back_to_back() {
        let (source, harness) = fixture();

        for n in 0..3 {
            let observed = harness
                .execute_and_wait_for_received::<Ping>(|| async {
                    source.emit(&Activity::receive_message(IncomingContext::new(
                        LogicalMessage::new(Ping(n)),
                    )));
                    Ok::<_, Error>(())
                })
                .await
                .unwrap();
            assert_eq!(observed.len(), 1);
        }
        assert!(!harness.bus().is_attached());
    }
}
