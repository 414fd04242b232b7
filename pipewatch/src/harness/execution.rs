use std::{
    fmt,
    future::{Future, IntoFuture},
    pin::Pin,
    sync::Arc,
    time::Duration,
};

use tokio::{sync::oneshot, time::Instant};

use crate::{
    Error, ObservedMessageContexts, Result, StageContext,
    harness::{Harness, Matcher, SessionSink, TestAction, action::ActionFuture},
};

type DeferredAction<'a> = Box<dyn FnOnce() -> ActionFuture<'a> + 'a>;

enum Outcome {
    Resolved(u64),
    TimedOut(Duration),
    Faulted(Error),
}

/// A pending correlation session.
///
/// Created by [`Harness::execute_and_wait`] and its wrappers. Nothing
/// happens until the builder is awaited; awaiting it then:
///
/// 1. attaches a sink to the harness's [`EventBus`](crate::EventBus),
/// 2. runs the action,
/// 3. completes once the action has succeeded and an event of `C`'s
///    category has satisfied the matcher,
/// 4. detaches the sink and returns everything recorded in between.
///
/// The deadline covers steps 2 and 3. An action failure is returned as is,
/// even when the deadline expires in the same instant. A matcher that panics
/// ends the session at once with [`Error::MatcherPanicked`].
///
/// # Example
///
/// ```ignore
/// let observed = harness
///     .execute_and_wait(|| session.send(Ping), Matcher::<IncomingContext>::by_message_type::<Pong>())
///     .within(Duration::from_secs(2))
///     .await?;
/// ```
#[must_use = "a session does nothing unless awaited"]
pub struct ExecuteAndWait<'a, C: StageContext> {
    harness: &'a Harness,
    action: DeferredAction<'a>,
    matcher: Matcher<C>,
    timeout: Option<Option<Duration>>,
}

impl<'a, C: StageContext> ExecuteAndWait<'a, C> {
    pub(crate) fn new(
        harness: &'a Harness,
        action: impl TestAction<'a> + 'a,
        matcher: Matcher<C>,
    ) -> Self {
        Self {
            harness,
            action: Box::new(move || action.start()),
            matcher,
            timeout: None,
        }
    }

    /// Override the configured deadline for this call.
    pub fn within(mut self, timeout: Duration) -> Self {
        self.timeout = Some(Some(timeout));
        self
    }

    /// Wait without a deadline. The call blocks until the action has
    /// finished and a matching event arrives.
    pub fn without_timeout(mut self) -> Self {
        self.timeout = Some(None);
        self
    }

    async fn run(self) -> Result<ObservedMessageContexts> {
        let timeout = self.harness.config().effective_timeout(self.timeout);
        let bus = self.harness.bus();

        let _gate = if self.harness.config().serialized_sessions() {
            Some(bus.session_gate().lock().await)
        } else {
            None
        };

        let (sink, completion) = SessionSink::new(self.matcher);
        let sink = Arc::new(sink);
        let subscription = bus.attach(sink.clone())?;
        tracing::debug!(
            generation = subscription.generation(),
            category = %C::CATEGORY,
            ?timeout,
            "session armed"
        );

        let outcome = drive((self.action)(), completion, timeout).await;

        let generation = subscription.generation();
        subscription.detach();
        let observed = sink.take_observed();

        match outcome {
            Outcome::Resolved(sequence) => {
                tracing::debug!(generation, sequence, recorded = observed.len(), "session resolved");
                Ok(observed)
            }
            Outcome::TimedOut(timeout) => {
                tracing::warn!(
                    generation,
                    ?timeout,
                    category = %C::CATEGORY,
                    recorded = observed.len(),
                    "session timed out"
                );
                Err(Error::Timeout { timeout, observed })
            }
            Outcome::Faulted(e) => {
                tracing::debug!(generation, error = %e, "session faulted");
                Err(e)
            }
        }
    }
}

async fn drive(
    action: impl Future<Output = Result>,
    mut completion: oneshot::Receiver<Result<u64>>,
    timeout: Option<Duration>,
) -> Outcome {
    let deadline = timeout.map(|t| (t, Instant::now() + t));
    let timer = async {
        match deadline {
            Some((timeout, at)) => {
                tokio::time::sleep_until(at).await;
                timeout
            }
            None => std::future::pending().await,
        }
    };
    tokio::pin!(action);
    tokio::pin!(timer);

    let mut action_done = false;
    let mut matched = None;

    loop {
        tokio::select! {
            biased;

            result = &mut action, if !action_done => {
                if let Err(e) = result {
                    return Outcome::Faulted(e);
                }
                action_done = true;
            }
            signal = &mut completion, if matched.is_none() => {
                match signal {
                    Ok(Ok(sequence)) => matched = Some(sequence),
                    Ok(Err(e)) => return Outcome::Faulted(e),
                    Err(_) => return Outcome::Faulted(Error::CompletionDropped),
                }
            }
            timeout = &mut timer => return Outcome::TimedOut(timeout),
        }

        if action_done {
            if let Some(sequence) = matched {
                return Outcome::Resolved(sequence);
            }
        }
    }
}

impl<'a, C: StageContext> IntoFuture for ExecuteAndWait<'a, C> {
    type Output = Result<ObservedMessageContexts>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}

impl<C: StageContext> fmt::Debug for ExecuteAndWait<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteAndWait")
            .field("harness", &self.harness)
            .field("category", &C::CATEGORY)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
