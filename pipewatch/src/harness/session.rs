use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Mutex, MutexGuard, PoisonError},
};

use tokio::sync::oneshot;

use crate::{
    Error, EventSink, ObservedEvent, ObservedMessageContexts, Result, StageContext,
    harness::{Matcher, observed::EventLog},
};

struct SessionState {
    log: EventLog,
    completion: Option<oneshot::Sender<Result<u64>>>,
}

/// Sink owned by one correlation session.
///
/// Appends every delivered event to the log, then evaluates the matcher
/// against events of `C`'s category until the first match, which fires the
/// completion signal with that event's sequence number. A panicking matcher
/// fires it with [`Error::MatcherPanicked`] instead.
pub(crate) struct SessionSink<C: StageContext> {
    state: Mutex<SessionState>,
    matcher: Matcher<C>,
}

impl<C: StageContext> SessionSink<C> {
    pub(crate) fn new(matcher: Matcher<C>) -> (Self, oneshot::Receiver<Result<u64>>) {
        let (tx, rx) = oneshot::channel();
        let sink = Self {
            state: Mutex::new(SessionState {
                log: EventLog::default(),
                completion: Some(tx),
            }),
            matcher,
        };
        (sink, rx)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the recorded log, leaving an empty one behind.
    pub(crate) fn take_observed(&self) -> ObservedMessageContexts {
        std::mem::take(&mut self.lock().log).into_observed()
    }
}

impl<C: StageContext> EventSink for SessionSink<C> {
    fn on_event(&self, event: &ObservedEvent) {
        let mut state = self.lock();
        state.log.append(event);

        if state.completion.is_none() {
            return;
        }
        let Some(ctx) = C::from_event(event.event()) else {
            return;
        };
        let signal = match catch_unwind(AssertUnwindSafe(|| self.matcher.matches(ctx))) {
            Ok(false) => return,
            Ok(true) => {
                tracing::debug!(
                    sequence = event.sequence(),
                    category = %C::CATEGORY,
                    message_type = %event.message().message_type(),
                    recorded = state.log.len(),
                    "session matched"
                );
                Ok(event.sequence())
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                tracing::error!(
                    sequence = event.sequence(),
                    category = %C::CATEGORY,
                    reason = %reason,
                    "matcher panicked"
                );
                Err(Error::MatcherPanicked(reason))
            }
        };
        if let Some(completion) = state.completion.take() {
            // The receiver is gone only if the session was already abandoned.
            let _ = completion.send(signal);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
