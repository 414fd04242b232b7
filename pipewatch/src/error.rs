use std::{sync::Arc, time::Duration};

use crate::ObservedMessageContexts;

/// The single error type for all pipewatch operations.
///
/// Every fallible API returns `pipewatch::Result<T>` (alias for
/// `Result<T, pipewatch::Error>`). Errors raised by the caller's test action
/// or by a [`MessageSession`](crate::MessageSession) are wrapped, never
/// swallowed, and stay reachable through [`std::error::Error::source`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// No matching event was observed before the deadline.
    ///
    /// `observed` holds everything the session recorded before it gave up.
    #[error(
        "no matching event within {timeout:?}: {} events observed",
        .observed.len()
    )]
    Timeout {
        timeout: Duration,
        observed: ObservedMessageContexts,
    },

    /// The test action itself failed.
    #[error("test action failed: {0}")]
    Action(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// A sink was attached to an event bus that already had one.
    #[error("a correlation session is already armed on this event bus")]
    SessionAlreadyArmed,

    /// The session's matcher panicked while evaluating an event.
    #[error("matcher panicked: {0}")]
    MatcherPanicked(String),

    /// The completion signal was dropped without resolving the session.
    #[error("completion signal dropped before the session resolved")]
    CompletionDropped,

    #[error("External error: {0}")]
    External(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn external(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::External(Arc::new(e))
    }

    /// Wrap a failure of the caller's action. A `pipewatch::Error` passes
    /// through as-is.
    pub(crate) fn action(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        match e.into().downcast::<Error>() {
            Ok(own) => *own,
            Err(other) => Error::Action(Arc::from(other)),
        }
    }

    /// Returns true for [`Error::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Events recorded before a timeout, if this is one.
    pub fn observed(&self) -> Option<&ObservedMessageContexts> {
        match self {
            Error::Timeout { observed, .. } => Some(observed),
            _ => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Timeout { timeout: a, .. }, Self::Timeout { timeout: b, .. }) => a == b,
            (Self::Action(a), Self::Action(b)) => Arc::ptr_eq(a, b),
            (Self::SessionAlreadyArmed, Self::SessionAlreadyArmed) => true,
            (Self::MatcherPanicked(a), Self::MatcherPanicked(b)) => a == b,
            (Self::CompletionDropped, Self::CompletionDropped) => true,
            (Self::External(a), Self::External(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Error {}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("queue unavailable")]
    struct QueueDown;

    #[test]
    fn action_error_keeps_source() {
        let err = Error::action(QueueDown);
        assert_eq!(err.to_string(), "test action failed: queue unavailable");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("queue unavailable"));
    }

    #[test]
    fn action_error_accepts_strings() {
        let err = Error::action("handler exploded");
        assert!(matches!(err, Error::Action(_)));
        assert_eq!(err.to_string(), "test action failed: handler exploded");
    }

    #[test]
    fn own_errors_pass_through_action() {
        let err = Error::action(Error::SessionAlreadyArmed);
        assert_eq!(err, Error::SessionAlreadyArmed);
    }

    #[test]
    fn timeout_reports_partial_count() {
        let err = Error::Timeout {
            timeout: Duration::from_millis(250),
            observed: ObservedMessageContexts::default(),
        };
        assert!(err.is_timeout());
        assert_eq!(err.observed().map(|o| o.len()), Some(0));
        assert_eq!(err.to_string(), "no matching event within 250ms: 0 events observed");
    }

    #[test]
    fn misuse_errors_compare_equal() {
        assert_eq!(Error::SessionAlreadyArmed, Error::SessionAlreadyArmed);
        assert_ne!(Error::SessionAlreadyArmed, Error::CompletionDropped);
    }
}
