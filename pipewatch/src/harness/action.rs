use std::{future::Future, pin::Pin};

use crate::{Error, Result};

pub(crate) type ActionFuture<'a> = Pin<Box<dyn Future<Output = Result> + 'a>>;

/// Work a session performs once it is armed.
///
/// Implemented for every `FnOnce() -> impl Future<Output = Result<(), E>>`
/// whose error converts into `Box<dyn Error + Send + Sync>`, so plain
/// closures over `async` blocks work:
///
/// ```ignore
/// harness
///     .execute_and_wait_for_received::<Pong>(|| async {
///         session.send(Ping).await?;
///         Ok::<_, pipewatch::Error>(())
///     })
///     .await?;
/// ```
///
/// The closure is called only after the session's sink is attached.
pub trait TestAction<'a> {
    #[doc(hidden)]
    fn start(self) -> ActionFuture<'a>;
}

impl<'a, F, Fut, E> TestAction<'a> for F
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<(), E>> + 'a,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn start(self) -> ActionFuture<'a> {
        let fut = self();
        Box::pin(async move { fut.await.map_err(Error::action) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("broker offline")]
    struct BrokerOffline;

    #[tokio::test]
    async fn successful_action() {
        let action = || async { Ok::<_, BrokerOffline>(()) };
        assert!(action.start().await.is_ok());
    }

    #[tokio::test]
    async fn failing_action_is_wrapped() {
        let action = || async { Err::<(), _>(BrokerOffline) };
        let err = action.start().await.unwrap_err();
        assert!(matches!(err, Error::Action(_)));
        assert_eq!(err.to_string(), "test action failed: broker offline");
    }

    #[tokio::test]
    async fn own_errors_are_not_rewrapped() {
        let action = || async { Err::<(), _>(Error::CompletionDropped) };
        assert_eq!(action.start().await.unwrap_err(), Error::CompletionDropped);
    }
}
