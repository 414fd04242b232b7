//! Completion predicates for correlation sessions.

use std::{fmt, sync::Arc};

use crate::{EventCategory, InvokeHandlerContext, Message, StageContext};

type MatchFn<C> = Arc<dyn Fn(&C) -> bool + Send + Sync>;

/// A predicate over one stage context type.
///
/// The context type `C` fixes the category a session watches: a
/// `Matcher<IncomingContext>` only ever sees received messages, a
/// `Matcher<OutgoingContext>` only sent or published ones, and a
/// `Matcher<InvokeHandlerContext>` only handler invocations. Events of
/// other categories are still recorded but never evaluated.
///
/// Predicates run on the pipeline's thread while the bus is locked, so
/// they must be cheap and must not emit activities themselves.
///
/// # Example
///
/// ```ignore
/// use pipewatch::{IncomingContext, Matcher};
///
/// // Any received OrderShipped
/// let shipped = Matcher::<IncomingContext>::by_message_type::<OrderShipped>();
///
/// // A received OrderShipped for order 7
/// let seventh = Matcher::<IncomingContext>::by_message(|m: &OrderShipped| m.id == 7);
///
/// // Completion of OrderSaga
/// let done = Matcher::by_saga_completion::<OrderSaga>();
/// ```
pub struct Matcher<C: StageContext> {
    matcher: MatchFn<C>,
}

impl<C: StageContext> Clone for Matcher<C> {
    fn clone(&self) -> Self {
        Self {
            matcher: self.matcher.clone(),
        }
    }
}

impl<C: StageContext> fmt::Debug for Matcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("category", &C::CATEGORY)
            .finish_non_exhaustive()
    }
}

impl<C: StageContext> Matcher<C> {
    /// Match contexts using a custom predicate.
    pub fn by_context<F>(predicate: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        Self {
            matcher: Arc::new(predicate),
        }
    }

    /// Match contexts whose message payload is a `T`.
    pub fn by_message_type<T: Message>() -> Self {
        Self::by_context(|ctx: &C| ctx.message().is::<T>())
    }

    /// Match contexts whose payload is a `T` satisfying `predicate`.
    pub fn by_message<T, F>(predicate: F) -> Self
    where
        T: Message,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::by_context(move |ctx: &C| ctx.message().instance_as::<T>().is_some_and(&predicate))
    }

    /// Both matchers must match.
    pub fn and(self, other: Self) -> Self {
        Self::by_context(move |ctx: &C| self.matches(ctx) && other.matches(ctx))
    }

    /// Either matcher may match.
    pub fn or(self, other: Self) -> Self {
        Self::by_context(move |ctx: &C| self.matches(ctx) || other.matches(ctx))
    }

    /// The category this matcher is evaluated against.
    pub fn category(&self) -> EventCategory {
        C::CATEGORY
    }

    /// Returns true if `ctx` satisfies this matcher.
    pub fn matches(&self, ctx: &C) -> bool {
        (self.matcher)(ctx)
    }
}

impl Matcher<InvokeHandlerContext> {
    /// Match invocations of handler type `H`.
    pub fn by_handler_type<H: 'static>() -> Self {
        Self::by_context(|ctx: &InvokeHandlerContext| ctx.handler_type().is::<H>())
    }

    /// Match the invocation in which saga `S` completed.
    ///
    /// The invocation must be of handler type `S`, carry a saga instance,
    /// and that instance must have been found and marked completed.
    pub fn by_saga_completion<S: 'static>() -> Self {
        Self::by_context(|ctx: &InvokeHandlerContext| {
            if !ctx.handler_type().is::<S>() {
                return false;
            }
            let Some(saga) = ctx.saga_instance() else {
                return false;
            };
            !saga.is_not_found() && saga.is_completed()
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::{
        ActiveSagaInstance, IncomingContext, LogicalMessage, MessageIntent, OutgoingContext,
    };

    #[derive(Debug)]
    struct Ping(u32);

    #[derive(Debug)]
    struct Pong;

    struct PingSaga;

    struct PongHandler;

    fn incoming<M: Message>(message: M) -> IncomingContext {
        IncomingContext::new(LogicalMessage::new(message))
    }

    fn saga_invocation(saga: Option<ActiveSagaInstance>) -> InvokeHandlerContext {
        let ctx = InvokeHandlerContext::new::<PingSaga>(LogicalMessage::new(Ping(1)));
        match saga {
            Some(saga) => ctx.with_saga_instance(saga),
            None => ctx,
        }
    }

    #[test]
    fn by_message_type_checks_payload_type() {
        let matcher = Matcher::<IncomingContext>::by_message_type::<Ping>();
        assert!(matcher.matches(&incoming(Ping(1))));
        assert!(!matcher.matches(&incoming(Pong)));
        assert_eq!(matcher.category(), EventCategory::Incoming);
    }

    #[test]
    fn by_message_uses_typed_predicate() {
        let matcher = Matcher::<OutgoingContext>::by_message(|p: &Ping| p.0 > 10);
        let out = |m| OutgoingContext::new(LogicalMessage::new(Ping(m)), MessageIntent::Send);
        assert!(matcher.matches(&out(11)));
        assert!(!matcher.matches(&out(3)));
        assert!(!matcher.matches(&OutgoingContext::new(
            LogicalMessage::new(Pong),
            MessageIntent::Publish
        )));
    }

    #[test]
    fn combinators() {
        let ping = Matcher::<IncomingContext>::by_message_type::<Ping>();
        let pong = Matcher::<IncomingContext>::by_message_type::<Pong>();
        let big = Matcher::<IncomingContext>::by_message(|p: &Ping| p.0 > 5);

        let either = ping.clone().or(pong);
        assert!(either.matches(&incoming(Pong)));
        assert!(either.matches(&incoming(Ping(1))));

        let both = ping.and(big);
        assert!(both.matches(&incoming(Ping(6))));
        assert!(!both.matches(&incoming(Ping(2))));
    }

    #[test]
    fn by_handler_type() {
        let matcher = Matcher::by_handler_type::<PongHandler>();
        let ctx = InvokeHandlerContext::new::<PongHandler>(LogicalMessage::new(Pong));
        assert!(matcher.matches(&ctx));
        assert!(!matcher.matches(&saga_invocation(None)));
    }

    #[test]
    fn saga_completion_requires_completed_instance() {
        let matcher = Matcher::by_saga_completion::<PingSaga>();
        let id = Uuid::new_v4();

        assert!(!matcher.matches(&saga_invocation(None)));
        assert!(!matcher.matches(&saga_invocation(Some(ActiveSagaInstance::new::<PingSaga, _>(
            id, 0_u32
        )))));
        assert!(!matcher.matches(&saga_invocation(Some(
            ActiveSagaInstance::not_found::<PingSaga>(id).mark_completed()
        ))));
        assert!(matcher.matches(&saga_invocation(Some(
            ActiveSagaInstance::new::<PingSaga, _>(id, 0_u32).mark_completed()
        ))));
    }

    #[test]
    fn saga_completion_ignores_other_handlers() {
        let matcher = Matcher::by_saga_completion::<PingSaga>();
        let ctx = InvokeHandlerContext::new::<PongHandler>(LogicalMessage::new(Pong))
            .with_saga_instance(ActiveSagaInstance::new::<PingSaga, _>(Uuid::new_v4(), ()).mark_completed());
        assert!(!matcher.matches(&ctx));
    }
}
