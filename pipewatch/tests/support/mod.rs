//! In-memory message endpoint instrumented the way a real pipeline would be.
//!
//! Messages are queued on an unbounded channel and processed one at a time
//! by a spawned worker. Every stage reports an activity into the endpoint's
//! [`DiagnosticSource`]:
//!
//! - dispatch: `send_message` / `publish_message`, then the message is queued
//! - processing: `receive_message`, then each registered handler runs, its
//!   outgoing messages are dispatched, and `invoke_handler` is reported

#![allow(dead_code)]

use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use pipewatch::{
    ActiveSagaInstance, Activity, DiagnosticSource, IncomingContext, InvokeHandlerContext,
    LogicalMessage, Message, MessageIntent, MessageSession, OutgoingContext, TypeKey,
};
use tokio::{sync::mpsc, task::JoinHandle};
use uuid::Uuid;

/// Install a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ==================== Messages ====================

#[derive(Debug, Clone)]
pub struct FirstMessage {
    pub data: String,
}

#[derive(Debug, Clone)]
pub struct SecondMessage {
    pub data: String,
}

#[derive(Debug, Clone)]
pub struct ThirdEvent {
    pub data: String,
}

#[derive(Debug, Clone)]
pub struct FinalMessage {
    pub data: String,
}

/// Nothing handles or produces this.
#[derive(Debug, Clone)]
pub struct NotHandledMessage;

#[derive(Debug, Clone)]
pub struct StartSagaMessage {
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExampleSagaData {
    pub message: String,
}

pub struct FirstHandler;
pub struct SecondHandler;
pub struct ThirdHandler;
pub struct FinalHandler;
pub struct ExampleSaga;

// ==================== Handler Context ====================

/// What a handler may do besides reading its message.
#[derive(Default)]
pub struct HandlerContext {
    outbox: Vec<(LogicalMessage, MessageIntent)>,
}

impl HandlerContext {
    pub fn send<M: Message>(&mut self, message: M) {
        self.outbox.push((LogicalMessage::new(message), MessageIntent::Send));
    }

    pub fn publish<M: Message>(&mut self, message: M) {
        self.outbox.push((LogicalMessage::new(message), MessageIntent::Publish));
    }
}

type Invoke = Arc<
    dyn Fn(&LogicalMessage, &mut HandlerContext, &SagaStore) -> Option<ActiveSagaInstance>
        + Send
        + Sync,
>;

struct Registration {
    handler_type: TypeKey,
    invoke: Invoke,
}

#[derive(Default)]
struct SagaStore {
    instances: Mutex<HashMap<(TypeKey, String), (Uuid, Arc<dyn Any + Send + Sync>)>>,
}

/// Whether a saga is done after handling a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStep {
    Continue,
    Complete,
}

// ==================== Endpoint ====================

#[derive(Default)]
pub struct EndpointBuilder {
    handlers: HashMap<TypeKey, Vec<Registration>>,
    processing_delay: Option<Duration>,
}

impl EndpointBuilder {
    /// Register handler `H` for messages of type `M`.
    pub fn handle<H, M, F>(mut self, handler: F) -> Self
    where
        H: 'static,
        M: Message,
        F: Fn(&M, &mut HandlerContext) + Send + Sync + 'static,
    {
        let invoke: Invoke = Arc::new(move |message, ctx, _| {
            if let Some(message) = message.instance_as::<M>() {
                handler(message, ctx);
            }
            None
        });
        self.handlers
            .entry(TypeKey::of::<M>())
            .or_default()
            .push(Registration {
                handler_type: TypeKey::of::<H>(),
                invoke,
            });
        self
    }

    /// Register saga `S` with data `D` for messages of type `M`.
    ///
    /// `correlate` picks the saga instance; a message that correlates to no
    /// stored instance starts a new one from `D::default()`.
    pub fn saga<S, M, D, C, F>(mut self, correlate: C, handler: F) -> Self
    where
        S: 'static,
        M: Message,
        D: Clone + Default + Send + Sync + 'static,
        C: Fn(&M) -> String + Send + Sync + 'static,
        F: Fn(&M, &mut D, &mut HandlerContext) -> SagaStep + Send + Sync + 'static,
    {
        let invoke: Invoke = Arc::new(move |message, ctx, store| {
            let message = message.instance_as::<M>()?;
            let key = (TypeKey::of::<S>(), correlate(message));

            let mut instances = store
                .instances
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            let (saga_id, mut data) = match instances.get(&key) {
                Some((id, data)) => (*id, data.downcast_ref::<D>().cloned().unwrap_or_default()),
                None => (Uuid::new_v4(), D::default()),
            };

            let step = handler(message, &mut data, ctx);
            let instance = ActiveSagaInstance::new::<S, _>(saga_id, data.clone());
            match step {
                SagaStep::Continue => {
                    instances.insert(key, (saga_id, Arc::new(data)));
                    Some(instance)
                }
                SagaStep::Complete => {
                    instances.remove(&key);
                    Some(instance.mark_completed())
                }
            }
        });
        self.handlers
            .entry(TypeKey::of::<M>())
            .or_default()
            .push(Registration {
                handler_type: TypeKey::of::<S>(),
                invoke,
            });
        self
    }

    /// Sleep this long before processing each received message.
    pub fn processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = Some(delay);
        self
    }

    /// Spawn the worker. Must be called inside a tokio runtime.
    pub fn start(self, source: &DiagnosticSource) -> Endpoint {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            source: source.clone(),
            queue: tx,
            handlers: self.handlers,
            sagas: SagaStore::default(),
        });
        let worker = tokio::spawn(process(shared.clone(), rx, self.processing_delay));
        Endpoint { shared, worker }
    }
}

struct Shared {
    source: DiagnosticSource,
    queue: mpsc::UnboundedSender<LogicalMessage>,
    handlers: HashMap<TypeKey, Vec<Registration>>,
    sagas: SagaStore,
}

impl Shared {
    fn dispatch(&self, message: LogicalMessage, intent: MessageIntent) -> pipewatch::Result {
        let ctx = OutgoingContext::new(message.clone(), intent).with_destination("local");
        let activity = match intent {
            MessageIntent::Publish => Activity::publish_message(ctx),
            MessageIntent::Send => Activity::send_message(ctx),
        };
        self.source.emit(&activity);
        self.queue
            .send(message)
            .map_err(|_| pipewatch::Error::external(EndpointStopped))
    }
}

async fn process(
    shared: Arc<Shared>,
    mut rx: mpsc::UnboundedReceiver<LogicalMessage>,
    delay: Option<Duration>,
) {
    while let Some(message) = rx.recv().await {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let message_id = Uuid::new_v4().to_string();
        shared.source.emit(&Activity::receive_message(
            IncomingContext::new(message.clone()).with_message_id(message_id.clone()),
        ));

        let Some(registrations) = shared.handlers.get(&message.message_type()) else {
            continue;
        };
        for registration in registrations {
            let mut ctx = HandlerContext::default();
            let saga = (registration.invoke)(&message, &mut ctx, &shared.sagas);
            for (outgoing, intent) in ctx.outbox {
                if shared.dispatch(outgoing, intent).is_err() {
                    return;
                }
            }
            let mut invocation =
                InvokeHandlerContext::for_handler(registration.handler_type, message.clone())
                    .with_message_id(message_id.clone());
            if let Some(saga) = saga {
                invocation = invocation.with_saga_instance(saga);
            }
            shared.source.emit(&Activity::invoke_handler(invocation));
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("endpoint stopped")]
pub struct EndpointStopped;

/// A running endpoint. Dropping it stops the worker.
pub struct Endpoint {
    shared: Arc<Shared>,
    worker: JoinHandle<()>,
}

impl Endpoint {
    pub fn builder() -> EndpointBuilder {
        EndpointBuilder::default()
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

impl MessageSession for Endpoint {
    async fn send<M: Message>(&self, message: M) -> pipewatch::Result {
        self.shared.dispatch(LogicalMessage::new(message), MessageIntent::Send)
    }

    async fn publish<M: Message>(&self, message: M) -> pipewatch::Result {
        self.shared.dispatch(LogicalMessage::new(message), MessageIntent::Publish)
    }
}

// ==================== Canned Pipelines ====================

/// First → Second (send) → Third (publish) → Final.
pub fn chain_endpoint(source: &DiagnosticSource) -> Endpoint {
    Endpoint::builder()
        .handle::<FirstHandler, FirstMessage, _>(|m, ctx| {
            ctx.send(SecondMessage { data: m.data.clone() })
        })
        .handle::<SecondHandler, SecondMessage, _>(|m, ctx| {
            ctx.publish(ThirdEvent { data: m.data.clone() })
        })
        .handle::<ThirdHandler, ThirdEvent, _>(|m, ctx| {
            ctx.send(FinalMessage { data: m.data.clone() })
        })
        .handle::<FinalHandler, FinalMessage, _>(|_, _| {})
        .start(source)
}

/// First → Second → Final, all plain sends.
pub fn three_hop_endpoint(source: &DiagnosticSource) -> Endpoint {
    Endpoint::builder()
        .handle::<FirstHandler, FirstMessage, _>(|m, ctx| {
            ctx.send(SecondMessage { data: m.data.clone() })
        })
        .handle::<SecondHandler, SecondMessage, _>(|m, ctx| {
            ctx.send(FinalMessage { data: m.data.clone() })
        })
        .start(source)
}

/// `StartSagaMessage` starts `ExampleSaga`, which stores the text and completes.
pub fn saga_endpoint(source: &DiagnosticSource) -> Endpoint {
    Endpoint::builder()
        .saga::<ExampleSaga, StartSagaMessage, ExampleSagaData, _, _>(
            |m| m.message.clone(),
            |m, data, _| {
                data.message = m.message.clone();
                SagaStep::Complete
            },
        )
        .start(source)
}
