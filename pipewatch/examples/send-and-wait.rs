use std::time::Duration;

use pipewatch::*;
use tokio::sync::mpsc;

// Messages flowing through the pipeline
#[derive(Debug)]
struct PlaceOrder {
    id: u32,
}

#[derive(Debug)]
struct OrderPlaced {
    id: u32,
}

struct PlaceOrderHandler;

// A tiny instrumented endpoint: every stage reports into the diagnostic source
struct Endpoint {
    source: DiagnosticSource,
    queue: mpsc::UnboundedSender<LogicalMessage>,
}

impl Endpoint {
    fn start(source: &DiagnosticSource) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<LogicalMessage>();
        let worker_source = source.clone();
        let worker_queue = tx.clone();
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                worker_source.emit(&Activity::receive_message(IncomingContext::new(
                    message.clone(),
                )));

                // Simulate some work before handling
                tokio::time::sleep(Duration::from_millis(50)).await;

                if let Some(order) = message.instance_as::<PlaceOrder>() {
                    let placed = LogicalMessage::new(OrderPlaced { id: order.id });
                    worker_source.emit(&Activity::publish_message(OutgoingContext::new(
                        placed.clone(),
                        MessageIntent::Publish,
                    )));
                    let _ = worker_queue.send(placed);
                    worker_source.emit(&Activity::invoke_handler(
                        InvokeHandlerContext::new::<PlaceOrderHandler>(message.clone()),
                    ));
                }
            }
        });
        Self {
            source: source.clone(),
            queue: tx,
        }
    }

    fn dispatch(&self, message: LogicalMessage, intent: MessageIntent) -> Result {
        let ctx = OutgoingContext::new(message.clone(), intent);
        self.source.emit(&match intent {
            MessageIntent::Publish => Activity::publish_message(ctx),
            MessageIntent::Send => Activity::send_message(ctx),
        });
        self.queue
            .send(message)
            .map_err(|e| Error::external(std::io::Error::other(e.to_string())))
    }
}

impl MessageSession for Endpoint {
    async fn send<M: Message>(&self, message: M) -> Result {
        self.dispatch(LogicalMessage::new(message), MessageIntent::Send)
    }

    async fn publish<M: Message>(&self, message: M) -> Result {
        self.dispatch(LogicalMessage::new(message), MessageIntent::Publish)
    }
}

#[tokio::main]
async fn main() -> Result {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let source = DiagnosticSource::new();
    let endpoint = Endpoint::start(&source);
    let harness = Harness::new(EventBus::new(&source));

    // Send a command and wait until the resulting event has been received
    let observed = harness
        .execute_and_wait_for_received::<OrderPlaced>(|| endpoint.send(PlaceOrder { id: 42 }))
        .within(Duration::from_secs(2))
        .await?;

    observed.dump();
    let placed: Vec<u32> = observed.received::<OrderPlaced>().map(|m| m.id).collect();
    println!("orders placed: {placed:?}");

    // Waiting for something that never happens fails with the partial view
    if let Err(err) = harness
        .execute_and_wait_for_received::<PlaceOrder>(|| async { Ok::<_, Error>(()) })
        .within(Duration::from_millis(200))
        .await
    {
        println!("{err}");
    }

    Ok(())
}
