// Bus client: per-topic handler registry over a pluggable transport
use crate::event::BusEvent;
use crate::{ParleyError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Handler invoked for each inbound event on a registered topic.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: BusEvent) -> Result<()>;
}

/// One end of a bus connection. The wire protocol lives behind this trait;
/// the client only assumes FIFO delivery per connection.
#[async_trait]
pub trait BusTransport: Send + Sync {
    async fn send(&self, event: BusEvent) -> Result<()>;

    /// Next inbound event. `None` means the connection closed.
    async fn recv(&self) -> Option<BusEvent>;
}

/// Channel-backed transport for development and tests.
///
/// [`local_pair`] returns the two ends of a connection wired back to back;
/// the far end stands in for the bus server process.
pub struct LocalTransport {
    tx: mpsc::Sender<BusEvent>,
    rx: Mutex<mpsc::Receiver<BusEvent>>,
}

/// Create two cross-wired [`LocalTransport`] ends with the given queue
/// depth per direction.
pub fn local_pair(capacity: usize) -> (LocalTransport, LocalTransport) {
    let (a_tx, a_rx) = mpsc::channel(capacity);
    let (b_tx, b_rx) = mpsc::channel(capacity);
    (
        LocalTransport {
            tx: a_tx,
            rx: Mutex::new(b_rx),
        },
        LocalTransport {
            tx: b_tx,
            rx: Mutex::new(a_rx),
        },
    )
}

#[async_trait]
impl BusTransport for LocalTransport {
    async fn send(&self, event: BusEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| ParleyError::BusError("connection closed".into()))
    }

    async fn recv(&self) -> Option<BusEvent> {
        self.rx.lock().await.recv().await
    }
}

/// Client side of the message bus.
///
/// Register handlers per topic, publish fire-and-forget, and pump inbound
/// events with [`BusClient::run_forever`]. Handlers run one at a time in
/// registration order: a slow handler delays everything behind it and the
/// transport queues the backlog. Bus commands must not reenter each other.
pub struct BusClient {
    transport: Arc<dyn BusTransport>,
    handlers: DashMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl BusClient {
    pub fn new(transport: Arc<dyn BusTransport>) -> Self {
        Self {
            transport,
            handlers: DashMap::new(),
        }
    }

    /// Register a handler for a topic. Register everything before the
    /// receive loop starts delivering.
    pub fn on(&self, topic: &str, handler: Arc<dyn EventHandler>) {
        self.handlers
            .entry(topic.to_string())
            .or_default()
            .push(handler);
    }

    /// Publish an event. Fire-and-forget: errors only when the connection
    /// itself is gone.
    pub async fn emit(&self, event: BusEvent) -> Result<()> {
        debug!(target: "bus", topic = %event.topic, "emit");
        self.transport.send(event).await
    }

    /// Deliver inbound events to registered handlers until the connection
    /// closes or the token fires.
    pub async fn run_forever(&self, cancel: CancellationToken) {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                ev = self.transport.recv() => match ev {
                    Some(ev) => ev,
                    None => break,
                },
            };
            self.dispatch(event).await;
        }
        debug!(target: "bus", "receive loop stopped");
    }

    async fn dispatch(&self, event: BusEvent) {
        let handlers = match self.handlers.get(&event.topic) {
            Some(entry) => entry.value().clone(),
            None => {
                debug!(target: "bus", topic = %event.topic, "no handler for topic");
                return;
            }
        };
        for handler in handlers {
            if let Err(e) = handler.handle(event.clone()).await {
                // Handler failures stay local; nothing goes back onto the
                // bus as an error event.
                warn!(target: "bus", topic = %event.topic, error = %e, "handler failed");
            }
        }
    }
}
