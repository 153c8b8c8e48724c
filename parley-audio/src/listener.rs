//! The boundary to the recognition loop.
//!
//! The engine that captures audio, spots the wake word, and transcribes
//! speech lives behind [`CaptureSource`]. The [`Listener`] pumps its events
//! to registered handlers in arrival order, and [`ListenerControl`] carries
//! the two flags every engine honors device-side: `muted` suspends capture
//! while the coordinator is speaking, `sleeping` suspends wake-word
//! detection.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One event out of the recognition loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerEvent {
    RecordBegin,
    RecordEnd,
    WakeWord { utterance: String },
    Utterance { utterances: Vec<String> },
    Speak { utterance: String },
}

/// Registration key for [`Listener::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerEventKind {
    RecordBegin,
    RecordEnd,
    WakeWord,
    Utterance,
    Speak,
}

impl ListenerEvent {
    pub fn kind(&self) -> ListenerEventKind {
        match self {
            ListenerEvent::RecordBegin => ListenerEventKind::RecordBegin,
            ListenerEvent::RecordEnd => ListenerEventKind::RecordEnd,
            ListenerEvent::WakeWord { .. } => ListenerEventKind::WakeWord,
            ListenerEvent::Utterance { .. } => ListenerEventKind::Utterance,
            ListenerEvent::Speak { .. } => ListenerEventKind::Speak,
        }
    }
}

/// Handler invoked for each recognition event of a registered kind.
#[async_trait]
pub trait ListenerEventHandler: Send + Sync {
    async fn handle(&self, event: ListenerEvent);
}

#[derive(Default)]
struct ListenerState {
    muted: AtomicBool,
    sleeping: AtomicBool,
}

/// Cloneable control handle over the recognition loop's shared flags.
///
/// `muted` is flipped by the playback driver around every synthesized
/// chunk; `sleeping` only by the bus dispatcher. Both are read by capture
/// engines, which suspend the matching activity while a flag is set.
#[derive(Clone, Default)]
pub struct ListenerControl {
    state: Arc<ListenerState>,
}

impl ListenerControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend audio capture while speech output owns the device.
    pub fn mute(&self) {
        self.state.muted.store(true, Ordering::SeqCst);
    }

    pub fn unmute(&self) {
        self.state.muted.store(false, Ordering::SeqCst);
    }

    pub fn is_muted(&self) -> bool {
        self.state.muted.load(Ordering::SeqCst)
    }

    /// Suspend wake-word detection until [`ListenerControl::awaken`].
    pub fn sleep(&self) {
        self.state.sleeping.store(true, Ordering::SeqCst);
    }

    pub fn awaken(&self) {
        self.state.sleeping.store(false, Ordering::SeqCst);
    }

    pub fn is_asleep(&self) -> bool {
        self.state.sleeping.load(Ordering::SeqCst)
    }
}

/// Source of recognition events; the engine side of the boundary.
///
/// Implementations get a [`ListenerControl`] clone at construction and are
/// expected to honor its flags device-side.
#[async_trait]
pub trait CaptureSource: Send {
    /// Next event, or `None` when the engine shuts down.
    async fn next_event(&mut self) -> Option<ListenerEvent>;
}

/// The recognition loop's coordinator-facing surface: handler registration
/// plus the blocking run that pumps events from the capture engine.
pub struct Listener {
    source: Box<dyn CaptureSource>,
    handlers: DashMap<ListenerEventKind, Vec<Arc<dyn ListenerEventHandler>>>,
    control: ListenerControl,
}

impl Listener {
    pub fn new(source: Box<dyn CaptureSource>, control: ListenerControl) -> Self {
        Self {
            source,
            handlers: DashMap::new(),
            control,
        }
    }

    pub fn control(&self) -> ListenerControl {
        self.control.clone()
    }

    /// Register a handler for one event kind. Register everything before
    /// calling [`Listener::run`].
    pub fn on(&self, kind: ListenerEventKind, handler: Arc<dyn ListenerEventHandler>) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Pump events to handlers in arrival order, one at a time, without
    /// filtering, until the source ends or the token fires. Owns the
    /// calling context for the life of the process.
    pub async fn run(&mut self, cancel: CancellationToken) {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                ev = self.source.next_event() => match ev {
                    Some(ev) => ev,
                    None => break,
                },
            };
            let handlers = match self.handlers.get(&event.kind()) {
                Some(entry) => entry.value().clone(),
                None => continue,
            };
            for handler in handlers {
                handler.handle(event.clone()).await;
            }
        }
        debug!(target: "listener", "recognition loop stopped");
    }
}

/// Feed half of an in-process capture source, for tests and embedders.
#[derive(Clone)]
pub struct ListenerFeed {
    tx: mpsc::Sender<ListenerEvent>,
}

impl ListenerFeed {
    /// Inject one event; `false` means the listener is gone.
    pub async fn push(&self, event: ListenerEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }
}

/// mpsc-backed [`CaptureSource`].
pub struct ChannelSource {
    rx: mpsc::Receiver<ListenerEvent>,
}

impl ChannelSource {
    pub fn new(capacity: usize) -> (ListenerFeed, ChannelSource) {
        let (tx, rx) = mpsc::channel(capacity);
        (ListenerFeed { tx }, ChannelSource { rx })
    }
}

#[async_trait]
impl CaptureSource for ChannelSource {
    async fn next_event(&mut self) -> Option<ListenerEvent> {
        self.rx.recv().await
    }
}
