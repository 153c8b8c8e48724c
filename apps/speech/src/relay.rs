//! Relays recognition-loop lifecycle events onto the bus, unchanged in
//! meaning: one-to-one, order-preserving, no buffering, no deduplication.

use async_trait::async_trait;
use parley_audio::{
    Listener, ListenerEvent, ListenerEventHandler, ListenerEventKind, Playback,
};
use parley_core::{topics, BusClient, BusEvent};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Republishes capture lifecycle and content events on their outbound
/// topics, payloads carried forward untouched.
pub struct CaptureRelay {
    bus: Arc<BusClient>,
}

impl CaptureRelay {
    pub fn new(bus: Arc<BusClient>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl ListenerEventHandler for CaptureRelay {
    async fn handle(&self, event: ListenerEvent) {
        let out = match event {
            ListenerEvent::RecordBegin => {
                info!(target: "speech", "Begin recording");
                BusEvent::new(topics::RECORD_BEGIN)
            }
            ListenerEvent::RecordEnd => {
                info!(target: "speech", "End recording");
                BusEvent::new(topics::RECORD_END)
            }
            ListenerEvent::WakeWord { utterance } => {
                info!(target: "speech", "Wake word detected: {}", utterance);
                BusEvent::new(topics::WAKEWORD).with("utterance", utterance)
            }
            ListenerEvent::Utterance { utterances } => {
                info!(target: "speech", ?utterances, "Utterance");
                BusEvent::new(topics::UTTERANCE).with("utterances", Value::from(utterances))
            }
            // Speak requests from the loop go to playback, not the bus.
            ListenerEvent::Speak { .. } => return,
        };
        if let Err(e) = self.bus.emit(out).await {
            warn!(target: "speech", error = %e, "relay emit failed");
        }
    }
}

/// The recognition loop can ask for speech directly; route it into the
/// playback driver exactly like a bus speak command.
pub struct LoopSpeakHandler {
    playback: Arc<Playback>,
}

impl LoopSpeakHandler {
    pub fn new(playback: Arc<Playback>) -> Self {
        Self { playback }
    }
}

#[async_trait]
impl ListenerEventHandler for LoopSpeakHandler {
    async fn handle(&self, event: ListenerEvent) {
        if let ListenerEvent::Speak { utterance } = event {
            self.playback.speak(&utterance).await;
        }
    }
}

/// Bind the relay and the loop-side speak route. Call before the listener
/// starts running.
pub fn register(listener: &Listener, bus: Arc<BusClient>, playback: Arc<Playback>) {
    let relay: Arc<dyn ListenerEventHandler> = Arc::new(CaptureRelay::new(bus));
    for kind in [
        ListenerEventKind::RecordBegin,
        ListenerEventKind::RecordEnd,
        ListenerEventKind::WakeWord,
        ListenerEventKind::Utterance,
    ] {
        listener.on(kind, Arc::clone(&relay));
    }
    listener.on(
        ListenerEventKind::Speak,
        Arc::new(LoopSpeakHandler::new(playback)),
    );
}
