//! Inbound bus command handling.
//!
//! One handler per topic, all invoked on the bus receive context: a long
//! speak blocks the next command until it finishes, and no handler is
//! ever reentered.

use async_trait::async_trait;
use parley_audio::{kill_audio_processes, ListenerControl, Playback};
use parley_core::{topics, BusClient, BusEvent, EventHandler, IdentityStore, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Spoken when intent resolution failed across every candidate
/// transcription.
const INTENT_FAILURE_APOLOGY: &str =
    "Sorry, I didn't catch that. Please rephrase your request.";

pub struct SpeakHandler {
    playback: Arc<Playback>,
}

impl SpeakHandler {
    pub fn new(playback: Arc<Playback>) -> Self {
        Self { playback }
    }
}

#[async_trait]
impl EventHandler for SpeakHandler {
    async fn handle(&self, event: BusEvent) -> Result<()> {
        match event.field_str("utterance") {
            Some(utterance) => self.playback.speak(utterance).await,
            None => warn!(target: "speech", topic = %event.topic, "speak event without utterance"),
        }
        Ok(())
    }
}

pub struct IntentFailureHandler {
    playback: Arc<Playback>,
}

impl IntentFailureHandler {
    pub fn new(playback: Arc<Playback>) -> Self {
        Self { playback }
    }
}

#[async_trait]
impl EventHandler for IntentFailureHandler {
    async fn handle(&self, _event: BusEvent) -> Result<()> {
        info!(target: "speech", "Failed to find intent on multiple intents");
        self.playback.speak(INTENT_FAILURE_APOLOGY).await;
        Ok(())
    }
}

pub struct SleepHandler {
    control: ListenerControl,
}

impl SleepHandler {
    pub fn new(control: ListenerControl) -> Self {
        Self { control }
    }
}

#[async_trait]
impl EventHandler for SleepHandler {
    async fn handle(&self, _event: BusEvent) -> Result<()> {
        debug!(target: "speech", "entering sleep");
        self.control.sleep();
        Ok(())
    }
}

pub struct WakeUpHandler {
    control: ListenerControl,
}

impl WakeUpHandler {
    pub fn new(control: ListenerControl) -> Self {
        Self { control }
    }
}

#[async_trait]
impl EventHandler for WakeUpHandler {
    async fn handle(&self, _event: BusEvent) -> Result<()> {
        debug!(target: "speech", "waking up");
        self.control.awaken();
        Ok(())
    }
}

/// Terminates whatever external process is currently producing audio.
/// Best-effort by contract: a stop must never fail, even with nothing
/// running.
pub struct StopHandler {
    targets: Vec<String>,
}

impl StopHandler {
    pub fn new(targets: Vec<String>) -> Self {
        Self { targets }
    }
}

#[async_trait]
impl EventHandler for StopHandler {
    async fn handle(&self, _event: BusEvent) -> Result<()> {
        kill_audio_processes(&self.targets);
        Ok(())
    }
}

pub struct PairedHandler {
    identity: Arc<IdentityStore>,
}

impl PairedHandler {
    pub fn new(identity: Arc<IdentityStore>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl EventHandler for PairedHandler {
    async fn handle(&self, event: BusEvent) -> Result<()> {
        info!(target: "speech", "device paired; persisting identity");
        self.identity.update(&event.payload)?;
        Ok(())
    }
}

/// Bind every inbound topic to its handler. Call before the bus receive
/// loop starts delivering.
pub fn register_handlers(
    bus: &Arc<BusClient>,
    playback: Arc<Playback>,
    control: ListenerControl,
    identity: Arc<IdentityStore>,
    stop_targets: Vec<String>,
) {
    bus.on(
        topics::SPEAK,
        Arc::new(SpeakHandler::new(Arc::clone(&playback))),
    );
    bus.on(
        topics::INTENT_FAILURE,
        Arc::new(IntentFailureHandler::new(playback)),
    );
    bus.on(topics::SLEEP, Arc::new(SleepHandler::new(control.clone())));
    bus.on(topics::WAKE_UP, Arc::new(WakeUpHandler::new(control)));
    bus.on(topics::STOP, Arc::new(StopHandler::new(stop_targets)));
    bus.on(topics::PAIRED, Arc::new(PairedHandler::new(identity)));
}
