//! Speech output driver.
//!
//! Serializes playback behind a gate so only one chunk touches the audio
//! device at a time, and pairs every synthesis with a mute/unmute of the
//! capture side so the wake-word detector never hears the speaker. The gate
//! serializes coordinator-side speak requests; the mute flag keeps the
//! recognition loop off the device. Both are paired 1:1 per chunk whether
//! synthesis succeeds or fails.

use crate::listener::ListenerControl;
use crate::segment::{split_sentences, Segmenter};
use crate::tts::TtsEngine;
use parley_core::{topics, BusClient, BusEvent};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task;
use tracing::{info, warn};

pub struct Playback {
    bus: Arc<BusClient>,
    listener: ListenerControl,
    engine: Arc<dyn TtsEngine>,
    gate: Mutex<()>,
    segmenter: Segmenter,
}

impl Playback {
    pub fn new(
        bus: Arc<BusClient>,
        listener: ListenerControl,
        engine: Arc<dyn TtsEngine>,
    ) -> Self {
        Self {
            bus,
            listener,
            engine,
            gate: Mutex::new(()),
            segmenter: split_sentences,
        }
    }

    /// Replace the sentence segmenter.
    pub fn with_segmenter(mut self, segmenter: Segmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Speak a whole utterance, one sentence at a time, strictly in order.
    ///
    /// A failed chunk is logged and the remaining chunks are still
    /// attempted; the caller never sees an error.
    pub async fn speak(&self, utterance: &str) {
        for chunk in (self.segmenter)(utterance) {
            self.speak_chunk(chunk).await;
        }
    }

    async fn speak_chunk(&self, chunk: String) {
        let _gate = self.gate.lock().await;
        if let Err(e) = self.bus.emit(BusEvent::new(topics::AUDIO_OUTPUT_START)).await {
            warn!(target: "playback", error = %e, "could not announce playback start");
        }
        info!(target: "playback", "Speak: {}", chunk);
        self.listener.mute();

        let engine = Arc::clone(&self.engine);
        let result = task::spawn_blocking(move || engine.execute(&chunk)).await;

        // Capture resumes and the end event goes out no matter how
        // synthesis went; the gate itself drops with the guard.
        self.listener.unmute();
        if let Err(e) = self.bus.emit(BusEvent::new(topics::AUDIO_OUTPUT_END)).await {
            warn!(target: "playback", error = %e, "could not announce playback end");
        }
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(target: "playback", error = %e, "synthesis failed"),
            Err(e) => warn!(target: "playback", error = %e, "synthesis task aborted"),
        }
    }
}
