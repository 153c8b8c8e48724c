//! Playback driver tests: chunk ordering, the mute/unmute pairing, the
//! start/end event interleaving, and gate exclusivity under concurrency.

use parley_audio::{ListenerControl, Playback, TtsEngine};
use parley_core::{local_pair, topics, BusClient, BusTransport, LocalTransport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Engine that records every call together with the mute flag at call
/// time, can fail on request, and flags overlapping invocations.
struct RecordingEngine {
    control: ListenerControl,
    calls: Mutex<Vec<(String, bool)>>,
    fail_on: Option<usize>,
    in_flight: AtomicBool,
    overlapped: AtomicBool,
}

impl RecordingEngine {
    fn new(control: ListenerControl) -> Self {
        Self {
            control,
            calls: Mutex::new(Vec::new()),
            fail_on: None,
            in_flight: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
        }
    }

    fn failing_on(control: ListenerControl, index: usize) -> Self {
        Self {
            fail_on: Some(index),
            ..Self::new(control)
        }
    }

    fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

impl TtsEngine for RecordingEngine {
    fn execute(&self, text: &str) -> parley_core::Result<()> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        std::thread::sleep(Duration::from_millis(5));
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((text.to_string(), self.control.is_muted()));
            calls.len() - 1
        };
        self.in_flight.store(false, Ordering::SeqCst);
        if self.fail_on == Some(index) {
            return Err(parley_core::ParleyError::TtsError("synthetic failure".into()));
        }
        Ok(())
    }

    fn module_name(&self) -> &str {
        "recording"
    }
}

fn harness(engine: Arc<RecordingEngine>, control: ListenerControl) -> (Playback, LocalTransport) {
    let (near, far) = local_pair(64);
    let bus = Arc::new(BusClient::new(Arc::new(near)));
    let playback = Playback::new(bus, control, engine as Arc<dyn TtsEngine>);
    (playback, far)
}

async fn drain_topics(far: &LocalTransport, count: usize) -> Vec<String> {
    let mut topics = Vec::new();
    for _ in 0..count {
        let event = tokio::time::timeout(Duration::from_millis(500), far.recv())
            .await
            .expect("timed out waiting for bus event")
            .expect("bus closed");
        topics.push(event.topic);
    }
    topics
}

#[tokio::test]
async fn two_sentences_mean_two_full_cycles() {
    let control = ListenerControl::new();
    let engine = Arc::new(RecordingEngine::new(control.clone()));
    let (playback, far) = harness(Arc::clone(&engine), control.clone());

    playback.speak("Hi there. How are you?").await;

    let calls = engine.calls();
    assert_eq!(
        calls.iter().map(|(t, _)| t.as_str()).collect::<Vec<_>>(),
        vec!["Hi there.", "How are you?"]
    );
    // Capture was muted for every synthesis, and resumed afterwards.
    assert!(calls.iter().all(|(_, muted)| *muted));
    assert!(!control.is_muted());

    assert_eq!(
        drain_topics(&far, 4).await,
        vec![
            topics::AUDIO_OUTPUT_START,
            topics::AUDIO_OUTPUT_END,
            topics::AUDIO_OUTPUT_START,
            topics::AUDIO_OUTPUT_END,
        ]
    );
}

#[tokio::test]
async fn synthesis_failure_releases_everything_and_continues() {
    let control = ListenerControl::new();
    let engine = Arc::new(RecordingEngine::failing_on(control.clone(), 0));
    let (playback, far) = harness(Arc::clone(&engine), control.clone());

    playback.speak("First fails. Second works.").await;

    // The failed chunk did not stop the rest of the utterance.
    assert_eq!(engine.calls().len(), 2);
    // The device is not left muted by the failure.
    assert!(!control.is_muted());
    // Both cycles still announced start and end.
    assert_eq!(
        drain_topics(&far, 4).await,
        vec![
            topics::AUDIO_OUTPUT_START,
            topics::AUDIO_OUTPUT_END,
            topics::AUDIO_OUTPUT_START,
            topics::AUDIO_OUTPUT_END,
        ]
    );
}

#[tokio::test]
async fn concurrent_speaks_never_overlap_on_the_device() {
    let control = ListenerControl::new();
    let engine = Arc::new(RecordingEngine::new(control.clone()));
    let (playback, _far) = harness(Arc::clone(&engine), control.clone());
    let playback = Arc::new(playback);

    let a = tokio::spawn({
        let playback = Arc::clone(&playback);
        async move { playback.speak("One. Two.").await }
    });
    let b = tokio::spawn({
        let playback = Arc::clone(&playback);
        async move { playback.speak("Three.").await }
    });
    a.await.unwrap();
    b.await.unwrap();

    assert_eq!(engine.calls().len(), 3);
    assert!(
        !engine.overlapped.load(Ordering::SeqCst),
        "two chunks were synthesized at the same time"
    );
    assert!(!control.is_muted());
}

#[tokio::test]
async fn segmenter_is_pluggable() {
    fn line_segmenter(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    let control = ListenerControl::new();
    let engine = Arc::new(RecordingEngine::new(control.clone()));
    let (playback, _far) = harness(Arc::clone(&engine), control);
    let playback = playback.with_segmenter(line_segmenter);

    playback.speak("first line\nsecond line").await;

    assert_eq!(
        engine
            .calls()
            .iter()
            .map(|(t, _)| t.as_str())
            .collect::<Vec<_>>(),
        vec!["first line", "second line"]
    );
}

#[tokio::test]
async fn empty_utterance_produces_no_cycle() {
    let control = ListenerControl::new();
    let engine = Arc::new(RecordingEngine::new(control.clone()));
    let (playback, far) = harness(Arc::clone(&engine), control);

    playback.speak("").await;

    assert!(engine.calls().is_empty());
    // No bus traffic either.
    let outcome = tokio::time::timeout(Duration::from_millis(100), far.recv()).await;
    assert!(outcome.is_err(), "unexpected bus event for empty utterance");
}
