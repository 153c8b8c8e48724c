//! Listener boundary tests: ordered dispatch, duplicate delivery, control
//! flags, and loop termination.

use async_trait::async_trait;
use parley_audio::{
    ChannelSource, Listener, ListenerControl, ListenerEvent, ListenerEventHandler,
    ListenerEventKind,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

struct Recorder {
    seen: Arc<Mutex<Vec<ListenerEvent>>>,
}

#[async_trait]
impl ListenerEventHandler for Recorder {
    async fn handle(&self, event: ListenerEvent) {
        self.seen.lock().unwrap().push(event);
    }
}

async fn wait_for(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn events_reach_handlers_in_arrival_order() {
    let (feed, source) = ChannelSource::new(8);
    let listener = Listener::new(Box::new(source), ListenerControl::new());
    let control = listener.control();
    assert!(!control.is_muted());

    let seen = Arc::new(Mutex::new(Vec::new()));
    for kind in [
        ListenerEventKind::RecordBegin,
        ListenerEventKind::Utterance,
        ListenerEventKind::RecordEnd,
    ] {
        listener.on(kind, Arc::new(Recorder { seen: Arc::clone(&seen) }));
    }

    let cancel = CancellationToken::new();
    let run = tokio::spawn({
        let cancel = cancel.clone();
        let mut listener = listener;
        async move { listener.run(cancel).await }
    });

    feed.push(ListenerEvent::RecordBegin).await;
    feed.push(ListenerEvent::Utterance {
        utterances: vec!["hello".into()],
    })
    .await;
    feed.push(ListenerEvent::RecordEnd).await;

    wait_for(|| seen.lock().unwrap().len() == 3).await;
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], ListenerEvent::RecordBegin);
    assert_eq!(
        seen[1],
        ListenerEvent::Utterance {
            utterances: vec!["hello".into()]
        }
    );
    assert_eq!(seen[2], ListenerEvent::RecordEnd);
    drop(seen);

    cancel.cancel();
    run.await.unwrap();
}

#[tokio::test]
async fn duplicate_events_are_delivered_twice() {
    let (feed, source) = ChannelSource::new(8);
    let listener = Listener::new(Box::new(source), ListenerControl::new());

    let seen = Arc::new(Mutex::new(Vec::new()));
    listener.on(
        ListenerEventKind::WakeWord,
        Arc::new(Recorder { seen: Arc::clone(&seen) }),
    );

    let cancel = CancellationToken::new();
    let run = tokio::spawn({
        let cancel = cancel.clone();
        let mut listener = listener;
        async move { listener.run(cancel).await }
    });

    let event = ListenerEvent::WakeWord {
        utterance: "hey parley".into(),
    };
    feed.push(event.clone()).await;
    feed.push(event.clone()).await;

    wait_for(|| seen.lock().unwrap().len() == 2).await;
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], seen[1]);
    drop(seen);

    cancel.cancel();
    run.await.unwrap();
}

#[tokio::test]
async fn unregistered_kinds_are_skipped() {
    let (feed, source) = ChannelSource::new(8);
    let listener = Listener::new(Box::new(source), ListenerControl::new());

    let seen = Arc::new(Mutex::new(Vec::new()));
    listener.on(
        ListenerEventKind::RecordEnd,
        Arc::new(Recorder { seen: Arc::clone(&seen) }),
    );

    let cancel = CancellationToken::new();
    let run = tokio::spawn({
        let cancel = cancel.clone();
        let mut listener = listener;
        async move { listener.run(cancel).await }
    });

    feed.push(ListenerEvent::RecordBegin).await;
    feed.push(ListenerEvent::RecordEnd).await;

    wait_for(|| seen.lock().unwrap().len() == 1).await;
    assert_eq!(seen.lock().unwrap()[0], ListenerEvent::RecordEnd);

    cancel.cancel();
    run.await.unwrap();
}

#[test]
fn control_flags_toggle_and_restore() {
    let control = ListenerControl::new();
    assert!(!control.is_muted());
    assert!(!control.is_asleep());

    control.mute();
    assert!(control.is_muted());
    control.unmute();
    assert!(!control.is_muted());

    control.sleep();
    assert!(control.is_asleep());
    control.awaken();
    assert!(!control.is_asleep());
}

#[test]
fn control_clones_share_state() {
    let control = ListenerControl::new();
    let clone = control.clone();
    control.mute();
    assert!(clone.is_muted());
    clone.unmute();
    assert!(!control.is_muted());
}

#[tokio::test]
async fn run_ends_when_the_source_closes() {
    let (feed, source) = ChannelSource::new(8);
    let mut listener = Listener::new(Box::new(source), ListenerControl::new());

    let run = tokio::spawn(async move { listener.run(CancellationToken::new()).await });

    drop(feed);
    tokio::time::timeout(Duration::from_millis(500), run)
        .await
        .expect("listener did not stop when the source closed")
        .unwrap();
}

#[tokio::test]
async fn cancellation_stops_the_run_loop() {
    let (_feed, source) = ChannelSource::new(8);
    let mut listener = Listener::new(Box::new(source), ListenerControl::new());

    let cancel = CancellationToken::new();
    let run = tokio::spawn({
        let cancel = cancel.clone();
        async move { listener.run(cancel).await }
    });

    cancel.cancel();
    tokio::time::timeout(Duration::from_millis(500), run)
        .await
        .expect("listener did not stop on cancellation")
        .unwrap();
}
