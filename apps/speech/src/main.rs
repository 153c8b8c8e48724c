use parley_audio::{ListenerControl, SubprocessTts, TtsEngine};
use parley_core::{local_pair, BusTransport};
use parley_speech::config::SpeechConfig;
use parley_speech::stdin_source::StdinSource;
use parley_speech::supervisor::SpeechClient;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        target: "speech",
        "Starting speech client: recognition loop <-> message bus"
    );

    let config = SpeechConfig::load();

    // The far end of the local pair stands in for the bus server process;
    // a wire transport would implement BusTransport in its place.
    let (near, far) = local_pair(64);
    let far = Arc::new(far);
    let outbound_log = tokio::spawn({
        let far = Arc::clone(&far);
        async move {
            while let Some(event) = far.recv().await {
                debug!(target: "speech", topic = %event.topic, "outbound");
            }
        }
    });

    let control = ListenerControl::new();
    let source = Box::new(StdinSource::new(control.clone()));
    let engine: Arc<dyn TtsEngine> = Arc::new(SubprocessTts::new(config.tts.clone()));

    let client = SpeechClient::new(config, Arc::new(near), source, control, engine);

    // Ctrl+C requests orderly shutdown of both run loops.
    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!(target: "speech", "Shutting down...");
                cancel.cancel();
            }
        })
    };

    client.run(cancel).await;

    ctrl_c.abort();
    outbound_log.abort();
    Ok(())
}
