//! Startup, wiring, and shutdown of the speech client process.
//!
//! Two execution contexts run concurrently: the recognition loop owns the
//! calling context, and the bus receive loop runs on a supervised worker
//! task. Both stop on one cancellation token and the worker is joined.
//! An in-flight speak is allowed to finish its chunk, never force-aborted.

use crate::config::SpeechConfig;
use crate::{dispatch, relay};
use parley_audio::{CaptureSource, Listener, ListenerControl, Playback, TtsEngine};
use parley_core::{BusClient, BusTransport, IdentityStore};
use std::fs;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct SpeechClient {
    bus: Arc<BusClient>,
    listener: Listener,
    config: SpeechConfig,
}

impl SpeechClient {
    /// Construct every component and register all topic and event-kind
    /// bindings. Nothing is delivered until [`SpeechClient::run`].
    pub fn new(
        config: SpeechConfig,
        transport: Arc<dyn BusTransport>,
        source: Box<dyn CaptureSource>,
        control: ListenerControl,
        engine: Arc<dyn TtsEngine>,
    ) -> Self {
        let bus = Arc::new(BusClient::new(transport));
        let listener = Listener::new(source, control.clone());
        let stop_targets = config.stop_targets(engine.module_name());
        let playback = Arc::new(Playback::new(
            Arc::clone(&bus),
            control.clone(),
            engine,
        ));
        let identity = Arc::new(IdentityStore::new(&config.identity_path));

        relay::register(&listener, Arc::clone(&bus), Arc::clone(&playback));
        dispatch::register_handlers(&bus, playback, control, identity, stop_targets);

        Self {
            bus,
            listener,
            config,
        }
    }

    /// Run until the token fires or the capture source ends.
    pub async fn run(mut self, cancel: CancellationToken) {
        self.reset_display();

        let bus = Arc::clone(&self.bus);
        let bus_cancel = cancel.clone();
        let bus_worker = tokio::spawn(async move { bus.run_forever(bus_cancel).await });

        self.listener.run(cancel.clone()).await;

        // The listener is done (source ended or shutdown requested); stop
        // the bus worker the same way and wait for it.
        cancel.cancel();
        if let Err(e) = bus_worker.await {
            warn!(target: "speech", error = %e, "bus worker ended abnormally");
        }
        info!(target: "speech", "speech client stopped");
    }

    /// One-shot, best-effort reset of an attached display device. Failure
    /// is swallowed; most installations have no such device.
    fn reset_display(&self) {
        let Some(device) = &self.config.display_device else {
            return;
        };
        match fs::write(device, b"eyes.reset\n") {
            Ok(()) => debug!(target: "speech", device = %device.display(), "display reset"),
            Err(e) => {
                debug!(target: "speech", device = %device.display(), error = %e, "display reset skipped")
            }
        }
    }
}
