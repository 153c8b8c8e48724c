//! Text-driven capture source for machines without a recognition engine
//! attached: one utterance per stdin line.
//!
//! Honors the shared flags the way a hardware engine does: input is
//! dropped while capture is muted, and while asleep everything is ignored.

use async_trait::async_trait;
use parley_audio::{CaptureSource, ListenerControl, ListenerEvent};
use std::collections::VecDeque;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

pub struct StdinSource {
    lines: Lines<BufReader<Stdin>>,
    control: ListenerControl,
    pending: VecDeque<ListenerEvent>,
}

impl StdinSource {
    pub fn new(control: ListenerControl) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            control,
            pending: VecDeque::new(),
        }
    }
}

#[async_trait]
impl CaptureSource for StdinSource {
    async fn next_event(&mut self) -> Option<ListenerEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    debug!(target: "speech", error = %e, "stdin read failed");
                    return None;
                }
            };
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if self.control.is_muted() || self.control.is_asleep() {
                debug!(target: "speech", "capture suspended; dropping input");
                continue;
            }
            self.pending.push_back(ListenerEvent::RecordBegin);
            self.pending.push_back(ListenerEvent::Utterance {
                utterances: vec![text.to_string()],
            });
            self.pending.push_back(ListenerEvent::RecordEnd);
        }
    }
}
