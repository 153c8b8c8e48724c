// Bus event type and topic names
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Topic strings shared with the rest of the ecosystem. Other bus
/// participants match on these byte-for-byte; never edit them.
pub mod topics {
    pub const RECORD_BEGIN: &str = "recognizer_loop:record_begin";
    pub const RECORD_END: &str = "recognizer_loop:record_end";
    pub const WAKEWORD: &str = "recognizer_loop:wakeword";
    pub const UTTERANCE: &str = "recognizer_loop:utterance";
    pub const AUDIO_OUTPUT_START: &str = "recognizer_loop:audio_output_start";
    pub const AUDIO_OUTPUT_END: &str = "recognizer_loop:audio_output_end";
    pub const SLEEP: &str = "recognizer_loop:sleep";
    pub const WAKE_UP: &str = "recognizer_loop:wake_up";
    pub const SPEAK: &str = "speak";
    pub const INTENT_FAILURE: &str = "multi_utterance_intent_failure";
    pub const STOP: &str = "mycroft.stop";
    pub const PAIRED: &str = "mycroft.device.paired";
}

/// One message on the bus: a topic plus a JSON object payload.
///
/// Events carry no identity beyond topic and payload. The bus guarantees
/// FIFO per publisher connection and nothing across connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    pub topic: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl BusEvent {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: Map::new(),
        }
    }

    pub fn with_payload(topic: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Sets one payload field and returns self for chaining.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    /// Reads a payload field as a string slice.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}
