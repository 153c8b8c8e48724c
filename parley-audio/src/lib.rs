// Audio-side components of the coordinator: speech output and the
// recognition-loop boundary.

pub mod listener;
pub mod playback;
pub mod segment;
pub mod tts;

pub use listener::{
    CaptureSource, ChannelSource, Listener, ListenerControl, ListenerEvent, ListenerEventHandler,
    ListenerEventKind, ListenerFeed,
};
pub use playback::Playback;
pub use segment::{split_sentences, Segmenter};
pub use tts::{kill_audio_processes, SubprocessTts, TtsConfig, TtsEngine};
