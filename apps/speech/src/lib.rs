// Parley speech client
// Bridges the recognition loop and the message bus: relays capture events
// outward, dispatches inbound commands, and supervises both run loops.

pub mod config;
pub mod dispatch;
pub mod relay;
pub mod stdin_source;
pub mod supervisor;

pub use config::SpeechConfig;
pub use supervisor::SpeechClient;
