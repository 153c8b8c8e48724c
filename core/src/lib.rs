// Parley core library
// Voice-interaction coordinator: bus events, bus client, identity store

pub mod bus;
pub mod event;
pub mod identity;

// Export core types
pub use bus::{local_pair, BusClient, BusTransport, EventHandler, LocalTransport};
pub use event::{topics, BusEvent};
pub use identity::IdentityStore;

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParleyError {
    #[error("Bus error: {0}")]
    BusError(String),

    #[error("Speech synthesis error: {0}")]
    TtsError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, ParleyError>;
