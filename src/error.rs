//-----------------------------------------------------------------------------
// Module error
// Error taxonomy of the communication core

use thiserror::Error;

use crate::event::EventType;

/// Result type of all fallible vnetlink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by synchronous operations
/// Asynchronous failures (buffer overflows, decode errors on reader threads) are never returned, they are recorded in the event store
#[derive(Error, Debug)]
pub enum Error {
    /// A request was rejected before any I/O, e.g. misaligned or oversized disk read
    #[error("validation error: {0}")]
    Validation(&'static str),

    /// A frame could not be decoded, or a response did not decode as expected
    #[error("decode error: {0}")]
    Decode(&'static str),

    /// A message could not be encoded, a value exceeds its field width
    #[error("encode error: {0}")]
    Encode(&'static str),

    /// A response would exceed the requested amount
    #[error("overflow: {0}")]
    Overflow(&'static str),

    /// A transaction wait expired
    #[error("timeout after {0} ms")]
    Timeout(u128),

    /// The transport failed to write or read
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A configuration file could not be loaded or saved
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Get the event type used when this error is raised into an error slot
    pub fn event_type(&self) -> EventType {
        match self {
            Error::Validation(_) => EventType::ParameterOutOfRange,
            Error::Decode(_) => EventType::PacketDecodingError,
            Error::Encode(_) => EventType::PacketEncodingError,
            Error::Overflow(_) => EventType::ResponseOverflow,
            Error::Timeout(_) => EventType::Timeout,
            Error::Transport(_) => EventType::TransportError,
            Error::Config(_) => EventType::ConfigError,
        }
    }
}

//-------------------------------------------------------------------------------------------------
// Test module
