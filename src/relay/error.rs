use thiserror::Error;

use super::Geometry;

/// Capture-side open failure: connection, stream negotiation or decoder
/// selection. Recoverable through the reconnect supervisor.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct OpenError {
    pub reason: String,
}

impl OpenError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Capture-side read failure. Either terminates the stream (`Eof`) or
/// reports a hard decode error; transient need-more conditions never
/// surface here.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("end of stream")]
    Eof,
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("source is not open")]
    NotOpen,
}

/// Sink-side initialization failure: allocation, encoder negotiation or
/// header write. Always fatal; there is no sink reconnection.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct InitError {
    pub reason: String,
}

impl InitError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Sink-side push failure. Geometry mismatches are reported distinctly
/// from codec and transport faults since they indicate a configuration
/// change rather than a transient error.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("frame is {actual}, sink negotiated {expected}")]
    SizeMismatch { expected: Geometry, actual: Geometry },
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("encoder produced no output after {attempts} attempts")]
    EncoderStalled { attempts: u32 },
    #[error("transport write failed: {0}")]
    Write(String),
    #[error("sink is closed")]
    Closed,
}

/// Terminal relay outcome. Push failures pass through; capture failures
/// only appear once the supervisor has given up.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("source reconnect failed after {attempts} attempt(s): {reason}")]
    ReconnectFailed { attempts: u32, reason: String },
    #[error("source geometry changed from {expected} to {actual}")]
    GeometryChanged { expected: Geometry, actual: Geometry },
    #[error(transparent)]
    Push(#[from] PushError),
}
