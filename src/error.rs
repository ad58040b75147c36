//! Session-level error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::frame::FrameError;

/// Everything that can end a session early.
///
/// Receive timeouts, malformed frames and stale ACKs are not errors; they
/// are handled inside the event loop.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The transport endpoint became unusable.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    /// Offsets are carried in a signed 4-byte header.
    #[error("payload of {0} bytes cannot be addressed by a 4-byte signed offset")]
    PayloadTooLarge(usize),
    #[error("could not resolve peer address {0}")]
    NoPeerAddress(String),
    /// Only raised when `max_retransmits` is configured.
    #[error("segment at offset {offset} still unacknowledged after {attempts} transmissions")]
    RetriesExhausted { offset: usize, attempts: u32 },
    /// Only raised when `max_retransmits` is configured.
    #[error("teardown abandoned after {0} terminal frames")]
    TeardownExhausted(u32),
}
