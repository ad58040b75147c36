//! Sender configuration.
//!
//! Defaults reproduce the reference deployment: a receiver on
//! `localhost:5001`, 1024-byte datagrams (4-byte header + 1020-byte chunk),
//! a 100-segment window, a 500 ms retransmission interval checked every
//! 100 ms, and 100 ms receive waits.

use std::time::Duration;

use thiserror::Error;

use crate::frame::HEADER_LEN;
use crate::timer::TimerConfig;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5001;
/// Datagram size the reference receiver reads.
pub const PACKET_SIZE: usize = 1024;
pub const DEFAULT_CHUNK_SIZE: usize = PACKET_SIZE - HEADER_LEN;
pub const DEFAULT_WINDOW: usize = 100;

/// Largest UDP payload over IPv4.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderConfig {
    /// Peer host name or address.
    pub host: String,
    pub port: u16,
    /// Maximum payload bytes per data frame.
    pub chunk_size: usize,
    /// Maximum outstanding segments; 1 is stop-and-wait.
    pub window_size: usize,
    /// Silence after which an unacknowledged segment is resent.
    pub retransmit_interval: Duration,
    /// Period of the retransmission sweep.
    pub sweep_interval: Duration,
    /// Upper bound on one blocking receive attempt.
    pub recv_timeout: Duration,
    /// Optional cap on transmissions per segment (and terminal frames).
    /// `None` retries forever.
    pub max_retransmits: Option<u32>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        let timer = TimerConfig::default();
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            window_size: DEFAULT_WINDOW,
            retransmit_interval: timer.retransmit_interval,
            sweep_interval: timer.sweep_interval,
            recv_timeout: Duration::from_millis(100),
            max_retransmits: None,
        }
    }
}

impl SenderConfig {
    /// The default configuration with a one-segment window.
    pub fn stop_and_wait() -> Self {
        Self {
            window_size: 1,
            ..Self::default()
        }
    }

    pub fn is_stop_and_wait(&self) -> bool {
        self.window_size == 1
    }

    pub fn timer(&self) -> TimerConfig {
        TimerConfig {
            retransmit_interval: self.retransmit_interval,
            sweep_interval: self.sweep_interval,
        }
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.chunk_size > MAX_UDP_PAYLOAD - HEADER_LEN {
            return Err(ConfigError::ChunkTooLarge(self.chunk_size));
        }
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        for (name, value) in [
            ("retransmit_interval", self.retransmit_interval),
            ("sweep_interval", self.sweep_interval),
            ("recv_timeout", self.recv_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration(name));
            }
        }
        if self.max_retransmits == Some(0) {
            return Err(ConfigError::ZeroRetryCeiling);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("peer host is empty")]
    EmptyHost,
    #[error("chunk size must be positive")]
    ZeroChunkSize,
    #[error("chunk size {0} exceeds the largest UDP datagram once the header is added")]
    ChunkTooLarge(usize),
    #[error("window size must be at least 1")]
    ZeroWindow,
    #[error("{0} must be non-zero")]
    ZeroDuration(&'static str),
    #[error("max_retransmits must be at least 1 when set")]
    ZeroRetryCeiling,
}
