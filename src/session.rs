//! Sender session: segment table + window + sweep timer + teardown.
//!
//! # Architecture
//!
//! ```text
//!  payload ──split──▶ SegmentTable
//!                         │
//!  Session::run           ▼
//!    ├── Window          (cursors, cumulative ACKs)
//!    ├── RetransmitTimer (periodic sweep of the window)
//!    ├── Teardown        (terminal / ACK / FIN / FINACK)
//!    ├── MetricsCollector
//!    └── T: Transport    (exclusively owned, released at CLOSED)
//! ```
//!
//! The event loop is single-threaded and cooperative: each iteration is one
//! bounded receive attempt followed by a sweep check.  Only this loop ever
//! touches the segment table, so no locking is needed.
//!
//! ```ignore
//! let transport = UdpTransport::open("localhost", 5001).await?;
//! let report = Session::new(transport, payload, &SenderConfig::default())?
//!     .run()
//!     .await?;
//! println!("{}", report.metrics);
//! ```

use std::time::Duration;

use tokio::time::Instant;

use crate::config::SenderConfig;
use crate::error::SessionError;
use crate::frame::{self, Frame};
use crate::metrics::{Metrics, MetricsCollector};
use crate::segment::SegmentTable;
use crate::state::SessionState;
use crate::teardown::{Teardown, TeardownStep};
use crate::timer::{RetransmitTimer, TimerConfig};
use crate::transport::Transport;
use crate::window::Window;

// ---------------------------------------------------------------------------
// TransferReport
// ---------------------------------------------------------------------------

/// Everything one completed session measured.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    pub metrics: Metrics,
    /// Delay samples behind `metrics.mean_delay`; one per acknowledged segment.
    pub delay_samples: usize,
    pub bytes: usize,
    pub segments: usize,
    /// Data frames put on the wire, first sends and resends together.
    pub transmissions: u64,
    pub retransmissions: u64,
    /// Well-formed ACK frames received during the data phase.
    pub acks_received: u64,
    /// Inbound frames discarded as undecodable.
    pub malformed_frames: u64,
    /// Terminal frames sent during teardown.
    pub terminal_frames: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
struct Counters {
    transmissions: u64,
    retransmissions: u64,
    acks_received: u64,
    malformed_frames: u64,
    terminal_frames: u32,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One transfer of one payload to one peer.
pub struct Session<T> {
    state: SessionState,
    transport: T,
    table: SegmentTable,
    window: Window,
    recv_timeout: Duration,
    timer_config: TimerConfig,
    max_retransmits: Option<u32>,
    metrics: MetricsCollector,
    counters: Counters,
}

impl<T: Transport> Session<T> {
    /// Validate `config`, segment `payload` and take ownership of `transport`.
    pub fn new(transport: T, payload: &[u8], config: &SenderConfig) -> Result<Self, SessionError> {
        config.validate()?;
        if i32::try_from(payload.len()).is_err() {
            return Err(SessionError::PayloadTooLarge(payload.len()));
        }
        let table = SegmentTable::split(payload, config.chunk_size);
        log::debug!(
            "[arq] {} bytes in {} segment(s) of ≤{} bytes, window={}",
            table.total_len(),
            table.len(),
            config.chunk_size,
            config.window_size
        );
        Ok(Self {
            state: SessionState::default(),
            transport,
            table,
            window: Window::new(config.window_size),
            recv_timeout: config.recv_timeout,
            timer_config: config.timer(),
            max_retransmits: config.max_retransmits,
            metrics: MetricsCollector::new(),
            counters: Counters::default(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn table(&self) -> &SegmentTable {
        &self.table
    }

    /// Drive the transfer to CLOSED and return its report.
    ///
    /// Consumes the session; the transport is dropped (and its port released)
    /// when this returns.
    pub async fn run(mut self) -> Result<TransferReport, SessionError> {
        let started = Instant::now();

        self.data_phase(started).await?;

        self.enter(SessionState::Teardown);
        self.teardown().await?;
        let elapsed = started.elapsed();
        self.enter(SessionState::Closed);

        let metrics = self.metrics.finish(self.table.total_len(), elapsed);
        log::info!(
            "[arq] closed: {} bytes in {:.3}s, {} retransmission(s), mean delay {:.4}s",
            self.table.total_len(),
            elapsed.as_secs_f64(),
            self.counters.retransmissions,
            metrics.mean_delay
        );
        Ok(TransferReport {
            metrics,
            delay_samples: self.metrics.samples(),
            bytes: self.table.total_len(),
            segments: self.table.len(),
            transmissions: self.counters.transmissions,
            retransmissions: self.counters.retransmissions,
            acks_received: self.counters.acks_received,
            malformed_frames: self.counters.malformed_frames,
            terminal_frames: self.counters.terminal_frames,
            elapsed,
        })
    }

    // -----------------------------------------------------------------------
    // Data phase
    // -----------------------------------------------------------------------

    async fn data_phase(&mut self, started: Instant) -> Result<(), SessionError> {
        let mut timer = RetransmitTimer::new(self.timer_config, started);

        self.enter(SessionState::Filling);
        let batch = self.window.fill(&mut self.table, started);
        self.transmit(&batch).await?;
        self.enter(SessionState::AwaitingAcks);

        while !self.window.is_complete(&self.table) {
            if let Some(datagram) = self.transport.recv_timeout(self.recv_timeout).await? {
                self.on_datagram(&datagram).await?;
            }

            let now = Instant::now();
            let expired = timer.poll(&mut self.table, &self.window, now);
            if !expired.is_empty() {
                self.check_retry_ceiling(&expired)?;
                log::debug!("[arq] sweep: resending {} segment(s)", expired.len());
                self.counters.retransmissions += expired.len() as u64;
                self.transmit(&expired).await?;
            }
        }
        Ok(())
    }

    async fn on_datagram(&mut self, datagram: &[u8]) -> Result<(), SessionError> {
        match Frame::parse_control(datagram) {
            Ok(Frame::Ack { offset }) => {
                self.counters.acks_received += 1;
                let outcome = self.window.on_ack(&mut self.table, offset, Instant::now());
                if outcome.advanced {
                    log::debug!(
                        "[arq] ← ACK {offset}: {} newly acked, {}/{} done, left_edge={}",
                        outcome.newly_acked(),
                        self.table.acknowledged(),
                        self.table.len(),
                        self.window.left_edge()
                    );
                }
                self.metrics.extend(outcome.delays);
                self.transmit(&outcome.to_send).await?;
            }
            Ok(other) => {
                log::debug!("[arq] ignoring {other:?} during data phase");
            }
            Err(e) => {
                self.counters.malformed_frames += 1;
                log::warn!("[arq] discarding malformed frame: {e}");
            }
        }
        Ok(())
    }

    /// Put the given (already stamped) segments on the wire.
    async fn transmit(&mut self, indices: &[usize]) -> Result<(), SessionError> {
        for &i in indices {
            let seg = &self.table[i];
            let bytes = frame::encode_data(frame::wire_offset(seg.offset)?, &seg.payload);
            self.transport.send(&bytes).await?;
            self.counters.transmissions += 1;
            log::trace!(
                "[arq] → DATA offset={} len={} tx={}",
                seg.offset,
                seg.len(),
                seg.transmissions
            );
        }
        Ok(())
    }

    fn check_retry_ceiling(&self, expired: &[usize]) -> Result<(), SessionError> {
        let Some(max) = self.max_retransmits else {
            return Ok(());
        };
        for &i in expired {
            let seg = &self.table[i];
            // The sweep has already counted the resend it is asking for.
            let made = seg.transmissions - 1;
            if made > max {
                return Err(SessionError::RetriesExhausted {
                    offset: seg.offset,
                    attempts: made,
                });
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    async fn teardown(&mut self) -> Result<(), SessionError> {
        let total = frame::wire_offset(self.table.total_len())?;
        let mut handshake = Teardown::new(total);
        let terminal = handshake.terminal_frame().encode();

        self.send_terminal(&terminal).await?;
        while !handshake.is_closed() {
            let Some(datagram) = self.transport.recv_timeout(self.recv_timeout).await? else {
                if let Some(max) = self.max_retransmits {
                    if self.counters.terminal_frames > max {
                        return Err(SessionError::TeardownExhausted(self.counters.terminal_frames));
                    }
                }
                self.send_terminal(&terminal).await?;
                continue;
            };

            let frame = match Frame::parse_control(&datagram) {
                Ok(frame) => frame,
                Err(e) => {
                    self.counters.malformed_frames += 1;
                    log::warn!("[teardown] discarding malformed frame: {e}");
                    continue;
                }
            };

            match handshake.on_frame(&frame) {
                TeardownStep::TerminalAcked => {
                    log::debug!("[teardown] ← ACK {total} for terminal frame; awaiting FIN");
                }
                TeardownStep::SendFinAck => {
                    log::debug!("[teardown] ← FIN; → FINACK");
                    self.transport.send(&Frame::FinAck.encode()).await?;
                }
                TeardownStep::Ignored => {
                    log::trace!("[teardown] ignoring {frame:?} in {:?}", handshake.phase());
                }
            }
        }
        Ok(())
    }

    async fn send_terminal(&mut self, terminal: &[u8]) -> Result<(), SessionError> {
        self.transport.send(terminal).await?;
        self.counters.terminal_frames += 1;
        log::trace!("[teardown] → terminal #{}", self.counters.terminal_frames);
        Ok(())
    }

    fn enter(&mut self, next: SessionState) {
        if self.state != next {
            log::info!("[arq] {} → {}", self.state, next);
            self.state = next;
        }
    }
}
