//! `arq-over-udp` — a windowed ARQ sender over an unreliable datagram channel.
//!
//! # Architecture
//!
//! ```text
//!  ┌───────────┐  split once  ┌──────────────┐
//!  │  payload  │─────────────▶│ SegmentTable │
//!  └───────────┘              └──────┬───────┘
//!                                    │
//!  ┌─────────────────────────────────▼───────────────┐
//!  │                    Session                      │
//!  │  Window ── RetransmitTimer ── Teardown ── Metrics│
//!  └────┬──────────────────────────────────▲─────────┘
//!       │ data / terminal / FINACK          │ ACK / FIN
//!  ┌────▼──────────────────────────────────┴───┐
//!  │  Transport  (UdpTransport, Simulator<T>)  │
//!  └───────────────────────────────────────────┘
//! ```
//!
//! Stop-and-wait is the same engine with a window of one segment.
//!
//! Each module has a single responsibility:
//! - [`segment`]    — segmenter and per-segment bookkeeping
//! - [`frame`]      — wire format (serialise / parse)
//! - [`window`]     — sliding-window cursors and cumulative ACKs
//! - [`timer`]      — periodic retransmission sweep
//! - [`teardown`]   — terminal / ACK / FIN / FINACK handshake
//! - [`metrics`]    — throughput, mean delay, score
//! - [`state`]      — session finite-state machine
//! - [`transport`]  — datagram I/O seam and the UDP endpoint
//! - [`simulator`]  — seeded loss / duplication for experiments and tests
//! - [`session`]    — the event loop that ties it together
//! - [`trial`]      — repeated transfers with averaged results
//! - [`config`]     — sender configuration and validation
//! - [`error`]      — session error type

pub mod config;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod segment;
pub mod session;
pub mod simulator;
pub mod state;
pub mod teardown;
pub mod timer;
pub mod transport;
pub mod trial;
pub mod window;

pub use config::SenderConfig;
pub use error::SessionError;
pub use frame::{Frame, FrameError};
pub use metrics::{Metrics, TrialSummary};
pub use session::{Session, TransferReport};
pub use transport::{Transport, UdpTransport};
