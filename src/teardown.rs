//! Connection teardown handshake.
//!
//! Entered only after every data segment is acknowledged, so an ACK echoing
//! the total length can only refer to the terminal frame.
//!
//! ```text
//!  AwaitingTerminalAck ──ack(total)──▶ AwaitingFin ──fin──▶ Closed
//!        │   ▲                            │   ▲             (send FINACK once)
//!        └───┘ timeout: resend terminal   └───┘ timeout: resend terminal
//! ```
//!
//! A FIN that arrives before the terminal ACK is stale and ignored, as is a
//! repeated terminal ACK once the FIN is being awaited.  The FINACK is sent
//! exactly once; if it is lost the peer's own FIN retry gives up on its side.

use crate::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownPhase {
    AwaitingTerminalAck,
    AwaitingFin,
    Closed,
}

/// What the caller must do after feeding one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    /// The frame did not move the handshake.
    Ignored,
    /// The terminal frame was acknowledged; keep waiting for FIN.
    TerminalAcked,
    /// FIN received; send one FINACK and release the session.
    SendFinAck,
}

#[derive(Debug, Clone)]
pub struct Teardown {
    terminal_offset: i32,
    phase: TeardownPhase,
}

impl Teardown {
    /// Start the handshake for a payload of `total` bytes.
    pub fn new(total: i32) -> Self {
        Self {
            terminal_offset: total,
            phase: TeardownPhase::AwaitingTerminalAck,
        }
    }

    pub fn phase(&self) -> TeardownPhase {
        self.phase
    }

    pub fn is_closed(&self) -> bool {
        self.phase == TeardownPhase::Closed
    }

    /// The zero-length frame resent on every receive timeout until closed.
    pub fn terminal_frame(&self) -> Frame {
        Frame::terminal(self.terminal_offset)
    }

    pub fn on_frame(&mut self, frame: &Frame) -> TeardownStep {
        match (self.phase, frame) {
            (TeardownPhase::AwaitingTerminalAck, Frame::Ack { offset })
                if *offset == self.terminal_offset =>
            {
                self.phase = TeardownPhase::AwaitingFin;
                TeardownStep::TerminalAcked
            }
            (TeardownPhase::AwaitingFin, Frame::Fin { .. }) => {
                self.phase = TeardownPhase::Closed;
                TeardownStep::SendFinAck
            }
            _ => TeardownStep::Ignored,
        }
    }
}
