//! Session finite-state machine types.
//!
//! Transitions are driven by [`crate::session::Session::run`]; this module
//! only names the states so logs and reports can refer to them.
//!
//! ```text
//!  FILLING ──initial window sent──▶ AWAITING_ACKS ──all acked──▶ TEARDOWN
//!                                                                   │
//!                                                         FINACK sent│
//!                                                                   ▼
//!                                                                CLOSED
//! ```

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Initial window being transmitted.
    #[default]
    Filling,
    /// Data phase: ACKs slide the window, sweeps resend expired segments.
    AwaitingAcks,
    /// Terminal frame / ACK / FIN / FINACK exchange.
    Teardown,
    /// Terminal; the transport endpoint has been released.
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Filling => "FILLING",
            SessionState::AwaitingAcks => "AWAITING_ACKS",
            SessionState::Teardown => "TEARDOWN",
            SessionState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_filling() {
        assert_eq!(SessionState::default(), SessionState::Filling);
    }

    #[test]
    fn display_names() {
        assert_eq!(SessionState::AwaitingAcks.to_string(), "AWAITING_ACKS");
        assert_eq!(SessionState::Closed.to_string(), "CLOSED");
    }
}
