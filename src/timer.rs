//! Retransmission timer.
//!
//! Reliable delivery requires that unacknowledged segments are re-sent if no
//! ACK arrives within a bounded time.  Rather than arming one timer per
//! segment, [`RetransmitTimer`] is a periodic sweep:
//!
//! - every `sweep_interval`, scan the current window (not the whole table);
//! - resend each unacknowledged segment whose silence since its last
//!   transmission exceeds `retransmit_interval`;
//! - refresh that segment's `last_sent_at`, never its `first_sent_at`.
//!
//! A sweep costs `O(window size)` and a segment is resent at most once per
//! `retransmit_interval`.  The interval is fixed: there is no RTT estimation
//! and no back-off.

use std::time::Duration;

use tokio::time::Instant;

use crate::segment::SegmentTable;
use crate::window::Window;

/// Timeout parameters for the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    /// Silence after which an unacknowledged segment is resent.
    pub retransmit_interval: Duration,
    /// Minimum spacing between two sweeps.
    pub sweep_interval: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            retransmit_interval: Duration::from_millis(500),
            sweep_interval: Duration::from_millis(100),
        }
    }
}

/// Sweep state for one session.
#[derive(Debug, Clone)]
pub struct RetransmitTimer {
    pub config: TimerConfig,
    /// When the last sweep ran (or when the timer was started).
    last_sweep: Instant,
}

impl RetransmitTimer {
    /// Start the timer; the first sweep becomes due one interval after `now`.
    pub fn new(config: TimerConfig, now: Instant) -> Self {
        Self {
            config,
            last_sweep: now,
        }
    }

    /// `true` when more than `sweep_interval` has elapsed since the last sweep.
    pub fn sweep_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_sweep) > self.config.sweep_interval
    }

    /// Run a sweep if one is due; otherwise return nothing.
    pub fn poll(&mut self, table: &mut SegmentTable, window: &Window, now: Instant) -> Vec<usize> {
        if self.sweep_due(now) {
            self.sweep(table, window, now)
        } else {
            Vec::new()
        }
    }

    /// Scan the window unconditionally and return the expired segments.
    ///
    /// Every returned segment has already been stamped as sent at `now`.
    pub fn sweep(&mut self, table: &mut SegmentTable, window: &Window, now: Instant) -> Vec<usize> {
        self.last_sweep = now;
        let mut expired = Vec::new();
        for i in window.range(table.len()) {
            let seg = &mut table[i];
            if seg.acknowledged {
                continue;
            }
            match seg.silence(now) {
                Some(silence) if silence > self.config.retransmit_interval => {
                    seg.mark_sent(now);
                    expired.push(i);
                }
                _ => {}
            }
        }
        expired
    }
}
