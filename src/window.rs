//! Sliding-window send-side state machine.
//!
//! [`Window`] keeps three cursors over a [`SegmentTable`] and decides which
//! segments may be on the wire.  A window size of 1 is stop-and-wait.
//!
//! # Protocol contract
//!
//! - At most `size` segments may be outstanding (sent, unacknowledged).
//! - ACKs are **cumulative**: an echoed offset `A` acknowledges every
//!   transmitted segment whose `end() <= A`, whatever order ACKs arrive in.
//! - Duplicate and stale ACKs are idempotent.
//! - Retransmission on timeout is per segment and lives in
//!   [`crate::timer`]; this module never resends on its own.
//!
//! This module only manages state; all socket I/O is the caller's
//! responsibility.  Methods return the table indices the caller must put on
//! the wire, and have already stamped those segments as sent at `now`.

use std::ops::Range;
use std::time::Duration;

use tokio::time::Instant;

use crate::segment::SegmentTable;

// ---------------------------------------------------------------------------
// AckOutcome
// ---------------------------------------------------------------------------

/// What one ACK did to the window.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AckOutcome {
    /// Delay samples (`now - first_sent_at`) for every newly acked segment.
    pub delays: Vec<Duration>,
    /// `true` when the left edge moved.
    pub advanced: bool,
    /// Segments that entered the window and must be transmitted now.
    pub to_send: Vec<usize>,
}

impl AckOutcome {
    /// Number of previously sent segments newly acknowledged by this ACK
    /// (one delay sample each).
    pub fn newly_acked(&self) -> usize {
        self.delays.len()
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Cursor state for one transfer.
///
/// # Cursor layout
///
/// ```text
///  left_edge        send_cursor      left_edge + size
///      │                 │                  │
///  ────┼─────────────────┼──────────────────┼──────▶ table index
///      │ <── in flight ─▶│ <── sendable ───▶│
/// ```
///
/// `left_edge <= send_cursor <= min(left_edge + size, table.len())` holds
/// after every public method returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Index of the oldest unacknowledged segment.
    left_edge: usize,
    /// Index of the next segment that has never been transmitted.
    send_cursor: usize,
    /// Maximum number of outstanding segments.
    size: usize,
}

impl Window {
    /// Create a new [`Window`].
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn new(size: usize) -> Self {
        assert!(size >= 1, "window size must be at least 1");
        Self {
            left_edge: 0,
            send_cursor: 0,
            size,
        }
    }

    pub fn left_edge(&self) -> usize {
        self.left_edge
    }

    pub fn send_cursor(&self) -> usize {
        self.send_cursor
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Exclusive upper bound of the window: `min(left_edge + size, len)`.
    pub fn limit(&self, table_len: usize) -> usize {
        self.left_edge.saturating_add(self.size).min(table_len)
    }

    /// Index range currently covered by the window.
    pub fn range(&self, table_len: usize) -> Range<usize> {
        self.left_edge..self.limit(table_len)
    }

    /// `true` once every segment has been acknowledged.
    pub fn is_complete(&self, table: &SegmentTable) -> bool {
        self.left_edge == table.len()
    }

    /// Number of sent-but-unacknowledged segments.
    pub fn in_flight(&self, table: &SegmentTable) -> usize {
        table.outstanding_in(self.left_edge..self.send_cursor)
    }

    /// Transmit every not-yet-sent segment that fits in the window.
    ///
    /// Advances `send_cursor` to the window limit and stamps each returned
    /// segment as sent at `now`.  Segments that are (unexpectedly) already
    /// acknowledged are skipped.
    pub fn fill(&mut self, table: &mut SegmentTable, now: Instant) -> Vec<usize> {
        let limit = self.limit(table.len());
        let start = self.send_cursor.max(self.left_edge);
        let batch: Vec<usize> = (start..limit)
            .filter(|&i| !table[i].acknowledged)
            .collect();
        for &i in &batch {
            table[i].mark_sent(now);
        }
        self.send_cursor = self.send_cursor.max(limit);
        batch
    }

    /// Process a cumulative ACK echoing `ack`.
    ///
    /// Acknowledges every segment ending at or before `ack`, sent or not
    /// (only sent ones yield delay samples), slides the left edge over the acknowledged prefix and, if it moved,
    /// fills the freed window space.  An ACK below the first unacknowledged
    /// segment's end, a negative ACK and a repeated ACK all return an empty
    /// outcome.
    pub fn on_ack(&mut self, table: &mut SegmentTable, ack: i32, now: Instant) -> AckOutcome {
        let mut outcome = AckOutcome::default();
        let Ok(ack) = usize::try_from(ack) else {
            return outcome;
        };

        // Everything below left_edge is already acknowledged; ends are
        // strictly increasing, so the covered segments form a prefix.
        for i in self.left_edge..table.len() {
            if table[i].end() > ack {
                break;
            }
            if let Some(delay) = table[i].mark_acked(now) {
                outcome.delays.push(delay);
            }
        }

        let before = self.left_edge;
        while self.left_edge < table.len() && table[self.left_edge].acknowledged {
            self.left_edge += 1;
        }

        if self.left_edge > before {
            outcome.advanced = true;
            self.send_cursor = self.send_cursor.max(self.left_edge);
            outcome.to_send = self.fill(table, now);
        }
        outcome
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn table(len: usize, chunk: usize) -> SegmentTable {
        SegmentTable::split(&vec![7u8; len], chunk)
    }

    #[test]
    fn initial_state() {
        let w = Window::new(4);
        assert_eq!(w.left_edge(), 0);
        assert_eq!(w.send_cursor(), 0);
        assert_eq!(w.size(), 4);
    }

    #[test]
    #[should_panic(expected = "window size must be at least 1")]
    fn zero_window_panics() {
        Window::new(0);
    }

    #[test]
    fn fill_sends_up_to_window() {
        let mut t = table(30, 10);
        let mut w = Window::new(2);
        let now = Instant::now();

        assert_eq!(w.fill(&mut t, now), vec![0, 1]);
        assert_eq!(w.send_cursor(), 2);
        assert_eq!(w.in_flight(&t), 2);
        assert!(t[2].first_sent_at.is_none());

        // Nothing new fits until an ACK arrives.
        assert!(w.fill(&mut t, now).is_empty());
    }

    #[test]
    fn oversized_window_sends_everything() {
        let mut t = table(35, 10);
        let mut w = Window::new(100);
        assert_eq!(w.limit(t.len()), 4);
        assert_eq!(w.fill(&mut t, Instant::now()), vec![0, 1, 2, 3]);
        assert_eq!(w.send_cursor(), 4);
    }

    #[test]
    fn cumulative_ack_slides_and_admits() {
        let mut t = table(30, 10);
        let mut w = Window::new(2);
        let now = Instant::now();
        w.fill(&mut t, now);

        let later = now + Duration::from_millis(40);
        let out = w.on_ack(&mut t, 20, later);
        assert_eq!(out.newly_acked(), 2);
        assert!(out.advanced);
        assert_eq!(out.to_send, vec![2]);
        assert_eq!(w.left_edge(), 2);
        assert_eq!(w.send_cursor(), 3);
        assert_eq!(out.delays, vec![Duration::from_millis(40); 2]);
    }

    #[test]
    fn partial_ack_inside_segment_is_ignored() {
        let mut t = table(30, 10);
        let mut w = Window::new(3);
        let now = Instant::now();
        w.fill(&mut t, now);

        // 15 covers segment 0 only.
        let out = w.on_ack(&mut t, 15, now);
        assert_eq!(out.newly_acked(), 1);
        assert_eq!(w.left_edge(), 1);
        assert!(!t[1].acknowledged);
    }

    #[test]
    fn duplicate_ack_is_idempotent() {
        let mut t = table(30, 10);
        let mut w = Window::new(1);
        let now = Instant::now();
        w.fill(&mut t, now);

        let first = w.on_ack(&mut t, 10, now);
        assert_eq!(first.to_send, vec![1]);

        let dup = w.on_ack(&mut t, 10, now);
        assert_eq!(dup, AckOutcome::default());
        assert_eq!(w.send_cursor(), 2);
    }

    #[test]
    fn stale_and_negative_acks_have_no_effect() {
        let mut t = table(30, 10);
        let mut w = Window::new(2);
        let now = Instant::now();
        w.fill(&mut t, now);

        assert_eq!(w.on_ack(&mut t, 0, now), AckOutcome::default());
        assert_eq!(w.on_ack(&mut t, 9, now), AckOutcome::default());
        assert_eq!(w.on_ack(&mut t, -5, now), AckOutcome::default());
        assert_eq!(w.left_edge(), 0);
    }

    #[test]
    fn ack_beyond_sent_data_covers_unsent_segments() {
        let mut t = table(30, 10);
        let mut w = Window::new(1);
        let now = Instant::now();
        w.fill(&mut t, now);

        let out = w.on_ack(&mut t, 30, now);
        let acked: Vec<bool> = t.iter().map(|s| s.acknowledged).collect();
        assert_eq!(acked, vec![true, true, true]);
        // Only the segment actually sent contributes a delay sample.
        assert_eq!(out.newly_acked(), 1);
        assert!(out.to_send.is_empty());
        assert_eq!(w.left_edge(), 3);
        assert!(w.is_complete(&t));
        assert!(t.iter().skip(1).all(|s| s.transmissions == 0));
    }

    #[test]
    fn ack_covering_part_of_unsent_tail_skips_it_on_fill() {
        let mut t = table(40, 10);
        let mut w = Window::new(2);
        let now = Instant::now();
        w.fill(&mut t, now);

        // Covers 0..30: segment 2 was never sent and must not go out.
        let out = w.on_ack(&mut t, 30, now);
        assert_eq!(out.newly_acked(), 2);
        assert_eq!(out.to_send, vec![3]);
        assert_eq!(t[2].transmissions, 0);
        assert!(t[2].acknowledged);
    }

    #[test]
    fn reordered_acks_converge_on_the_maximum() {
        let mut t = table(50, 10);
        let mut w = Window::new(5);
        let now = Instant::now();
        w.fill(&mut t, now);

        for ack in [30, 10, 30, 20, 10, 40] {
            let before = w.left_edge();
            w.on_ack(&mut t, ack, now);
            assert!(w.left_edge() >= before);
        }
        let acked: Vec<bool> = t.iter().map(|s| s.acknowledged).collect();
        assert_eq!(acked, vec![true, true, true, true, false]);
        assert_eq!(w.left_edge(), 4);
    }

    #[test]
    fn outstanding_never_exceeds_window() {
        let mut t = table(200, 10);
        let mut w = Window::new(3);
        let now = Instant::now();
        w.fill(&mut t, now);
        assert!(w.in_flight(&t) <= 3);

        for ack in (10..=200).step_by(10) {
            w.on_ack(&mut t, ack, now);
            assert!(w.in_flight(&t) <= 3, "ack={ack}");
            assert!(w.send_cursor() - w.left_edge() <= 3);
        }
        assert!(w.is_complete(&t));
    }

    #[test]
    fn empty_table_is_complete_immediately() {
        let mut t = table(0, 10);
        let mut w = Window::new(4);
        assert!(w.fill(&mut t, Instant::now()).is_empty());
        assert!(w.is_complete(&t));
    }
}
