//! Segmenter and segment table.
//!
//! The payload is cut into fixed-size chunks exactly once, before the first
//! transmission.  Each chunk becomes a [`Segment`] whose byte `offset` in the
//! original payload doubles as its sequence number.  The resulting
//! [`SegmentTable`] is never resized; only the per-segment bookkeeping
//! (acknowledged flag, send timestamps, transmission count) changes.
//!
//! ```text
//!  payload:  [..........................................]
//!  table:    [ seg 0 | seg 1 | seg 2 | ... | seg n-1 ]
//!  offsets:    0       c       2c            (n-1)c
//! ```
//!
//! No I/O happens here.

use std::ops::Range;
use std::time::Duration;

use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// One chunk of the source payload plus its transmission bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Byte position of the first payload byte; also the sequence number.
    pub offset: usize,
    /// Chunk bytes, never empty.
    pub payload: Vec<u8>,
    /// Set once by a covering cumulative ACK, never cleared.
    pub acknowledged: bool,
    /// Time of the very first transmission (delay accounting).
    pub first_sent_at: Option<Instant>,
    /// Time of the most recent transmission (timeout detection).
    pub last_sent_at: Option<Instant>,
    /// Number of times this segment has been put on the wire.
    pub transmissions: u32,
}

impl Segment {
    fn new(offset: usize, payload: Vec<u8>) -> Self {
        Self {
            offset,
            payload,
            acknowledged: false,
            first_sent_at: None,
            last_sent_at: None,
            transmissions: 0,
        }
    }

    /// Byte length of the chunk.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Always `false` for segments produced by [`SegmentTable::split`].
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// First byte offset *after* this chunk.  A cumulative ACK echoing a
    /// value `>= end()` covers this segment.
    pub fn end(&self) -> usize {
        self.offset + self.payload.len()
    }

    /// `true` once sent at least once and still unacknowledged.
    pub fn is_outstanding(&self) -> bool {
        self.first_sent_at.is_some() && !self.acknowledged
    }

    /// Record a (re)transmission at `now`.
    ///
    /// `first_sent_at` is written only on the first call; `last_sent_at` is
    /// refreshed every time.
    pub fn mark_sent(&mut self, now: Instant) {
        self.first_sent_at.get_or_insert(now);
        self.last_sent_at = Some(now);
        self.transmissions += 1;
    }

    /// Mark the segment acknowledged and return its delay sample
    /// (`now - first_sent_at`).
    ///
    /// A segment the peer confirms before it was ever sent is still marked
    /// acknowledged but yields no sample.  Duplicate ACKs yield nothing.
    pub fn mark_acked(&mut self, now: Instant) -> Option<Duration> {
        if self.acknowledged {
            return None;
        }
        self.acknowledged = true;
        self.first_sent_at
            .map(|first| now.saturating_duration_since(first))
    }

    /// Time since the last transmission, or `None` if never sent.
    pub fn silence(&self, now: Instant) -> Option<Duration> {
        self.last_sent_at
            .map(|sent| now.saturating_duration_since(sent))
    }
}

// ---------------------------------------------------------------------------
// SegmentTable
// ---------------------------------------------------------------------------

/// Ordered, fixed-length table of every segment in one transfer.
///
/// Invariants established by [`SegmentTable::split`]:
/// - offsets are strictly increasing and contiguous
///   (`seg[i + 1].offset == seg[i].end()`);
/// - the payload lengths sum to [`total_len`](Self::total_len);
/// - every segment is non-empty.
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    segments: Vec<Segment>,
    total_len: usize,
}

impl SegmentTable {
    /// Split `payload` into chunks of at most `chunk_size` bytes.
    ///
    /// An empty payload yields an empty table.  A payload whose length is an
    /// exact multiple of `chunk_size` has no trailing empty segment.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero; [`crate::config::SenderConfig::validate`]
    /// rejects that before a session is built.
    pub fn split(payload: &[u8], chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");
        let segments = payload
            .chunks(chunk_size)
            .enumerate()
            .map(|(i, chunk)| Segment::new(i * chunk_size, chunk.to_vec()))
            .collect();
        Self {
            segments,
            total_len: payload.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of every segment's payload length (the terminal frame's offset).
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Number of acknowledged segments.
    pub fn acknowledged(&self) -> usize {
        self.segments.iter().filter(|s| s.acknowledged).count()
    }

    /// Number of sent-but-unacknowledged segments within `range`.
    pub fn outstanding_in(&self, range: Range<usize>) -> usize {
        self.segments[range]
            .iter()
            .filter(|s| s.is_outstanding())
            .count()
    }

    /// Concatenate every payload in offset order.
    pub fn reassemble(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_len);
        for seg in &self.segments {
            out.extend_from_slice(&seg.payload);
        }
        out
    }
}

impl std::ops::Index<usize> for SegmentTable {
    type Output = Segment;

    fn index(&self, index: usize) -> &Segment {
        &self.segments[index]
    }
}

impl std::ops::IndexMut<usize> for SegmentTable {
    fn index_mut(&mut self, index: usize) -> &mut Segment {
        &mut self.segments[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn empty_payload_yields_empty_table() {
        let t = SegmentTable::split(&[], 10);
        assert!(t.is_empty());
        assert_eq!(t.total_len(), 0);
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_segment() {
        let t = SegmentTable::split(&payload(30), 10);
        assert_eq!(t.len(), 3);
        assert!(t.iter().all(|s| s.len() == 10));
    }

    #[test]
    fn offsets_are_contiguous_and_reassemble() {
        for len in [1usize, 9, 10, 11, 99, 1024, 4097] {
            for chunk in [1usize, 3, 10, 1020] {
                let data = payload(len);
                let t = SegmentTable::split(&data, chunk);
                assert_eq!(t.reassemble(), data, "len={len} chunk={chunk}");
                assert_eq!(t[0].offset, 0);
                for pair in t.iter().collect::<Vec<_>>().windows(2) {
                    assert_eq!(pair[1].offset, pair[0].end());
                }
                assert!(t.iter().all(|s| !s.is_empty() && s.len() <= chunk));
            }
        }
    }

    #[test]
    fn first_sent_is_written_once() {
        let mut t = SegmentTable::split(b"0123456789", 10);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(700);

        t[0].mark_sent(t0);
        t[0].mark_sent(t1);

        assert_eq!(t[0].first_sent_at, Some(t0));
        assert_eq!(t[0].last_sent_at, Some(t1));
        assert_eq!(t[0].transmissions, 2);
    }

    #[test]
    fn delay_is_measured_from_first_send() {
        let mut t = SegmentTable::split(b"0123456789", 10);
        let t0 = Instant::now();
        t[0].mark_sent(t0);
        t[0].mark_sent(t0 + Duration::from_millis(600));
        t[0].mark_sent(t0 + Duration::from_millis(1200));

        let delay = t[0].mark_acked(t0 + Duration::from_millis(1250));
        assert_eq!(delay, Some(Duration::from_millis(1250)));
    }

    #[test]
    fn second_ack_yields_no_sample() {
        let mut t = SegmentTable::split(b"abc", 10);
        let now = Instant::now();
        t[0].mark_sent(now);
        assert!(t[0].mark_acked(now).is_some());
        assert!(t[0].mark_acked(now).is_none());
        assert!(t[0].acknowledged);
    }

    #[test]
    fn unsent_segment_is_acked_without_sample() {
        let mut t = SegmentTable::split(b"abc", 10);
        assert!(t[0].mark_acked(Instant::now()).is_none());
        assert!(t[0].acknowledged);
        assert!(!t[0].is_outstanding());
    }
}
