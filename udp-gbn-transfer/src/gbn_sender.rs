//! Go-Back-N send-side state machine.
//!
//! [`GbnSender`] tracks the window of segment numbers the server may transmit
//! in the current pass and the cumulative ACK it has derived from replies.
//!
//! # Protocol contract
//!
//! - A pass covers `[base, base + window_size)`.  Each segment in the pass is
//!   sent and its ACK awaited before the next one goes out, so the window
//!   bounds the number of send/ack rounds per pass, not the number of
//!   segments in flight.
//! - A reply is adopted only when it is exactly `last_ack + 1`; any other
//!   value (stale, duplicate, garbled, far ahead) is ignored.
//! - After a pass, `base = last_ack + 1`.  Segments that were not
//!   acknowledged are sent again in the next pass (go back to N).
//! - The transfer is complete once a short read has been acknowledged.
//!
//! This module only manages state; all socket and file I/O is the caller's
//! responsibility.

use std::ops::Range;

use crate::segment::SeqNum;

/// Largest window whose segment numbers fit in a [`SeqNum`].
pub const MAX_WINDOW_SIZE: usize = SeqNum::MAX as usize;

// ---------------------------------------------------------------------------
// GbnSender
// ---------------------------------------------------------------------------

/// Go-Back-N send-side state for one transfer.
///
/// # Segment-number layout
///
/// ```text
///   last_ack  base            base + window_size
///      │       │                     │
///  ────┼───────┼─────────────────────┼──────────▶ segment numbers
///      │ acked │ <── this pass ────▶ │
/// ```
#[derive(Debug)]
pub struct GbnSender {
    /// First segment of the current pass.
    base: SeqNum,

    /// Number of send/ack rounds per pass (N ≥ 1).
    window_size: usize,

    /// Highest segment the receiver has acknowledged in order.
    last_ack: Option<SeqNum>,

    /// Bytes per full chunk; reads shorter than this mark EOF.
    chunk_capacity: usize,

    complete: bool,
}

impl GbnSender {
    /// Create a sender positioned at segment 0.
    ///
    /// # Panics
    ///
    /// Panics if `window_size` or `chunk_capacity` is zero, or if
    /// `window_size` exceeds [`MAX_WINDOW_SIZE`]; configuration validation
    /// rejects these before a transfer starts.
    pub fn new(window_size: usize, chunk_capacity: usize) -> Self {
        assert!(window_size >= 1, "window_size must be at least 1");
        assert!(
            window_size <= MAX_WINDOW_SIZE,
            "window_size must not exceed {MAX_WINDOW_SIZE}"
        );
        assert!(chunk_capacity >= 1, "chunk_capacity must be at least 1");
        Self {
            base: 0,
            window_size,
            last_ack: None,
            chunk_capacity,
            complete: false,
        }
    }

    pub fn base(&self) -> SeqNum {
        self.base
    }

    pub fn last_ack(&self) -> Option<SeqNum> {
        self.last_ack
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Segment numbers eligible for transmission in the current pass.
    pub fn window(&self) -> Range<SeqNum> {
        let span = SeqNum::try_from(self.window_size).unwrap_or(SeqNum::MAX);
        let end = self.base.saturating_add(span);
        self.base..end
    }

    /// File offset of segment `seq`.
    pub fn offset(&self, seq: SeqNum) -> u64 {
        u64::from(seq) * self.chunk_capacity as u64
    }

    pub fn chunk_capacity(&self) -> usize {
        self.chunk_capacity
    }

    /// Process the ACK reply to the segment just sent.
    ///
    /// Returns `true` when the reply advanced `last_ack`.
    pub fn on_ack(&mut self, ack: Option<SeqNum>) -> bool {
        let next = self.last_ack.map_or(0, |a| a.wrapping_add(1));
        match ack {
            Some(a) if a == next => {
                self.last_ack = Some(a);
                true
            }
            _ => false,
        }
    }

    /// Completion test after segment `seq` carrying `bytes_read` bytes.
    ///
    /// Returns `true` (and latches completion) when `seq` was a short read
    /// and has been acknowledged.  The caller stops the pass immediately.
    pub fn check_complete(&mut self, seq: SeqNum, bytes_read: usize) -> bool {
        if bytes_read < self.chunk_capacity && self.last_ack == Some(seq) {
            self.complete = true;
        }
        self.complete
    }

    /// End the current pass: the next pass starts just past `last_ack`.
    pub fn slide(&mut self) {
        self.base = self.last_ack.map_or(0, |a| a.wrapping_add(1));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
