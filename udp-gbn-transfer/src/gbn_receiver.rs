//! Go-Back-N receive-side state machine.
//!
//! [`GbnReceiver`] implements the client half of the transfer:
//!
//! - A segment is **accepted** only when its number is `last_ack + 1` *and*
//!   its declared checksum matches the payload.
//! - Anything else (gap, duplicate, corruption) is **silently discarded**;
//!   `last_ack` and the sink are left untouched.
//! - After every segment, accepted or not, the caller replies with the
//!   **cumulative ACK** [`GbnReceiver::last_ack`].
//! - A short segment (payload below the chunk capacity) ends the transfer,
//!   but only once it has itself been accepted.
//!
//! This module only manages state; all socket and file I/O is the caller's
//! responsibility.

use crate::segment::{Segment, SeqNum};

/// Why a segment was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discard {
    /// Declared checksum does not match the received payload.
    Corrupt,
    /// Number is not `last_ack + 1` (gap or duplicate).
    OutOfOrder { expected: SeqNum },
}

/// Result of feeding one segment to the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Payload is the next in-order chunk and must be appended to the sink.
    Accepted,
    Discarded(Discard),
}

/// What the caller does after one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub verdict: Verdict,
    /// Cumulative ACK to send back (`None` is sent as `-1`).
    pub ack: Option<SeqNum>,
    /// The transfer is finished; no further segments are expected.
    pub complete: bool,
}

/// Go-Back-N receive-side state for one transfer.
#[derive(Debug)]
pub struct GbnReceiver {
    /// Highest contiguously accepted segment number, `None` before the first.
    last_ack: Option<SeqNum>,
    /// Chunk capacity agreed with the sender; shorter payloads mark EOF.
    chunk_capacity: usize,
    complete: bool,
}

impl GbnReceiver {
    /// Create a receiver for a fresh transfer (`last_ack = -1`).
    pub fn new(chunk_capacity: usize) -> Self {
        Self {
            last_ack: None,
            chunk_capacity,
            complete: false,
        }
    }

    /// Cumulative ACK to place in the next reply.
    pub fn last_ack(&self) -> Option<SeqNum> {
        self.last_ack
    }

    /// Next segment number that would be accepted.
    pub fn expected(&self) -> SeqNum {
        self.last_ack.map_or(0, |a| a.wrapping_add(1))
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Process segment `seq`.
    ///
    /// On [`Verdict::Accepted`] the caller must append `segment.payload` to
    /// the sink before handling the next segment.
    pub fn on_segment(&mut self, seq: SeqNum, segment: &Segment) -> Outcome {
        let verdict = if self.complete || seq != self.expected() {
            Verdict::Discarded(Discard::OutOfOrder {
                expected: self.expected(),
            })
        } else if !segment.is_intact() {
            Verdict::Discarded(Discard::Corrupt)
        } else {
            self.last_ack = Some(seq);
            Verdict::Accepted
        };

        if segment.payload.len() < self.chunk_capacity && self.last_ack == Some(seq) {
            self.complete = true;
        }

        Outcome {
            verdict,
            ack: self.last_ack,
            complete: self.complete,
        }
    }

    /// Reply for a datagram that could not be decoded at all.
    ///
    /// Nothing moves; the caller re-announces the current ACK.
    pub fn on_malformed(&self) -> Option<SeqNum> {
        self.last_ack
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
