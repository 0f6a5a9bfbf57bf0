//! Wire-format definitions for data segments.
//!
//! Every file chunk crosses the wire as **two** datagrams:
//!
//! 1. a *sequence message* carrying the segment number as decimal ASCII, and
//! 2. a *data segment* carrying the payload followed by its checksum.
//!
//! ACK replies reuse the decimal form of the sequence message, with `-1`
//! meaning "nothing accepted yet".
//!
//! No I/O happens here.
//!
//! # Data segment layout
//!
//! ```text
//!  0                                   len(payload)      +8
//! +-------------------------------------+-----------------+
//! |            Payload ...              | CRC-32 as hex   |
//! |      (at most CHUNK_CAPACITY)       | ASCII, 8 bytes  |
//! +-------------------------------------+-----------------+
//! ```
//!
//! The checksum covers the payload only, never the sequence number.  The hex
//! field is always zero-padded to [`CHECKSUM_FIELD_WIDTH`] so encode and
//! decode agree on its position.

use thiserror::Error;

/// Segment number on the wire.  Assigned from 0 for every transfer.
pub type SeqNum = u32;

/// Default number of file bytes carried per segment.
pub const CHUNK_CAPACITY: usize = 504;

/// Width of the trailing hex checksum field.
pub const CHECKSUM_FIELD_WIDTH: usize = 8;

/// Largest datagram a default-sized segment produces.
pub const MAX_SEGMENT_LEN: usize = CHUNK_CAPACITY + CHECKSUM_FIELD_WIDTH;

/// Wire form of an ACK before any segment has been accepted.
const NO_ACK: &str = "-1";

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Datagram shorter than the trailing checksum field.
    #[error("segment of {0} bytes is shorter than the checksum field")]
    TooShort(usize),
    /// Sequence or ACK message is not a decimal integer in range.
    #[error("malformed number message {0:?}")]
    BadNumber(String),
}

/// A decoded data segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub payload: Vec<u8>,
    /// Raw contents of the trailing checksum field.
    pub declared: [u8; CHECKSUM_FIELD_WIDTH],
}

impl Segment {
    /// Serialise `payload` with `checksum` appended as fixed-width hex.
    ///
    /// `checksum` is taken as given: the sender may have perturbed it, so it
    /// is not recomputed here.
    pub fn encode(payload: &[u8], checksum: u32) -> Vec<u8> {
        let mut buf = Vec::with_capacity(payload.len() + CHECKSUM_FIELD_WIDTH);
        buf.extend_from_slice(payload);
        buf.extend_from_slice(format!("{checksum:08x}").as_bytes());
        buf
    }

    /// Split a raw datagram into payload and declared checksum field.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.len() < CHECKSUM_FIELD_WIDTH {
            return Err(CodecError::TooShort(buf.len()));
        }
        let split = buf.len() - CHECKSUM_FIELD_WIDTH;
        let mut declared = [0u8; CHECKSUM_FIELD_WIDTH];
        declared.copy_from_slice(&buf[split..]);
        Ok(Self {
            payload: buf[..split].to_vec(),
            declared,
        })
    }

    /// The declared checksum, or `None` when the field is not valid hex.
    pub fn declared_checksum(&self) -> Option<u32> {
        let text = std::str::from_utf8(&self.declared).ok()?;
        u32::from_str_radix(text, 16).ok()
    }

    /// Checksum of the payload as received.
    pub fn computed_checksum(&self) -> u32 {
        checksum(&self.payload)
    }

    /// `true` when the declared field matches the received payload.
    pub fn is_intact(&self) -> bool {
        self.declared_checksum() == Some(self.computed_checksum())
    }

    /// Length of this segment on the wire.
    pub fn wire_len(&self) -> usize {
        self.payload.len() + CHECKSUM_FIELD_WIDTH
    }
}

/// CRC-32 (IEEE) over `payload`.
pub fn checksum(payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}

/// Wire form of a sequence message.
pub fn encode_seq(seq: SeqNum) -> Vec<u8> {
    seq.to_string().into_bytes()
}

/// Parse a sequence message.
pub fn decode_seq(buf: &[u8]) -> Result<SeqNum, CodecError> {
    let text = number_text(buf);
    text.parse()
        .map_err(|_| CodecError::BadNumber(text.to_owned()))
}

/// Wire form of a cumulative ACK; `None` is sent as `-1`.
pub fn encode_ack(last_ack: Option<SeqNum>) -> Vec<u8> {
    match last_ack {
        Some(seq) => encode_seq(seq),
        None => NO_ACK.as_bytes().to_vec(),
    }
}

/// Parse a cumulative ACK reply.
pub fn decode_ack(buf: &[u8]) -> Result<Option<SeqNum>, CodecError> {
    if number_text(buf) == NO_ACK {
        return Ok(None);
    }
    decode_seq(buf).map(Some)
}

/// Number text with trailing NULs and whitespace stripped.
///
/// Peers that send fixed-size, zero-filled buffers are tolerated.
fn number_text(buf: &[u8]) -> &str {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    std::str::from_utf8(&buf[..end]).unwrap_or("").trim()
}
