//! Session-level error type.
//!
//! Per-segment problems (corruption, gaps, duplicates) are not errors; the
//! state machines report them as discards and the protocol heals them by
//! retransmission.  [`TransferError`] covers what ends a session.

use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    /// Socket or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The peer answered with a token that does not fit the exchange.
    #[error("unexpected reply from {peer}: {reply:?}")]
    UnexpectedReply { peer: SocketAddr, reply: String },
    /// Rejected configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// No reply within the configured deadline.
    #[error("peer {0} stopped responding")]
    PeerUnresponsive(SocketAddr),
}

impl TransferError {
    pub(crate) fn unexpected(peer: SocketAddr, reply: &[u8]) -> Self {
        Self::UnexpectedReply {
            peer,
            reply: String::from_utf8_lossy(reply).trim_end_matches('\0').to_owned(),
        }
    }
}
