//! Adjustable transfer parameters.
//!
//! Defaults mirror the classic deployment: window of one segment, no
//! injected corruption, 504-byte chunks, and no deadlines (a silent peer
//! stalls the session, which is the protocol's documented limitation).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::TransferError;
use crate::gbn_sender::MAX_WINDOW_SIZE;
use crate::injector::clamp_probability;
use crate::segment::CHUNK_CAPACITY;

/// Default UDP port for the server.
pub const DEFAULT_PORT: u16 = 8080;

/// Consecutive silent ACK waits tolerated when `ack_timeout` is set.
pub const DEFAULT_MAX_RETRIES: u32 = 6;

/// Server-side settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory requested filenames are resolved against.
    pub root: PathBuf,
    /// Send/ack rounds per Go-Back-N pass.
    pub window_size: usize,
    /// Probability in `[0, 1]` that a segment's checksum is corrupted.
    pub error_probability: f64,
    /// File bytes per segment.
    pub chunk_capacity: usize,
    /// Longest wait for one ACK; `None` waits forever.
    pub ack_timeout: Option<Duration>,
    /// Silent waits in a row before the session is abandoned.
    pub max_retries: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            window_size: 1,
            error_probability: 0.0,
            chunk_capacity: CHUNK_CAPACITY,
            ack_timeout: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ServerConfig {
    /// Clamp the error probability and reject unusable sizes.
    pub fn validated(mut self) -> Result<Self, TransferError> {
        if self.window_size == 0 {
            return Err(TransferError::InvalidConfig(
                "window size must be at least 1".into(),
            ));
        }
        if self.window_size > MAX_WINDOW_SIZE {
            return Err(TransferError::InvalidConfig(format!(
                "window size must not exceed {MAX_WINDOW_SIZE}"
            )));
        }
        check_chunk_capacity(self.chunk_capacity)?;
        self.error_probability = clamp_probability(self.error_probability);
        Ok(self)
    }
}

/// Client-side settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Directory received files are written into.
    pub out_dir: PathBuf,
    /// Must match the server's chunk capacity.
    pub chunk_capacity: usize,
    /// Longest silence tolerated while waiting for the server; `None` waits
    /// forever.
    pub idle_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            chunk_capacity: CHUNK_CAPACITY,
            idle_timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn validated(self) -> Result<Self, TransferError> {
        check_chunk_capacity(self.chunk_capacity)?;
        Ok(self)
    }
}

fn check_chunk_capacity(chunk_capacity: usize) -> Result<(), TransferError> {
    if chunk_capacity == 0 {
        return Err(TransferError::InvalidConfig(
            "chunk capacity must be at least 1".into(),
        ));
    }
    Ok(())
}
