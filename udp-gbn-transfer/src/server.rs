//! Server role: answers filename requests and sends files with Go-Back-N.
//!
//! # Exchange
//!
//! ```text
//!  client                                   server
//!    │ ── "notes.txt" ───────────────────────▶ │  AwaitingRequest
//!    │ ◀──────────────────────────────── "OK" ─ │  ServingDecision
//!    │ ── "OK" ──────────────────────────────▶ │
//!    │ ◀──────────────────────────────── "0" ── │  Sending
//!    │ ◀──────────────── payload + crc32 hex ── │
//!    │ ── "0" (cumulative ACK) ──────────────▶ │
//!    │                 ...                      │
//!    │ ── "exit" ────────────────────────────▶ │
//!    │ ◀────────────────────────────── "exit" ─ │
//! ```
//!
//! One session is served at a time.  While a transfer is in progress,
//! datagrams from any address other than the requesting client are dropped.

use std::io::{self, SeekFrom};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

use crate::config::ServerConfig;
use crate::control::{self, Reply, Request};
use crate::error::TransferError;
use crate::gbn_sender::GbnSender;
use crate::injector::ErrorInjector;
use crate::segment::{self, Segment, SeqNum};
use crate::socket::{recv_within, Socket, Transport};
use crate::state::ServerState;

/// Statistics for one completed file transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReport {
    /// File bytes delivered.
    pub bytes: u64,
    /// Distinct segments in the file (including a trailing empty one).
    pub segments: u32,
    /// Data segments put on the wire, first sends and resends.
    pub transmissions: u64,
    /// Window passes run.
    pub passes: u64,
    pub elapsed: Duration,
}

impl SendReport {
    /// Data segments sent more than once.
    pub fn retransmissions(&self) -> u64 {
        self.transmissions.saturating_sub(u64::from(self.segments))
    }
}

/// What happened to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Served {
    /// Client sent `exit`; the server has answered and stops.
    Exit,
    /// File was sent completely.
    Sent { name: String, report: SendReport },
    /// File does not exist under the root; `NULL` was sent.
    NotFound { name: String },
    /// Client did not answer the offer with `OK`.
    Declined { name: String },
    /// Datagram was not a usable request.
    Ignored,
}

/// Outcome of waiting for one ACK.
enum AckWait {
    Reply(Option<SeqNum>),
    Garbled,
    Silent,
}

/// File server bound to one transport.
pub struct Server<T = Socket> {
    transport: T,
    config: ServerConfig,
    injector: ErrorInjector,
    state: ServerState,
}

impl<T: Transport> Server<T> {
    /// Server whose error injector is seeded from the OS.
    pub fn new(transport: T, config: ServerConfig) -> Result<Self, TransferError> {
        let config = config.validated()?;
        let injector = ErrorInjector::from_os_rng(config.error_probability);
        Ok(Self::with_injector(transport, config, injector))
    }

    /// Server with a deterministic error injector.
    pub fn seeded(transport: T, config: ServerConfig, seed: u64) -> Result<Self, TransferError> {
        let config = config.validated()?;
        let injector = ErrorInjector::seeded(config.error_probability, seed);
        Ok(Self::with_injector(transport, config, injector))
    }

    fn with_injector(transport: T, config: ServerConfig, injector: ErrorInjector) -> Self {
        Self {
            transport,
            config,
            injector,
            state: ServerState::AwaitingRequest,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve requests until a client sends `exit`.
    ///
    /// A transfer abandoned because the client went silent is logged and the
    /// server returns to waiting for requests; transport and file errors
    /// end the loop.
    pub async fn run(&mut self) -> Result<(), TransferError> {
        loop {
            match self.serve_one().await {
                Ok(Served::Exit) => return Ok(()),
                Ok(_) => {}
                Err(TransferError::PeerUnresponsive(peer)) => {
                    log::warn!("[server] {peer} stopped responding; session abandoned");
                    self.state = ServerState::AwaitingRequest;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Wait for one request and handle it to completion.
    pub async fn serve_one(&mut self) -> Result<Served, TransferError> {
        self.state = ServerState::AwaitingRequest;
        let (buf, peer) = self.transport.recv_from().await?;

        let name = match Request::decode(&buf) {
            Some(Request::Exit) => {
                log::info!("[server] {peer} requested exit");
                self.transport.send_to(Reply::Exit.encode(), peer).await?;
                return Ok(Served::Exit);
            }
            Some(Request::File(name)) => name,
            None => {
                log::debug!("[server] ignoring empty request from {peer}");
                return Ok(Served::Ignored);
            }
        };
        log::info!("[server] {peer} requested {name:?}");

        let mut source = match self.open(&name).await {
            Some(file) => file,
            None => {
                log::info!("[server] {name:?} not found");
                self.transport.send_to(Reply::NotFound.encode(), peer).await?;
                return Ok(Served::NotFound { name });
            }
        };

        self.state = ServerState::ServingDecision;
        self.transport.send_to(Reply::Found.encode(), peer).await?;
        if !self.await_begin(peer).await? {
            log::warn!("[server] {peer} declined {name:?}");
            self.state = ServerState::AwaitingRequest;
            return Ok(Served::Declined { name });
        }

        let report = self.send_file(&mut source, peer).await?;
        log::info!(
            "[server] sent {name:?} ({} bytes, {} segments, {} resent) in {:.3}s",
            report.bytes,
            report.segments,
            report.retransmissions(),
            report.elapsed.as_secs_f64()
        );
        Ok(Served::Sent { name, report })
    }

    /// Run the Go-Back-N sender over `source` towards `peer`.
    ///
    /// Each segment is sent as a sequence message followed by the data
    /// segment, and its ACK is awaited before the next segment goes out.
    pub async fn send_file<S>(
        &mut self,
        source: &mut S,
        peer: SocketAddr,
    ) -> Result<SendReport, TransferError>
    where
        S: AsyncRead + AsyncSeek + Unpin,
    {
        self.state = ServerState::Sending;
        let started = Instant::now();
        let mut sender = GbnSender::new(self.config.window_size, self.config.chunk_capacity);
        let mut report = SendReport::default();
        let mut chunk = vec![0u8; self.config.chunk_capacity];
        let mut silent = 0u32;

        log::debug!(
            "[server] sending to {peer} window={} p_err={}",
            sender.window_size(),
            self.injector.error_probability()
        );

        while !sender.is_complete() {
            for seq in sender.window() {
                self.transport.send_to(&segment::encode_seq(seq), peer).await?;

                let n = read_chunk(source, sender.offset(seq), &mut chunk).await?;
                let crc = self.injector.apply(segment::checksum(&chunk[..n]));
                self.transport
                    .send_to(&Segment::encode(&chunk[..n], crc), peer)
                    .await?;
                report.transmissions += 1;
                log::debug!("[server] → SEG seq={seq} len={n} crc={crc:08x}");

                match self.await_ack(peer).await? {
                    AckWait::Reply(ack) => {
                        silent = 0;
                        let advanced = sender.on_ack(ack);
                        log::debug!(
                            "[server] ← ACK {} (last_ack={:?}, advanced={advanced})",
                            ack.map_or(-1, i64::from),
                            sender.last_ack()
                        );
                    }
                    AckWait::Garbled => {
                        silent = 0;
                        log::debug!("[server] ← unreadable ACK ignored");
                    }
                    AckWait::Silent => {
                        silent += 1;
                        log::debug!("[server] no ACK for seq={seq} ({silent} in a row)");
                        if silent > self.config.max_retries {
                            return Err(TransferError::PeerUnresponsive(peer));
                        }
                    }
                }

                if sender.check_complete(seq, n) {
                    report.segments = seq + 1;
                    report.bytes = sender.offset(seq) + n as u64;
                    break;
                }
            }
            report.passes += 1;
            sender.slide();
        }

        report.elapsed = started.elapsed();
        self.state = ServerState::Done;
        Ok(report)
    }

    /// Resolve `name` under the root and open it for reading.
    ///
    /// Absolute paths, `..` and anything that is not a regular file are
    /// treated as missing.
    async fn open(&self, name: &str) -> Option<File> {
        let path = resolve(&self.config.root, name)?;
        let meta = tokio::fs::metadata(&path).await.ok()?;
        if !meta.is_file() {
            return None;
        }
        File::open(&path).await.ok()
    }

    /// Wait for the client's answer to an offer.  `true` means `OK`.
    async fn await_begin(&self, peer: SocketAddr) -> Result<bool, TransferError> {
        loop {
            match recv_within(&self.transport, self.config.ack_timeout).await? {
                None => return Ok(false),
                Some((buf, addr)) if addr == peer => return Ok(control::is_begin(&buf)),
                Some((_, addr)) => log::debug!("[server] dropping datagram from {addr}"),
            }
        }
    }

    async fn await_ack(&self, peer: SocketAddr) -> Result<AckWait, TransferError> {
        loop {
            match recv_within(&self.transport, self.config.ack_timeout).await? {
                None => return Ok(AckWait::Silent),
                Some((buf, addr)) if addr == peer => {
                    return Ok(match segment::decode_ack(&buf) {
                        Ok(ack) => AckWait::Reply(ack),
                        Err(_) => AckWait::Garbled,
                    });
                }
                Some((_, addr)) => log::debug!("[server] dropping datagram from {addr}"),
            }
        }
    }
}

/// Map a requested name to a path under `root`.
fn resolve(root: &Path, name: &str) -> Option<PathBuf> {
    let requested = Path::new(name);
    let plain = requested
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !plain {
        return None;
    }
    Some(root.join(requested))
}

/// Read up to `buf.len()` bytes starting at `offset`.
///
/// Returns fewer bytes only at end of file.
async fn read_chunk<S>(source: &mut S, offset: u64, buf: &mut [u8]) -> io::Result<usize>
where
    S: AsyncRead + AsyncSeek + Unpin,
{
    source.seek(SeekFrom::Start(offset)).await?;
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
