//! Client role: requests files by name and receives them with Go-Back-N.
//!
//! The client talks to a single server address and ignores datagrams from
//! anywhere else.  Every received segment is answered with the receiver's
//! cumulative ACK, whether or not the segment was accepted.

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::ClientConfig;
use crate::control::{self, Reply, Request};
use crate::error::TransferError;
use crate::gbn_receiver::{Discard, GbnReceiver, Verdict};
use crate::segment::{self, Segment};
use crate::socket::{recv_within, Socket, Transport};
use crate::state::ClientState;

/// Statistics for one received file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveReport {
    /// Bytes written to the sink.
    pub bytes: u64,
    /// Segments accepted in order.
    pub accepted: u64,
    /// Segments dropped for a checksum mismatch.
    pub corrupt: u64,
    /// Segments dropped as gaps or duplicates.
    pub out_of_order: u64,
    /// Datagrams too malformed to classify.
    pub malformed: u64,
    pub elapsed: Duration,
}

impl ReceiveReport {
    pub fn discarded(&self) -> u64 {
        self.corrupt + self.out_of_order + self.malformed
    }
}

/// Result of one file request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
    /// File received and written to `path`.
    Received { path: PathBuf, report: ReceiveReport },
    /// Server answered `NULL`.
    NotFound,
}

/// File client bound to one transport and one server.
pub struct Client<T = Socket> {
    transport: T,
    server: SocketAddr,
    config: ClientConfig,
    state: ClientState,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, server: SocketAddr, config: ClientConfig) -> Result<Self, TransferError> {
        Ok(Self {
            transport,
            server,
            config: config.validated()?,
            state: ClientState::AwaitingRequest,
        })
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// Request `name` and store it under the output directory.
    ///
    /// Only the final component of `name` is used for the local file.  A
    /// name the server would read as `exit` (or as nothing at all) is
    /// rejected with `InvalidInput` before anything is sent.
    pub async fn fetch(&mut self, name: &str) -> Result<Fetch, TransferError> {
        if !matches!(Request::decode(name.as_bytes()), Some(Request::File(_))) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{name:?} cannot be requested as a file"),
            )
            .into());
        }
        let dest = destination(&self.config.out_dir, name)?;

        self.state = ClientState::AwaitingFileDecision;
        self.transport
            .send_to(&Request::File(name.to_owned()).encode(), self.server)
            .await?;

        let reply = self.next_from_server().await?;
        match Reply::decode(&reply) {
            Some(Reply::Found) => {}
            Some(Reply::NotFound) => {
                log::info!("[client] {name:?} not found on server");
                self.state = ClientState::AwaitingRequest;
                return Ok(Fetch::NotFound);
            }
            _ => {
                self.state = ClientState::AwaitingRequest;
                return Err(TransferError::unexpected(self.server, &reply));
            }
        }

        let mut sink = match File::create(&dest).await {
            Ok(file) => file,
            Err(e) => {
                log::warn!("[client] cannot create {}: {e}; declining", dest.display());
                self.transport
                    .send_to(control::NULL.as_bytes(), self.server)
                    .await?;
                self.state = ClientState::AwaitingRequest;
                return Err(e.into());
            }
        };

        self.transport
            .send_to(control::OK.as_bytes(), self.server)
            .await?;
        log::info!("[client] receiving {name:?} into {}", dest.display());

        let report = self.receive(&mut sink).await?;
        log::info!(
            "[client] received {name:?} ({} bytes, {} discarded) in {:.3}s",
            report.bytes,
            report.discarded(),
            report.elapsed.as_secs_f64()
        );
        Ok(Fetch::Received { path: dest, report })
    }

    /// Run the Go-Back-N receiver until the final segment is accepted.
    ///
    /// Call after the server's offer has been accepted with `OK`.  Accepted
    /// payloads are appended to `sink` in order; the sink is flushed before
    /// returning.
    pub async fn receive<W>(&mut self, sink: &mut W) -> Result<ReceiveReport, TransferError>
    where
        W: AsyncWrite + Unpin,
    {
        self.state = ClientState::Receiving;
        let started = Instant::now();
        let mut receiver = GbnReceiver::new(self.config.chunk_capacity);
        let mut report = ReceiveReport::default();

        while !receiver.is_complete() {
            let seq_msg = self.next_from_server().await?;
            let seq = match segment::decode_seq(&seq_msg) {
                Ok(seq) => seq,
                Err(e) => {
                    report.malformed += 1;
                    log::debug!("[client] dropping sequence message: {e}");
                    continue;
                }
            };

            let data = self.next_from_server().await?;
            let ack = match Segment::decode(&data) {
                Ok(seg) => {
                    let outcome = receiver.on_segment(seq, &seg);
                    match outcome.verdict {
                        Verdict::Accepted => {
                            sink.write_all(&seg.payload).await?;
                            report.accepted += 1;
                            report.bytes += seg.payload.len() as u64;
                            log::debug!("[client] ← SEG seq={seq} len={} accepted", seg.payload.len());
                        }
                        Verdict::Discarded(Discard::Corrupt) => {
                            report.corrupt += 1;
                            log::debug!(
                                "[client] ← SEG seq={seq} checksum mismatch: declared {:?}, computed {:08x}",
                                String::from_utf8_lossy(&seg.declared),
                                seg.computed_checksum()
                            );
                        }
                        Verdict::Discarded(Discard::OutOfOrder { expected }) => {
                            report.out_of_order += 1;
                            log::debug!("[client] ← SEG seq={seq} out of order (expected {expected})");
                        }
                    }
                    outcome.ack
                }
                Err(e) => {
                    report.malformed += 1;
                    log::debug!("[client] ← SEG seq={seq} dropped: {e}");
                    receiver.on_malformed()
                }
            };

            self.transport
                .send_to(&segment::encode_ack(ack), self.server)
                .await?;
            log::debug!("[client] → ACK {}", ack.map_or(-1, i64::from));
        }

        sink.flush().await?;
        report.elapsed = started.elapsed();
        self.state = ClientState::Done;
        Ok(report)
    }

    /// Send `exit` and wait for the server to echo it.
    pub async fn exit(&mut self) -> Result<(), TransferError> {
        self.transport
            .send_to(&Request::Exit.encode(), self.server)
            .await?;
        let reply = self.next_from_server().await?;
        self.state = ClientState::AwaitingRequest;
        match Reply::decode(&reply) {
            Some(Reply::Exit) => {
                log::info!("[client] server closed the exchange");
                Ok(())
            }
            _ => Err(TransferError::unexpected(self.server, &reply)),
        }
    }

    /// Next datagram from the server, honouring the idle timeout.
    async fn next_from_server(&self) -> Result<Vec<u8>, TransferError> {
        loop {
            match recv_within(&self.transport, self.config.idle_timeout).await? {
                None => return Err(TransferError::PeerUnresponsive(self.server)),
                Some((buf, addr)) if addr == self.server => return Ok(buf),
                Some((_, addr)) => log::debug!("[client] dropping datagram from {addr}"),
            }
        }
    }
}

/// Local path for a requested name: its final component under `out_dir`.
fn destination(out_dir: &Path, name: &str) -> Result<PathBuf, TransferError> {
    Path::new(name)
        .file_name()
        .map(|file| out_dir.join(file))
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{name:?} does not name a file"),
            )
            .into()
        })
}
