//! Async datagram transport.
//!
//! [`Transport`] is the seam between the session drivers and the network:
//! blocking `send_to` / `recv_from` of raw byte datagrams, with no ordering
//! or delivery guarantee.  [`Socket`] is the production implementation, a
//! thin wrapper around `tokio::net::UdpSocket`.  All protocol logic lives
//! elsewhere; this module owns only byte I/O.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

/// Maximum UDP payload size (theoretical limit; segments are far smaller).
const MAX_DATAGRAM: usize = 65_535;

/// Datagram send/receive used by the client and server drivers.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Send `bytes` as a single datagram to `dest`.
    async fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> io::Result<()>;

    /// Wait for the next datagram.  Returns `(bytes, sender_address)`.
    async fn recv_from(&self) -> io::Result<(Vec<u8>, SocketAddr)>;
}

/// Receive with an optional deadline.
///
/// Returns `Ok(None)` when `deadline` elapses first; `None` as the deadline
/// waits forever.
pub async fn recv_within<T: Transport>(
    transport: &T,
    deadline: Option<Duration>,
) -> io::Result<Option<(Vec<u8>, SocketAddr)>> {
    match deadline {
        None => transport.recv_from().await.map(Some),
        Some(limit) => match tokio::time::timeout(limit, transport.recv_from()).await {
            Ok(result) => result.map(Some),
            Err(_elapsed) => Ok(None),
        },
    }
}

/// An async UDP socket speaking raw datagrams.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> io::Result<Self> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }
}

impl Transport for Socket {
    async fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> io::Result<()> {
        self.inner.send_to(bytes, dest).await?;
        Ok(())
    }

    async fn recv_from(&self) -> io::Result<(Vec<u8>, SocketAddr)> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, addr) = self.inner.recv_from(&mut buf).await?;
        buf.truncate(n);
        Ok((buf, addr))
    }
}
