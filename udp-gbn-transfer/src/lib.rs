//! `udp-gbn-transfer`: file transfer over UDP with a Go-Back-N protocol.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────┐   seq + segment   ┌──────────────┐
//!  │    Server    │──────────────────▶│    Client    │
//!  │ (GbnSender)  │                   │ (GbnReceiver)│
//!  └──────┬───────┘                   └──────┬───────┘
//!         │◀────────── cumulative ACK ───────┘
//!         │
//!  ┌──────▼─────────────────────────────────────────┐
//!  │ segment codec · error injector (server only)   │
//!  └──────┬─────────────────────────────────────────┘
//!         │ raw UDP datagrams
//!  ┌──────▼──────┐
//!  │  Transport  │  (thin async wrapper around tokio UdpSocket)
//!  └─────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`segment`]: data segment framing, CRC-32, sequence/ACK wire form
//! - [`control`]: request and reply tokens (`exit`, `OK`, `NULL`)
//! - [`injector`]: probabilistic checksum corruption for testing
//! - [`gbn_sender`]: Go-Back-N window bookkeeping (no I/O)
//! - [`gbn_receiver`]: in-order, checksum-gated acceptance (no I/O)
//! - [`server`]: request loop and sending session
//! - [`client`]: requests, receiving session, exit
//! - [`state`]: session finite-state-machine types
//! - [`config`]: server and client settings
//! - [`error`]: session-level error type
//! - [`socket`]: datagram transport trait and UDP socket

pub mod client;
pub mod config;
pub mod control;
pub mod error;
pub mod gbn_receiver;
pub mod gbn_sender;
pub mod injector;
pub mod segment;
pub mod server;
pub mod socket;
pub mod state;

pub use client::{Client, Fetch, ReceiveReport};
pub use config::{ClientConfig, ServerConfig};
pub use error::TransferError;
pub use server::{SendReport, Served, Server};
pub use socket::{Socket, Transport};
