//! End-to-end tests over the loopback interface.
//!
//! Each test binds a server socket on an OS-assigned port, serves files from
//! a temporary directory, and runs the server and client as separate tokio
//! tasks so both sides make progress concurrently.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tempdir::TempDir;
use udp_gbn_transfer::state::{ClientState, ServerState};
use udp_gbn_transfer::{
    Client, ClientConfig, Fetch, ReceiveReport, SendReport, Served, Server, ServerConfig, Socket,
    TransferError, Transport,
};

/// Bind a socket to an OS-assigned port on loopback.
async fn ephemeral() -> Socket {
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    Socket::bind(addr).await.expect("bind failed")
}

/// Deterministic, non-repeating test content.
fn content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

fn server_config(root: &Path, window_size: usize, error_probability: f64) -> ServerConfig {
    ServerConfig {
        root: root.to_path_buf(),
        window_size,
        error_probability,
        ..ServerConfig::default()
    }
}

fn client_config(out_dir: &Path) -> ClientConfig {
    ClientConfig {
        out_dir: out_dir.to_path_buf(),
        idle_timeout: Some(Duration::from_secs(10)),
        ..ClientConfig::default()
    }
}

/// Serve `data` as `name`, fetch it once, and return both reports plus the
/// bytes that landed on disk.
async fn transfer(
    data: &[u8],
    window_size: usize,
    error_probability: f64,
) -> (SendReport, ReceiveReport, Vec<u8>) {
    let root = TempDir::new("gbn_root").unwrap();
    let out = TempDir::new("gbn_out").unwrap();
    std::fs::write(root.path().join("file.bin"), data).unwrap();

    let server_sock = ephemeral().await;
    let server_addr = server_sock.local_addr;
    let config = server_config(root.path(), window_size, error_probability);

    let server = tokio::spawn(async move {
        let mut server = Server::seeded(server_sock, config, 7).expect("server");
        let served = server.serve_one().await.expect("serve");
        assert_eq!(server.state(), ServerState::Done);
        match served {
            Served::Sent { name, report } => {
                assert_eq!(name, "file.bin");
                report
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    });

    let out_path = out.path().to_path_buf();
    let client = tokio::spawn(async move {
        let mut client =
            Client::new(ephemeral().await, server_addr, client_config(&out_path)).expect("client");
        let fetched = client.fetch("file.bin").await.expect("fetch");
        assert_eq!(client.state(), ClientState::Done);
        match fetched {
            Fetch::Received { path, report } => {
                assert_eq!(path, out_path.join("file.bin"));
                report
            }
            Fetch::NotFound => panic!("file should exist"),
        }
    });

    let (sr, cr) = tokio::join!(server, client);
    let send_report = sr.unwrap();
    let recv_report = cr.unwrap();
    let received = std::fs::read(out.path().join("file.bin")).unwrap();
    (send_report, recv_report, received)
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[tokio::test]
async fn thousand_bytes_window_two() {
    let data = content(1000);
    let (sent, recv, received) = transfer(&data, 2, 0.0).await;

    assert_eq!(received, data);
    assert_eq!(sent.segments, 2);
    assert_eq!(sent.bytes, 1000);
    assert_eq!(sent.transmissions, 2);
    assert_eq!(sent.retransmissions(), 0);
    assert_eq!(recv.accepted, 2);
    assert_eq!(recv.bytes, 1000);
    assert_eq!(recv.discarded(), 0);
}

#[tokio::test]
async fn lossless_round_trip_any_window() {
    let data = content(5 * 504 + 123);
    for window in [1, 3, 4, 8] {
        let (sent, recv, received) = transfer(&data, window, 0.0).await;
        assert_eq!(received, data, "window {window}");
        assert_eq!(sent.segments, 6);
        assert_eq!(recv.accepted, 6);
    }
}

#[tokio::test]
async fn exact_multiple_of_chunk_ends_with_empty_segment() {
    let data = content(3 * 504);
    let (sent, recv, received) = transfer(&data, 2, 0.0).await;
    assert_eq!(received, data);
    assert_eq!(sent.segments, 4);
    assert_eq!(recv.accepted, 4);
}

#[tokio::test]
async fn empty_file_round_trip() {
    let (sent, recv, received) = transfer(&[], 4, 0.0).await;
    assert!(received.is_empty());
    assert_eq!(sent.segments, 1);
    assert_eq!(recv.accepted, 1);
}

#[tokio::test]
async fn corruption_is_repaired_by_retransmission() {
    let data = content(40 * 504 + 17);
    let (sent, recv, received) = transfer(&data, 4, 0.3).await;

    assert_eq!(received, data);
    assert!(recv.corrupt > 0, "seeded run should corrupt some segments");
    assert!(sent.retransmissions() > 0);
    assert_eq!(recv.bytes, data.len() as u64);
}

// ---------------------------------------------------------------------------
// Control exchange
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_file_then_exit() {
    let root = TempDir::new("gbn_root").unwrap();
    let out = TempDir::new("gbn_out").unwrap();
    let server_sock = ephemeral().await;
    let server_addr = server_sock.local_addr;
    let config = server_config(root.path(), 1, 0.0);

    let server = tokio::spawn(async move {
        let mut server = Server::seeded(server_sock, config, 1).expect("server");
        server.run().await.expect("run");
    });

    let mut client =
        Client::new(ephemeral().await, server_addr, client_config(out.path())).expect("client");
    assert_eq!(client.fetch("nope.txt").await.expect("fetch"), Fetch::NotFound);
    assert_eq!(client.state(), ClientState::AwaitingRequest);
    assert!(!out.path().join("nope.txt").exists());

    client.exit().await.expect("exit");
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop after exit")
        .unwrap();
}

#[tokio::test]
async fn path_escape_is_not_found() {
    let root = TempDir::new("gbn_root").unwrap();
    let out = TempDir::new("gbn_out").unwrap();
    std::fs::write(root.path().join("inside.txt"), b"x").unwrap();
    let server_sock = ephemeral().await;
    let server_addr = server_sock.local_addr;
    let config = server_config(&root.path().join("sub"), 1, 0.0);

    let server = tokio::spawn(async move {
        let mut server = Server::seeded(server_sock, config, 1).expect("server");
        server.serve_one().await.expect("serve")
    });

    let mut client =
        Client::new(ephemeral().await, server_addr, client_config(out.path())).expect("client");
    assert_eq!(
        client.fetch("../inside.txt").await.expect("fetch"),
        Fetch::NotFound
    );
    assert_eq!(
        server.await.unwrap(),
        Served::NotFound {
            name: "../inside.txt".into()
        }
    );
}

#[tokio::test]
async fn several_files_in_one_exchange() {
    let root = TempDir::new("gbn_root").unwrap();
    let out = TempDir::new("gbn_out").unwrap();
    let files = [("a.txt", content(10)), ("b.bin", content(2000)), ("c.dat", content(504))];
    for (name, data) in &files {
        std::fs::write(root.path().join(name), data).unwrap();
    }

    let server_sock = ephemeral().await;
    let server_addr = server_sock.local_addr;
    let config = server_config(root.path(), 3, 0.0);
    let server = tokio::spawn(async move {
        let mut server = Server::seeded(server_sock, config, 1).expect("server");
        server.run().await.expect("run");
    });

    let mut client =
        Client::new(ephemeral().await, server_addr, client_config(out.path())).expect("client");
    for (name, data) in &files {
        match client.fetch(name).await.expect("fetch") {
            Fetch::Received { path, .. } => assert_eq!(&std::fs::read(path).unwrap(), data),
            Fetch::NotFound => panic!("{name} should exist"),
        }
    }
    client.exit().await.expect("exit");
    server.await.unwrap();
}

// ---------------------------------------------------------------------------
// Liveness limitation
// ---------------------------------------------------------------------------

/// With every checksum corrupted nothing is ever accepted; the transfer
/// never finishes and the client's file stays empty.
#[tokio::test]
async fn full_corruption_never_delivers() {
    let root = TempDir::new("gbn_root").unwrap();
    let out = TempDir::new("gbn_out").unwrap();
    std::fs::write(root.path().join("file.bin"), content(1000)).unwrap();

    let server_sock = ephemeral().await;
    let server_addr = server_sock.local_addr;
    let config = server_config(root.path(), 2, 1.0);
    let server = tokio::spawn(async move {
        let mut server = Server::seeded(server_sock, config, 1).expect("server");
        server.serve_one().await
    });

    let out_path = out.path().to_path_buf();
    let client = tokio::spawn(async move {
        let mut client =
            Client::new(ephemeral().await, server_addr, client_config(&out_path)).expect("client");
        client.fetch("file.bin").await
    });

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!server.is_finished());
    assert!(!client.is_finished());
    server.abort();
    client.abort();

    let received = std::fs::read(out.path().join("file.bin")).unwrap();
    assert!(received.is_empty());
}

/// A server with an ACK deadline abandons a client that goes silent.
#[tokio::test]
async fn silent_client_is_abandoned_with_deadline() {
    let root = TempDir::new("gbn_root").unwrap();
    std::fs::write(root.path().join("file.bin"), content(3000)).unwrap();

    let server_sock = ephemeral().await;
    let server_addr = server_sock.local_addr;
    let config = ServerConfig {
        ack_timeout: Some(Duration::from_millis(20)),
        max_retries: 3,
        ..server_config(root.path(), 2, 0.0)
    };
    let server = tokio::spawn(async move {
        let mut server = Server::seeded(server_sock, config, 1).expect("server");
        server.serve_one().await
    });

    // Hand-rolled client: accept the offer, then never ACK.
    let sock = ephemeral().await;
    sock.send_to(b"file.bin", server_addr).await.unwrap();
    let (reply, _) = sock.recv_from().await.unwrap();
    assert_eq!(reply, b"OK");
    sock.send_to(b"OK", server_addr).await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should give up")
        .unwrap();
    assert!(matches!(
        result,
        Err(TransferError::PeerUnresponsive(_))
    ));
}
