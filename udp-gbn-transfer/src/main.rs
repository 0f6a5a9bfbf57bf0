//! Entry point for `udp-gbn-transfer`.
//!
//! Parses CLI arguments and dispatches into either **server** or **client** mode.
//! All actual protocol work is delegated to library modules; `main.rs` owns only
//! process setup (logging, argument parsing, the filename prompt).

use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use udp_gbn_transfer::config::{DEFAULT_MAX_RETRIES, DEFAULT_PORT};
use udp_gbn_transfer::{Client, ClientConfig, Fetch, Server, ServerConfig, Socket, Transport};

/// Go-Back-N file transfer over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Serve files from a directory until a client sends `exit`.
    Server {
        /// Local address to bind.
        #[arg(short, long, default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))]
        bind: SocketAddr,
        /// Directory requested filenames are resolved against.
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
        /// Send/ack rounds per Go-Back-N pass.
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        window: u32,
        /// Probability (clamped to 0..=1) that a segment's checksum is corrupted.
        #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
        error_probability: f64,
        /// Give up on an ACK after this many milliseconds (default: wait forever).
        #[arg(long)]
        ack_timeout_ms: Option<u64>,
        /// Consecutive missed ACKs before a session is abandoned.
        #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
        max_retries: u32,
        /// Seed for the corruption RNG (default: seeded from the OS).
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Download files from a server.
    Client {
        /// Server address.
        #[arg(short, long, default_value_t = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))]
        server: SocketAddr,
        /// Directory received files are written into.
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
        /// Fail when the server is silent this many milliseconds (default: wait forever).
        #[arg(long)]
        idle_timeout_ms: Option<u64>,
        /// Files to fetch; prompts interactively when none are given.
        files: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Server {
            bind,
            root,
            window,
            error_probability,
            ack_timeout_ms,
            max_retries,
            seed,
        } => {
            let config = ServerConfig {
                root,
                window_size: window as usize,
                error_probability,
                ack_timeout: ack_timeout_ms.map(Duration::from_millis),
                max_retries,
                ..ServerConfig::default()
            };
            let socket = Socket::bind(bind)
                .await
                .with_context(|| format!("binding {bind}"))?;
            log::info!("Starting server on {}", socket.local_addr);

            let mut server = match seed {
                Some(seed) => Server::seeded(socket, config, seed)?,
                None => Server::new(socket, config)?,
            };
            server.run().await?;
            log::info!("Server exiting");
        }
        Mode::Client {
            server,
            out_dir,
            idle_timeout_ms,
            files,
        } => {
            let config = ClientConfig {
                out_dir,
                idle_timeout: idle_timeout_ms.map(Duration::from_millis),
                ..ClientConfig::default()
            };
            let socket = Socket::bind(SocketAddr::from(([0, 0, 0, 0], 0)))
                .await
                .context("binding client socket")?;
            log::info!("Starting client, server is {server}");

            let mut client = Client::new(socket, server, config)?;
            if files.is_empty() {
                prompt_loop(&mut client, BufReader::new(tokio::io::stdin())).await?;
            } else {
                fetch_listed(&mut client, &files).await?;
            }
        }
    }

    Ok(())
}

/// Ask for filenames on `input` until `exit` or end of input, then close
/// the exchange.
async fn prompt_loop<T, R>(client: &mut Client<T>, input: R) -> Result<()>
where
    T: Transport,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        print!("Filename to download ('exit' to quit): ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let name = line.trim();
        if name.is_empty() {
            continue;
        }
        if name == udp_gbn_transfer::control::EXIT {
            break;
        }
        fetch_and_report(client, name).await;
    }
    client.exit().await?;
    Ok(())
}

/// Fetch every name in `files`, then close the exchange.
async fn fetch_listed<T: Transport>(client: &mut Client<T>, files: &[String]) -> Result<()> {
    for name in files {
        fetch_and_report(client, name).await;
    }
    client.exit().await?;
    Ok(())
}

/// Fetch one file and print the outcome.  A failed fetch is reported and
/// the caller moves on to the next name.
async fn fetch_and_report<T: Transport>(client: &mut Client<T>, name: &str) {
    match client.fetch(name).await {
        Ok(Fetch::Received { path, report }) => println!(
            "{name}: {} bytes -> {} in {:.3}s ({} segments discarded)",
            report.bytes,
            path.display(),
            report.elapsed.as_secs_f64(),
            report.discarded()
        ),
        Ok(Fetch::NotFound) => println!("{name}: not found on server"),
        Err(e) => {
            log::error!("[client] fetching {name:?} failed: {e}");
            eprintln!("{name}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    async fn serve(root: &std::path::Path) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let socket = Socket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = socket.local_addr;
        let config = ServerConfig {
            root: root.to_path_buf(),
            ..ServerConfig::default()
        };
        let handle = tokio::spawn(async move {
            let mut server = Server::seeded(socket, config, 0).expect("server");
            server.run().await.expect("run");
        });
        (addr, handle)
    }

    async fn client_for(server: SocketAddr, out_dir: &std::path::Path) -> Client {
        let socket = Socket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let config = ClientConfig {
            out_dir: out_dir.to_path_buf(),
            idle_timeout: Some(Duration::from_secs(10)),
            ..ClientConfig::default()
        };
        Client::new(socket, server, config).unwrap()
    }

    #[tokio::test]
    async fn listed_fetch_continues_after_failure() {
        let root = TempDir::new("cli_root").unwrap();
        let out = TempDir::new("cli_out").unwrap();
        std::fs::write(root.path().join("b.txt"), b"bravo").unwrap();
        let (addr, server) = serve(root.path()).await;
        let mut client = client_for(addr, out.path()).await;

        let files = ["exit".to_owned(), "/".to_owned(), "b.txt".to_owned()];
        fetch_listed(&mut client, &files).await.unwrap();

        assert_eq!(std::fs::read(out.path().join("b.txt")).unwrap(), b"bravo");
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server should stop after exit")
            .unwrap();
    }

    #[tokio::test]
    async fn prompt_continues_after_failure() {
        let root = TempDir::new("cli_root").unwrap();
        let out = TempDir::new("cli_out").unwrap();
        std::fs::write(root.path().join("a.txt"), b"alpha").unwrap();
        std::fs::write(root.path().join("b.txt"), b"bravo").unwrap();
        let (addr, server) = serve(root.path()).await;
        // The first offer is declined: the destination directory is missing.
        let mut broken = client_for(addr, &out.path().join("absent")).await;
        fetch_and_report(&mut broken, "a.txt").await;

        let mut client = client_for(addr, out.path()).await;
        let input: &[u8] = b"/\n\nb.txt\n";
        prompt_loop(&mut client, input).await.unwrap();

        assert_eq!(std::fs::read(out.path().join("b.txt")).unwrap(), b"bravo");
        assert!(!out.path().join("a.txt").exists());
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server should stop after exit")
            .unwrap();
    }
}
