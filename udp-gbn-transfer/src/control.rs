//! Control tokens exchanged around a transfer.
//!
//! ```text
//!  client                         server
//!    │ ── filename | "exit" ────────▶ │
//!    │ ◀──── "OK" | "NULL" | "exit" ─ │
//!    │ ── "OK" (begin) ─────────────▶ │
//!    │        ... segments ...        │
//! ```
//!
//! Tokens are plain ASCII.  Trailing NUL bytes are ignored so peers that
//! send fixed-size buffers interoperate.

/// Token that ends a client/server exchange.
pub const EXIT: &str = "exit";
/// Server: file found.  Client: begin transfer.
pub const OK: &str = "OK";
/// Server: file not found.  Client: offer declined.
pub const NULL: &str = "NULL";

/// A message sent by the client outside of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Fetch the named file.
    File(String),
    /// Close the exchange.
    Exit,
}

impl Request {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::File(name) => name.as_bytes().to_vec(),
            Self::Exit => EXIT.as_bytes().to_vec(),
        }
    }

    /// Parse a request datagram.  Returns `None` for an empty name.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        let text = token_text(buf);
        if text.is_empty() {
            return None;
        }
        if text == EXIT {
            return Some(Self::Exit);
        }
        Some(Self::File(text))
    }
}

/// Server answer to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Found,
    NotFound,
    Exit,
}

impl Reply {
    pub fn encode(self) -> &'static [u8] {
        match self {
            Self::Found => OK.as_bytes(),
            Self::NotFound => NULL.as_bytes(),
            Self::Exit => EXIT.as_bytes(),
        }
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        match token_text(buf).as_str() {
            OK => Some(Self::Found),
            NULL => Some(Self::NotFound),
            EXIT => Some(Self::Exit),
            _ => None,
        }
    }
}

/// `true` when `buf` is the client's transfer-begin token.
pub fn is_begin(buf: &[u8]) -> bool {
    token_text(buf) == OK
}

fn token_text(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).trim().to_owned()
}
