//! Session finite-state machine (FSM) types.
//!
//! Both roles move through four states per filename request.  Transitions
//! are driven by [`crate::server`] and [`crate::client`]; the types live here
//! so logging and tests can name them.

/// Server-side session state.
///
/// ```text
///  AwaitingRequest ──filename──▶ ServingDecision ──"OK"──▶ Sending ──▶ Done
///        ▲    │                        │                               │
///        │    └──"exit"──▶ (stop)      └── not found / declined ───────┤
///        └─────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerState {
    /// Waiting for a filename or `exit`.
    #[default]
    AwaitingRequest,
    /// File found and offered; waiting for the client's `OK`.
    ServingDecision,
    /// Go-Back-N transfer in progress.
    Sending,
    /// Last segment acknowledged.
    Done,
}

/// Client-side session state.
///
/// ```text
///  AwaitingRequest ──send name──▶ AwaitingFileDecision ──"OK"──▶ Receiving ──▶ Done
///        ▲                                │
///        └──────────── "NULL" ────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientState {
    /// Idle; the next action is a request.
    #[default]
    AwaitingRequest,
    /// Request sent; waiting for `OK` or `NULL`.
    AwaitingFileDecision,
    /// Accepting segments.
    Receiving,
    /// Final short segment accepted; sink closed.
    Done,
}

impl std::fmt::Display for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::fmt::Display for ClientState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
