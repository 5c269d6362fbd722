//! Shuffle errors. Every variant is fatal to the node: a partial shuffle
//! cannot produce a correct output shard, so nothing here is retried.

use std::io;
use std::path::PathBuf;

use netsort_core::record::RECORD_SIZE;
use netsort_core::wire::WireError;

#[derive(Debug, thiserror::Error)]
pub enum ShuffleError {
    #[error("node id {node} out of range for a {n_servers}-node cluster")]
    UnknownNode { node: usize, n_servers: usize },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to dial node {node} at {addr} after {attempts} attempts: {source}")]
    Dial {
        node: usize,
        addr: String,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    #[error("read failed on inbound stream {stream}: {source}")]
    Read {
        stream: usize,
        #[source]
        source: io::Error,
    },

    #[error("inbound stream {stream} closed mid-frame or before end-of-stream")]
    Truncated { stream: usize },

    #[error("no data on inbound stream {stream} for {secs}s, peer presumed dead")]
    ReadTimeout { stream: usize, secs: u64 },

    #[error("bad frame on inbound stream {stream}: {source}")]
    Decode {
        stream: usize,
        #[source]
        source: WireError,
    },

    #[error("inbound queue {0} closed without end-of-stream")]
    PeerAborted(usize),

    #[error("inbound queue {0} dropped by the collector")]
    QueueClosed(usize),

    #[error("write failed to node {node}: {source}")]
    Write {
        node: usize,
        #[source]
        source: io::Error,
    },

    #[error("input {}: length {len} is not a multiple of {}", .path.display(), RECORD_SIZE)]
    MalformedInput { path: PathBuf, len: u64 },

    #[error("input {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("output {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("receiver task died: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ShuffleError {
    /// Short label for the phase that failed, for operator diagnostics.
    pub fn phase(&self) -> &'static str {
        match self {
            ShuffleError::UnknownNode { .. } => "config",
            ShuffleError::Bind { .. } => "bind",
            ShuffleError::Dial { .. } => "dial",
            ShuffleError::Accept(_) => "accept",
            ShuffleError::Read { .. }
            | ShuffleError::Truncated { .. }
            | ShuffleError::ReadTimeout { .. }
            | ShuffleError::PeerAborted(_)
            | ShuffleError::QueueClosed(_)
            | ShuffleError::Join(_) => "read",
            ShuffleError::Decode { .. } => "decode",
            ShuffleError::Write { .. } => "write",
            ShuffleError::MalformedInput { .. } | ShuffleError::Input { .. } => "input",
            ShuffleError::Output { .. } => "output",
        }
    }
}
