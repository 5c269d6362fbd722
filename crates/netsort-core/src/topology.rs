//! Cluster topology — the ordered list of nodes taking part in a run.
//!
//! Loaded from a YAML file shared by every node:
//!
//! ```yaml
//! servers:
//!   - serverId: 0
//!     host: 10.0.0.1
//!     port: 8080
//!   - serverId: 1
//!     host: 10.0.0.2
//!     port: "8080"
//! ```
//!
//! Entries may appear in any order. After loading, node ids must be exactly
//! `0..n` and `n` must be a power of two.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use crate::partition::{PartitionError, Partitioner};

/// One node's identity and listening address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PeerDescriptor {
    #[serde(rename = "serverId")]
    pub node_id: usize,
    pub host: String,
    #[serde(deserialize_with = "port_as_string")]
    pub port: String,
}

impl PeerDescriptor {
    /// `host:port`, ready for bind/connect.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for PeerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {} ({}:{})", self.node_id, self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
struct TopologyFile {
    servers: Vec<PeerDescriptor>,
}

/// Validated, id-indexed node list.
#[derive(Debug, Clone)]
pub struct ClusterTopology {
    peers: Vec<PeerDescriptor>,
    partitioner: Partitioner,
}

impl ClusterTopology {
    /// Read and validate a topology file.
    pub fn load(path: &Path) -> Result<Self, TopologyError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TopologyError::ReadFailed(path.to_path_buf(), e))?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn from_yaml(text: &str) -> Result<Self, TopologyError> {
        Self::parse(text, "<inline>")
    }

    fn parse(text: &str, source: &str) -> Result<Self, TopologyError> {
        let file: TopologyFile = serde_yaml::from_str(text)
            .map_err(|e| TopologyError::ParseFailed(source.to_string(), e))?;
        Self::from_peers(file.servers)
    }

    /// Sort by id and check the ids form `0..n` with `n` a power of two.
    pub fn from_peers(mut peers: Vec<PeerDescriptor>) -> Result<Self, TopologyError> {
        if peers.is_empty() {
            return Err(TopologyError::Empty);
        }
        peers.sort_by_key(|p| p.node_id);
        for (expected, peer) in peers.iter().enumerate() {
            if peer.node_id < expected {
                return Err(TopologyError::DuplicateId(peer.node_id));
            }
            if peer.node_id > expected {
                return Err(TopologyError::GapInIds(expected));
            }
        }
        let partitioner = Partitioner::new(peers.len())?;
        Ok(Self { peers, partitioner })
    }

    /// Number of nodes (`nServers`).
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn peer(&self, node_id: usize) -> Option<&PeerDescriptor> {
        self.peers.get(node_id)
    }

    pub fn peers(&self) -> &[PeerDescriptor] {
        &self.peers
    }

    pub fn partitioner(&self) -> Partitioner {
        self.partitioner
    }

    /// Every node except `node_id`, in id order.
    pub fn others(&self, node_id: usize) -> impl Iterator<Item = &PeerDescriptor> {
        self.peers.iter().filter(move |p| p.node_id != node_id)
    }
}

fn port_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Number(n) => n.to_string(),
        Port::Text(s) => s,
    })
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(String, serde_yaml::Error),
    #[error("topology lists no servers")]
    Empty,
    #[error("server ids must be 0..n without gaps; missing id {0}")]
    GapInIds(usize),
    #[error("server id {0} appears more than once")]
    DuplicateId(usize),
    #[error(transparent)]
    Partition(#[from] PartitionError),
}
