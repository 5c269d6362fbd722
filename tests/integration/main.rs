//! netsort integration test harness.
//!
//! Every test runs a whole cluster inside one process: each node is a
//! `NodeSession` on its own task, listening on 127.0.0.1 with a port
//! reserved up front. Shards live under a per-test scratch directory.
//!
//!   cargo test --test integration

mod failures;
mod shuffle;

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use zerocopy::{AsBytes, FromZeroes};

use netsort_core::config::NetsortConfig;
use netsort_core::record::RECORD_SIZE;
use netsort_core::{ClusterTopology, Record};
use netsort_shuffle::{NodeReport, NodeSession, ShuffleError};

// ── Harness ───────────────────────────────────────────────────────────────────

/// Bind `n` ephemeral ports at once so they are distinct, then release them.
pub fn reserve_ports(n: usize) -> Vec<u16> {
    let listeners: Vec<TcpListener> = (0..n)
        .map(|_| TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port"))
        .collect();
    listeners
        .iter()
        .map(|l| l.local_addr().expect("local addr").port())
        .collect()
}

pub fn topology_yaml(ports: &[u16]) -> String {
    let mut yaml = String::from("servers:\n");
    for (id, port) in ports.iter().enumerate() {
        yaml.push_str(&format!(
            "  - serverId: {id}\n    host: 127.0.0.1\n    port: {port}\n"
        ));
    }
    yaml
}

/// Short retry interval so tests don't wait on slow-starting peers.
pub fn test_config() -> NetsortConfig {
    let mut config = NetsortConfig::default();
    config.network.dial_backoff_ms = 20;
    config.network.max_dial_attempts = 500;
    config.network.read_timeout_secs = 30;
    config
}

pub fn random_records(count: usize, seed: u64) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let mut r = Record::new_zeroed();
            rng.fill_bytes(r.as_bytes_mut());
            r
        })
        .collect()
}

pub fn read_records(path: &Path) -> Vec<Record> {
    let bytes = std::fs::read(path).expect("read shard");
    assert_eq!(bytes.len() % RECORD_SIZE, 0, "{} is not whole records", path.display());
    bytes
        .chunks_exact(RECORD_SIZE)
        .map(|c| Record::from_slice(c).expect("record"))
        .collect()
}

/// A cluster's worth of shard files on disk.
pub struct Cluster {
    pub dir: PathBuf,
    pub topology: ClusterTopology,
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
}

impl Cluster {
    /// Lay out one input shard per node on fresh loopback ports.
    pub fn new(name: &str, shards: &[Vec<Record>]) -> Result<Self> {
        let dir = std::env::temp_dir().join(format!(
            "netsort-it-{}-{name}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir)?;

        let topology = ClusterTopology::from_yaml(&topology_yaml(&reserve_ports(shards.len())))
            .context("topology")?;

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for (i, records) in shards.iter().enumerate() {
            let input = dir.join(format!("in-{i}.dat"));
            std::fs::write(&input, records.as_bytes())?;
            inputs.push(input);
            outputs.push(dir.join(format!("out-{i}.dat")));
        }

        Ok(Self {
            dir,
            topology,
            inputs,
            outputs,
        })
    }

    /// Run every node concurrently; results are in node-id order.
    pub async fn run(&self) -> Vec<Result<NodeReport, ShuffleError>> {
        self.run_nodes(0..self.topology.len()).await
    }

    /// Run only the given nodes; the rest of the topology never starts.
    pub async fn run_nodes(
        &self,
        nodes: impl IntoIterator<Item = usize>,
    ) -> Vec<Result<NodeReport, ShuffleError>> {
        let handles: Vec<_> = nodes
            .into_iter()
            .map(|id| {
                let topology = self.topology.clone();
                let input = self.inputs[id].clone();
                let output = self.outputs[id].clone();
                tokio::spawn(async move {
                    NodeSession::new(id, topology, test_config())?
                        .run(&input, &output)
                        .await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for joined in futures::future::join_all(handles).await {
            results.push(joined.expect("node task panicked"));
        }
        results
    }

    /// All inputs, concatenated and sorted locally.
    pub fn expected_bytes(&self) -> Vec<u8> {
        let mut all: Vec<Record> = self.inputs.iter().flat_map(|p| read_records(p)).collect();
        all.sort_by(Record::cmp_key);
        all.as_bytes().to_vec()
    }

    /// All outputs, concatenated in node-id order.
    pub fn output_bytes(&self) -> Vec<u8> {
        self.outputs
            .iter()
            .flat_map(|p| std::fs::read(p).expect("read output"))
            .collect()
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

/// Give a whole test a hard ceiling so a wedged mesh fails instead of hangs.
pub async fn within<T>(fut: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(60), fut)
        .await
        .expect("cluster run timed out")
}
