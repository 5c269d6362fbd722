//! Per-node session — owns everything one node needs for a run.
//!
//! Order of operations:
//!   1. drop any stale output, map and validate the input shard (no sockets yet)
//!   2. bind the listener and start accepting inbound streams
//!   3. dial every peer
//!   4. route the input shard, then end-of-stream on every outbound stream
//!   5. wait for every inbound stream to reach end-of-stream
//!   6. sort and write the output shard
//!
//! Completion is local: once every peer's end-of-stream has arrived there
//! is nothing further to wait for.

use std::path::Path;

use netsort_core::config::NetsortConfig;
use netsort_core::{ClusterTopology, PeerDescriptor};

use crate::collector::{collect, emit, sort_records};
use crate::error::ShuffleError;
use crate::mesh::{bind, Acceptor, Dialer, OutboundTable};
use crate::sender::{send_shard, InputShard};

/// Counters for one completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeReport {
    pub node: usize,
    /// Records in the input shard.
    pub records_read: u64,
    /// Input records this node owns itself.
    pub records_local: u64,
    /// Data frames sent, indexed by node id.
    pub sent_per_peer: Vec<u64>,
    /// Records received, indexed by inbound stream (accept order).
    pub received_per_stream: Vec<u64>,
    /// Records in the output shard.
    pub records_written: u64,
}

/// One node of the cluster.
#[derive(Debug, Clone)]
pub struct NodeSession {
    node_id: usize,
    topology: ClusterTopology,
    config: NetsortConfig,
}

impl NodeSession {
    /// Fails if `node_id` is not in the topology.
    pub fn new(
        node_id: usize,
        topology: ClusterTopology,
        config: NetsortConfig,
    ) -> Result<Self, ShuffleError> {
        if topology.peer(node_id).is_none() {
            return Err(ShuffleError::UnknownNode {
                node: node_id,
                n_servers: topology.len(),
            });
        }
        Ok(Self {
            node_id,
            topology,
            config,
        })
    }

    fn descriptor(&self) -> Result<&PeerDescriptor, ShuffleError> {
        self.topology
            .peer(self.node_id)
            .ok_or(ShuffleError::UnknownNode {
                node: self.node_id,
                n_servers: self.topology.len(),
            })
    }

    /// Shuffle `input` across the cluster and write this node's sorted
    /// partition to `output`.
    /// Any existing `output` is removed first, so a failed run never leaves
    /// an older shard looking like its result.
    pub async fn run(self, input: &Path, output: &Path) -> Result<NodeReport, ShuffleError> {
        remove_stale_output(output).await?;
        let shard = InputShard::open(input)?;
        let partitioner = self.topology.partitioner();
        let n_servers = self.topology.len();
        tracing::info!(
            node = self.node_id,
            nodes = n_servers,
            records = shard.len(),
            owns = ?partitioner.first_byte_range(self.node_id),
            "node starting"
        );

        let listener = bind(self.descriptor()?).await?;
        let acceptor = Acceptor::new(
            listener,
            n_servers - 1,
            self.config.network.read_timeout(),
        )
        .spawn();

        let mut outbound = OutboundTable::new(
            self.node_id,
            self.topology.clone(),
            Dialer::from_config(&self.config),
        );
        outbound.connect_all().await?;

        let sent = send_shard(&shard, self.node_id, partitioner, outbound).await?;

        let inbound = acceptor.await??;
        let records_local = sent.local.len() as u64;
        let (mut records, received_per_stream) = collect(sent.local, inbound).await?;

        sort_records(&mut records);
        if let (Some(first), Some(last)) = (records.first(), records.last()) {
            tracing::debug!(
                first = hex::encode(first.key),
                last = hex::encode(last.key),
                "partition sorted"
            );
        }
        let records_written = emit(output, &records, self.config.io.write_buffer_bytes).await?;

        let report = NodeReport {
            node: self.node_id,
            records_read: shard.len() as u64,
            records_local,
            sent_per_peer: sent.sent_per_peer,
            received_per_stream,
            records_written,
        };
        tracing::info!(
            node = report.node,
            read = report.records_read,
            local = report.records_local,
            received = report.received_per_stream.iter().sum::<u64>(),
            written = report.records_written,
            "node finished"
        );
        Ok(report)
    }
}

async fn remove_stale_output(output: &Path) -> Result<(), ShuffleError> {
    match tokio::fs::remove_file(output).await {
        Ok(()) => {
            tracing::debug!(path = %output.display(), "removed stale output shard");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ShuffleError::Output {
            path: output.to_path_buf(),
            source,
        }),
    }
}
