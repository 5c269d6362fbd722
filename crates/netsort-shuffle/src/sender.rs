//! Shuffle sender — routes every local record to its owner.
//!
//! Records this node owns stay in memory and never touch the network.
//! Everything else is framed and written to the owning peer's outbound
//! stream. After the last record, every outbound stream gets its
//! end-of-stream marker.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use zerocopy::FromBytes;

use netsort_core::record::RECORD_SIZE;
use netsort_core::wire::{encode, Control};
use netsort_core::{Partitioner, Record};

use crate::error::ShuffleError;
use crate::mesh::OutboundTable;

/// A memory-mapped input shard, validated to hold whole records only.
pub struct InputShard {
    path: PathBuf,
    // None for an empty file; mapping zero bytes is not portable.
    map: Option<Mmap>,
}

impl InputShard {
    /// Open and map `path`. A length that is not a multiple of the record
    /// size is rejected here, before any network activity.
    pub fn open(path: &Path) -> Result<Self, ShuffleError> {
        let input_err = |source| ShuffleError::Input {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(input_err)?;
        let len = file.metadata().map_err(input_err)?.len();
        if len % RECORD_SIZE as u64 != 0 {
            return Err(ShuffleError::MalformedInput {
                path: path.to_path_buf(),
                len,
            });
        }

        let map = if len == 0 {
            None
        } else {
            // Safety: mapped read-only; the shard is not modified while a
            // node is running.
            Some(unsafe { Mmap::map(&file) }.map_err(input_err)?)
        };

        Ok(Self {
            path: path.to_path_buf(),
            map,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The shard as a record slice, without copying.
    pub fn records(&self) -> &[Record] {
        match &self.map {
            Some(map) => Record::slice_from(&map[..]).unwrap_or(&[]),
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What one pass over the input produced.
#[derive(Debug)]
pub struct SendOutcome {
    /// Records owned by this node, in input order.
    pub local: Vec<Record>,
    /// Data frames sent, indexed by node id (this node's slot is 0).
    pub sent_per_peer: Vec<u64>,
}

/// Route every record in `shard`, then finish every outbound stream.
pub async fn send_shard(
    shard: &InputShard,
    self_id: usize,
    partitioner: Partitioner,
    mut outbound: OutboundTable,
) -> Result<SendOutcome, ShuffleError> {
    let records = shard.records();
    let mut local = Vec::with_capacity(records.len() / partitioner.n_servers().max(1));

    for record in records {
        let owner = partitioner.owner(&record.key);
        if owner == self_id {
            local.push(*record);
            continue;
        }
        outbound
            .stream_for(owner)
            .await?
            .send(&encode(Control::Data, record))
            .await?;
    }

    let sent_per_peer = outbound.finish_all().await?;
    tracing::info!(
        node = self_id,
        input = %shard.path().display(),
        read = records.len(),
        local = local.len(),
        sent = sent_per_peer.iter().sum::<u64>(),
        "input shard routed"
    );

    Ok(SendOutcome {
        local,
        sent_per_peer,
    })
}
