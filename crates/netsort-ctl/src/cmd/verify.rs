//! Output shard verification.
//!
//! A node's output is valid when it holds whole records, its keys never
//! decrease, and every key falls in the node's own partition.

use std::cmp::Ordering;
use std::path::Path;

use anyhow::{bail, Context, Result};

use netsort_core::{compare_keys, ClusterTopology, Partitioner, Record};

/// First violation found in a shard.
#[derive(Debug, PartialEq, Eq)]
pub enum Violation {
    /// Record `index` sorts before record `index - 1`.
    OutOfOrder { index: usize },
    /// Record `index` belongs to node `owner`.
    WrongOwner { index: usize, owner: usize },
}

pub fn check(records: &[Record], node: usize, partitioner: &Partitioner) -> Option<Violation> {
    for (index, record) in records.iter().enumerate() {
        let owner = partitioner.owner(&record.key);
        if owner != node {
            return Some(Violation::WrongOwner { index, owner });
        }
        if index > 0 && compare_keys(&records[index - 1].key, &record.key) == Ordering::Greater {
            return Some(Violation::OutOfOrder { index });
        }
    }
    None
}

pub fn cmd_verify(path: &Path, node: usize, topology: &Path) -> Result<()> {
    let topology = ClusterTopology::load(topology).context("failed to load topology")?;
    if topology.peer(node).is_none() {
        bail!("node {node} is not in a {}-node topology", topology.len());
    }
    let partitioner = topology.partitioner();
    let records = super::read_shard(path)?;

    let range = partitioner.first_byte_range(node);
    match check(&records, node, &partitioner) {
        None => {
            println!("═══════════════════════════════════════");
            println!("  {} OK", path.display());
            println!("═══════════════════════════════════════");
            println!("  Node      : {} of {}", node, topology.len());
            println!("  Records   : {}", records.len());
            println!("  Key range : {:02x}..={:02x}", range.start(), range.end());
            Ok(())
        }
        Some(Violation::OutOfOrder { index }) => {
            bail!("{}: record {index} is out of order", path.display())
        }
        Some(Violation::WrongOwner { index, owner }) => bail!(
            "{}: record {index} belongs to node {owner}, not node {node}",
            path.display()
        ),
    }
}
