//! Single-process reference sort.

use std::path::Path;

use anyhow::{Context, Result};
use zerocopy::AsBytes;

use netsort_core::Record;

use super::read_shard;

/// Sort `input` by key into `output`, using the same comparator and
/// stability as a cluster node.
pub fn sort_file(input: &Path, output: &Path) -> Result<usize> {
    let mut records = read_shard(input)?;
    records.sort_by(Record::cmp_key);
    std::fs::write(output, records.as_bytes())
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(records.len())
}

pub fn cmd_sort(input: &Path, output: &Path) -> Result<()> {
    let n = sort_file(input, output)?;
    println!("Sorted {} records into {}", n, output.display());
    Ok(())
}
