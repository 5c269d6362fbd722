//! CLI command modules.

pub mod config;
pub mod generate;
pub mod show;
pub mod sort;
pub mod split;
pub mod verify;

use std::path::Path;

use anyhow::{bail, Context, Result};

use netsort_core::record::RECORD_SIZE;
use netsort_core::Record;

/// Read a whole shard file into memory.
pub fn read_shard(path: &Path) -> Result<Vec<Record>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    if bytes.len() % RECORD_SIZE != 0 {
        bail!(
            "{}: length {} is not a multiple of {RECORD_SIZE}",
            path.display(),
            bytes.len()
        );
    }
    Ok(bytes
        .chunks_exact(RECORD_SIZE)
        .filter_map(Record::from_slice)
        .collect())
}

#[cfg(test)]
pub(crate) fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("netsort-ctl-{}-{name}", std::process::id()))
}
