//! Deal one record file into per-node input shards.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use zerocopy::AsBytes;

use super::read_shard;

/// Write `shard-<i>.dat` for `i in 0..n` under `dir`, dealing records
/// round-robin. Returns the shard paths.
pub fn split(input: &Path, dir: &Path, n: usize) -> Result<Vec<PathBuf>> {
    if n == 0 {
        bail!("shard count must be at least 1");
    }
    let records = read_shard(input)?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let paths: Vec<PathBuf> = (0..n).map(|i| dir.join(format!("shard-{i}.dat"))).collect();
    let mut writers = paths
        .iter()
        .map(|p| {
            File::create(p)
                .map(BufWriter::new)
                .with_context(|| format!("failed to create {}", p.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    for (i, record) in records.iter().enumerate() {
        writers[i % n].write_all(record.as_bytes())?;
    }
    for w in &mut writers {
        w.flush()?;
    }
    Ok(paths)
}

pub fn cmd_split(input: &Path, dir: &Path, n: usize) -> Result<()> {
    let paths = split(input, dir, n)?;
    for p in &paths {
        println!("  {}", p.display());
    }
    println!("Split {} into {} shards", input.display(), paths.len());
    Ok(())
}
