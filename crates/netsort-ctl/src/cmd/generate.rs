//! Random input generation.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use zerocopy::{AsBytes, FromZeroes};

use netsort_core::Record;

/// Write `count` records with uniformly random keys and values.
///
/// The same seed always produces the same file.
pub fn generate(path: &Path, count: u64, seed: Option<u64>) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let mut record = Record::new_zeroed();
    for _ in 0..count {
        rng.fill_bytes(record.as_bytes_mut());
        out.write_all(record.as_bytes())?;
    }
    out.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn cmd_generate(path: &Path, count: u64, seed: Option<u64>) -> Result<()> {
    generate(path, count, seed)?;
    println!("Wrote {} records to {}", count, path.display());
    Ok(())
}
