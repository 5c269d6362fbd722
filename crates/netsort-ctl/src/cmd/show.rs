use std::path::Path;

use anyhow::Result;

use super::read_shard;

pub fn cmd_show(path: &Path, limit: Option<usize>) -> Result<()> {
    let records = read_shard(path)?;
    let shown = limit.unwrap_or(records.len()).min(records.len());

    for (i, record) in records.iter().take(shown).enumerate() {
        println!("{:>10}  {}", i, hex::encode(record.key));
    }
    if shown < records.len() {
        println!("  … {} more", records.len() - shown);
    }
    Ok(())
}
