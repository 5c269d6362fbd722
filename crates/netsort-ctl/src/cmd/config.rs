use anyhow::{Context, Result};

use netsort_core::config::NetsortConfig;

/// Print the configuration a node would start with, as TOML.
pub fn cmd_config() -> Result<()> {
    let path = NetsortConfig::file_path();
    let config = NetsortConfig::load()?;
    let text = toml::to_string_pretty(&config).context("failed to render config")?;

    println!("# {}", path.display());
    print!("{text}");
    Ok(())
}
