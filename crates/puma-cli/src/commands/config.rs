//! Configuration commands.

use anyhow::{Context, Result};
use puma_config::PumaConfig;

/// Prints the effective configuration of `project` as TOML.
pub fn show(project: &str) -> Result<()> {
    let config = PumaConfig::load_from_dir(project).context("Failed to load configuration")?;
    print!("{}", config.to_toml()?);
    Ok(())
}
