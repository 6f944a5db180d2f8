//! Init-config command - write a default demo configuration

use anyhow::Result;
use std::path::Path;

use crate::config::DemoConfig;
use crate::ui;

/// Write the default configuration to `output`
pub async fn run(output: &Path, force: bool, verbose: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    let config = DemoConfig::default();
    config.save(output)?;

    ui::success(&format!("Wrote demo configuration to {}", output.display()));
    if verbose {
        ui::json(&serde_json::to_value(&config)?);
    }
    ui::info("Edit the file and pass it with --config to change the simulation");
    Ok(())
}
