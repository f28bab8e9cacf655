//! Show materialized settings command

use anyhow::{Context, Result};

/// Print the materialized settings and their fingerprint
pub async fn run(config_path: &str) -> Result<()> {
    let pipeline = super::assemble(config_path)?;
    let settings = pipeline.settings_value();

    let yaml = serde_yaml::to_string(settings).context("Failed to render settings")?;
    println!("# {}", settings.schema_name());
    print!("{}", yaml);
    println!("# fingerprint: {}", settings.fingerprint());
    Ok(())
}
