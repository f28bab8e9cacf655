//! Validate pipeline command

use anyhow::Result;

/// Run the validate command
pub async fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating pipeline: {}", config_path);

    let pipeline = super::assemble(config_path)?;

    tracing::info!("✓ Pipeline: {}", pipeline.name());
    tracing::info!("✓ Input: {}", pipeline.input_directory().display());
    for stage in pipeline.transformers() {
        tracing::info!("✓ Transformer: {}", stage.name);
    }
    for stage in pipeline.actions() {
        tracing::info!("✓ Action: {}", stage.name);
    }

    println!("Pipeline '{}' is valid", pipeline.name());
    Ok(())
}
