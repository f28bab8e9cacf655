//! CLI command implementations

pub mod run;
pub mod schemas;
pub mod show;
pub mod validate;

use anyhow::Result;

use crate::pipeline::Pipeline;
use crate::project::PipelineDocument;

/// Load and assemble the pipeline at `config_path`
pub(crate) fn assemble(config_path: &str) -> Result<Pipeline> {
    let (document, base) = PipelineDocument::load(config_path)?;
    Pipeline::assemble(&document, &base)
}
