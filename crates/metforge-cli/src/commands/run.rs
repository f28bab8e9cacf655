//! Run the pipeline over the input directory

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use futures::stream::{self, StreamExt};
use walkdir::WalkDir;

use crate::pipeline::Pipeline;
use crate::reader;

/// Totals for one run
#[derive(Debug, Default)]
struct Summary {
    files: usize,
    bulletins: usize,
    applied: usize,
    failed: usize,
}

/// Run the run command
pub async fn run(config_path: &str, workers: Option<usize>) -> Result<()> {
    tracing::info!("Loading pipeline from {}", config_path);

    let pipeline = Arc::new(super::assemble(config_path)?);
    let workers = workers
        .filter(|w| *w > 0)
        .unwrap_or_else(|| pipeline.settings().worker_count());

    let files = input_files(pipeline.input_directory(), pipeline.settings().input_extension())?;
    tracing::info!(
        "Pipeline '{}': {} input files, {} workers",
        pipeline.name(),
        files.len(),
        workers
    );

    let results: Vec<Result<Summary>> = stream::iter(files)
        .map(|path| {
            let pipeline = Arc::clone(&pipeline);
            async move {
                tokio::task::spawn_blocking(move || process_file(&pipeline, &path))
                    .await
                    .context("Worker panicked")?
            }
        })
        .buffer_unordered(workers)
        .collect()
        .await;

    let mut total = Summary::default();
    for result in results {
        let summary = result?;
        total.files += summary.files;
        total.bulletins += summary.bulletins;
        total.applied += summary.applied;
        total.failed += summary.failed;
    }

    println!(
        "Processed {} bulletins from {} files: {} actions applied, {} failed",
        total.bulletins, total.files, total.applied, total.failed
    );

    if total.failed > 0 {
        bail!("{} post actions failed", total.failed);
    }
    Ok(())
}

fn input_files(directory: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        bail!("Input directory not found: {}", directory.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(directory).sort_by_file_name() {
        let entry = entry.context("Failed to read input directory")?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|e| e == extension) {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

fn process_file(pipeline: &Pipeline, path: &Path) -> Result<Summary> {
    let bulletins = reader::read_bulletins(path)?;
    tracing::debug!("{}: {} bulletins", path.display(), bulletins.len());

    let mut summary = Summary {
        files: 1,
        ..Summary::default()
    };
    for bulletin in bulletins {
        let bulletin = pipeline.transform(bulletin);
        let delivery = pipeline.deliver(&bulletin);
        summary.bulletins += 1;
        summary.applied += delivery.applied;
        summary.failed += delivery.failed;
    }
    Ok(summary)
}
