//! Structure Command
//!
//! Extract repository structures for every job in a dataset file.
//!
//! Usage:
//!   llm-dispatch structure dataset.jsonl [--output-dir DIR] [--workdir DIR] [--workers N]

use std::path::{Path, PathBuf};

use crate::cli::Output;
use crate::config::{ConfigLoader, StructureConfig};
use crate::structure::{JobSource, JsonJobSource, RunSummary, StructureRunner};
use crate::types::Result;

/// Command-line overrides for the `[structure]` section
#[derive(Debug, Clone, Default)]
pub struct StructureOverrides {
    pub output_dir: Option<PathBuf>,
    pub workdir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub clone_base: Option<String>,
}

impl StructureOverrides {
    pub fn apply(self, mut config: StructureConfig) -> StructureConfig {
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(workdir) = self.workdir {
            config.workdir = workdir;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(clone_base) = self.clone_base {
            config.clone_base = clone_base;
        }
        config
    }
}

pub async fn run(dataset: &Path, overrides: StructureOverrides) -> Result<RunSummary> {
    let config = overrides.apply(ConfigLoader::load()?.structure);
    let jobs = JsonJobSource::new(dataset).jobs()?;

    let out = Output::new();
    out.info(&format!(
        "{} instance(s), {} worker(s) → {}",
        jobs.len(),
        config.effective_workers(),
        config.output_dir.display()
    ));

    let summary = StructureRunner::from_config(&config).run(jobs).await;

    out.header("All instances processed");
    out.field("Saved", summary.saved);
    out.field("Skipped", summary.skipped);
    out.field("Failed", summary.failed);
    if summary.failed > 0 {
        out.warning("Some instances failed; re-run to retry them");
    }

    Ok(summary)
}
