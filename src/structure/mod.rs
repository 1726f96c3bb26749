//! Repository Structure Fan-out
//!
//! Runs structure extraction for many jobs with bounded concurrency and
//! persists one document per job. Jobs whose document already exists are
//! skipped, so an interrupted run can simply be started again.

mod extractor;
mod source;
mod store;

pub use extractor::{GitStructureExtractor, StructureExtractor, build_tree, checkout_dir};
pub use source::{Job, JobSource, JsonJobSource, parse_jobs, validate_instance_id};
pub use store::StructureStore;

use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::StructureConfig;
use crate::types::Result;

/// What happened to a single job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Saved(PathBuf),
    Skipped(PathBuf),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.saved + self.skipped + self.failed
    }
}

pub struct StructureRunner {
    extractor: Arc<dyn StructureExtractor>,
    store: StructureStore,
    workers: usize,
    workdir: PathBuf,
}

impl StructureRunner {
    pub fn new(
        extractor: Arc<dyn StructureExtractor>,
        store: StructureStore,
        workers: usize,
        workdir: impl AsRef<Path>,
    ) -> Self {
        Self {
            extractor,
            store,
            workers: workers.max(1),
            workdir: workdir.as_ref().to_path_buf(),
        }
    }

    /// Runner using `git` and the configured directories
    pub fn from_config(config: &StructureConfig) -> Self {
        Self::new(
            Arc::new(GitStructureExtractor::new(&config.clone_base)),
            StructureStore::new(&config.output_dir),
            config.effective_workers(),
            &config.workdir,
        )
    }

    /// Process one job: skip when its document exists, otherwise extract and save
    pub async fn run_job(&self, job: &Job) -> Result<JobOutcome> {
        let path = self.store.path_for(&job.instance_id)?;
        if self.store.exists(&job.instance_id).await? {
            return Ok(JobOutcome::Skipped(path));
        }

        let document = self
            .extractor
            .build_structure(job, &self.workdir)
            .await?;
        let path = self.store.save(&job.instance_id, &document).await?;
        Ok(JobOutcome::Saved(path))
    }

    /// Run every job; a failing job is logged and counted, never fatal
    pub async fn run(&self, jobs: Vec<Job>) -> RunSummary {
        let total = jobs.len();
        let mut summary = RunSummary::default();

        info!(total, workers = self.workers, "Starting structure extraction");

        let mut stream = futures::stream::iter(jobs)
            .map(|job| async move {
                let outcome = self.run_job(&job).await;
                (job, outcome)
            })
            .buffer_unordered(self.workers);

        let mut done = 0;
        while let Some((job, outcome)) = stream.next().await {
            done += 1;
            match outcome {
                Ok(JobOutcome::Saved(path)) => {
                    summary.saved += 1;
                    info!(
                        instance_id = %job.instance_id,
                        "[{}/{}] Saved {}",
                        done,
                        total,
                        path.display()
                    );
                }
                Ok(JobOutcome::Skipped(path)) => {
                    summary.skipped += 1;
                    info!(
                        instance_id = %job.instance_id,
                        "[{}/{}] File {} already exists, skipping",
                        done,
                        total,
                        path.display()
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(
                        instance_id = %job.instance_id,
                        error = %e,
                        "[{}/{}] Exception occurred while processing instance",
                        done,
                        total
                    );
                }
            }
        }

        info!(
            saved = summary.saved,
            skipped = summary.skipped,
            failed = summary.failed,
            "All instances processed"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DispatchError;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingExtractor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StructureExtractor for CountingExtractor {
        async fn build_structure(&self, job: &Job, _workdir: &Path) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if job.instance_id.starts_with("bad") {
                return Err(DispatchError::Git("clone failed".to_string()));
            }
            Ok(json!({"instance_id": job.instance_id, "structure": {}}))
        }
    }

    fn job(id: &str) -> Job {
        Job {
            instance_id: id.to_string(),
            repo: "owner/repo".to_string(),
            base_commit: "deadbeef".to_string(),
        }
    }

    #[tokio::test]
    async fn test_second_run_makes_no_extractor_calls() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = Arc::new(CountingExtractor::default());
        let runner = StructureRunner::new(
            extractor.clone(),
            StructureStore::new(dir.path().join("out")),
            4,
            dir.path().join("work"),
        );
        let jobs: Vec<Job> = (0..6).map(|i| job(&format!("repo-{}", i))).collect();

        let first = runner.run(jobs.clone()).await;
        assert_eq!(first.saved, 6);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 6);

        let second = runner.run(jobs).await;
        assert_eq!(second.skipped, 6);
        assert_eq!(second.saved, 0);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let runner = StructureRunner::new(
            Arc::new(CountingExtractor::default()),
            StructureStore::new(dir.path()),
            2,
            dir.path(),
        );

        let summary = runner
            .run(vec![job("ok-1"), job("bad-1"), job("ok-2"), job("../bad")])
            .await;

        assert_eq!(
            summary,
            RunSummary {
                saved: 2,
                skipped: 0,
                failed: 2
            }
        );
        assert_eq!(summary.total(), 4);
        assert!(dir.path().join("ok-1.json").exists());
        assert!(!dir.path().join("bad-1.json").exists());
    }

    #[tokio::test]
    async fn test_run_job_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let runner = StructureRunner::new(
            Arc::new(CountingExtractor::default()),
            StructureStore::new(dir.path()),
            0,
            dir.path(),
        );

        let path = dir.path().join("one.json");
        assert_eq!(
            runner.run_job(&job("one")).await.unwrap(),
            JobOutcome::Saved(path.clone())
        );
        assert_eq!(
            runner.run_job(&job("one")).await.unwrap(),
            JobOutcome::Skipped(path)
        );
    }
}
