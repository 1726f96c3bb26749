//! Repository Structure Extraction
//!
//! Clones a repository at a given commit and turns its tree into a nested
//! JSON document: directories are objects, Python files carry their source
//! lines under `text`, every other file is an empty object.

use async_trait::async_trait;
use ignore::WalkBuilder;
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use super::source::Job;
use crate::types::{DispatchError, Result};

#[async_trait]
pub trait StructureExtractor: Send + Sync {
    /// Build the structure document for one job, using `workdir` as scratch space
    async fn build_structure(&self, job: &Job, workdir: &Path) -> Result<Value>;
}

/// Extractor backed by the `git` binary
#[derive(Debug, Clone)]
pub struct GitStructureExtractor {
    clone_base: String,
}

impl GitStructureExtractor {
    pub fn new(clone_base: impl Into<String>) -> Self {
        Self {
            clone_base: clone_base.into(),
        }
    }

    /// `{clone_base}/{repo}.git`
    pub fn clone_url(&self, repo: &str) -> String {
        format!("{}/{}.git", self.clone_base.trim_end_matches('/'), repo)
    }

    async fn checkout(&self, job: &Job, dest: &Path) -> Result<()> {
        if tokio::fs::try_exists(dest).await? {
            tokio::fs::remove_dir_all(dest).await?;
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let url = self.clone_url(&job.repo);
        debug!(instance_id = %job.instance_id, url = %url, "Cloning repository");
        run_git(&["clone", "--quiet", &url, &dest.to_string_lossy()], None).await?;
        run_git(&["checkout", "--quiet", &job.base_commit], Some(dest)).await
    }
}

#[async_trait]
impl StructureExtractor for GitStructureExtractor {
    async fn build_structure(&self, job: &Job, workdir: &Path) -> Result<Value> {
        let dest = checkout_dir(workdir, job)?;

        let result = async {
            self.checkout(job, &dest).await?;

            let root = dest.clone();
            let root_name = repo_dir_name(&job.repo).to_string();
            tokio::task::spawn_blocking(move || build_tree(&root, &root_name))
                .await
                .map_err(|e| DispatchError::structure(&job.instance_id, e.to_string()))?
        }
        .await;

        if let Err(e) = tokio::fs::remove_dir_all(&dest).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(instance_id = %job.instance_id, error = %e, "Failed to remove checkout");
        }

        Ok(json!({
            "repo": job.repo,
            "base_commit": job.base_commit,
            "instance_id": job.instance_id,
            "structure": result?,
        }))
    }
}

async fn run_git(args: &[&str], cwd: Option<&Path>) -> Result<()> {
    let mut cmd = Command::new("git");
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd
        .output()
        .await
        .map_err(|e| DispatchError::Git(format!("Failed to run git: {}. Is it installed?", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DispatchError::Git(format!(
            "git {} failed: {}",
            args.first().copied().unwrap_or_default(),
            stderr.trim()
        )));
    }
    Ok(())
}

fn repo_dir_name(repo: &str) -> &str {
    repo.rsplit('/').next().unwrap_or(repo)
}

/// Walk `root` into `{root_name: {...}}`; hidden files included, `.git` skipped
pub fn build_tree(root: &Path, root_name: &str) -> Result<Value> {
    let mut tree = Map::new();

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(|entry| entry.file_name() != ".git")
        .build();

    for entry in walker {
        let entry = entry.map_err(|e| DispatchError::Io(std::io::Error::other(e.to_string())))?;
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let components: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        if components.is_empty() {
            continue;
        }

        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        let leaf = if is_dir {
            Value::Object(Map::new())
        } else {
            file_node(entry.path())?
        };
        insert_path(&mut tree, &components, leaf)?;
    }

    let mut document = Map::new();
    document.insert(root_name.to_string(), Value::Object(tree));
    Ok(Value::Object(document))
}

fn file_node(path: &Path) -> Result<Value> {
    if path.extension().is_some_and(|ext| ext == "py") {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = text.lines().collect();
        return Ok(json!({ "text": lines }));
    }
    Ok(Value::Object(Map::new()))
}

fn insert_path(tree: &mut Map<String, Value>, components: &[String], leaf: Value) -> Result<()> {
    let Some((name, parents)) = components.split_last() else {
        return Ok(());
    };

    let mut node = tree;
    for dir in parents {
        node = node
            .entry(dir.clone())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| {
                DispatchError::Io(std::io::Error::other(format!(
                    "{} is both a file and a directory",
                    dir
                )))
            })?;
    }
    node.entry(name.clone()).or_insert(leaf);
    Ok(())
}

/// Scratch location for a job's checkout
pub fn checkout_dir(workdir: &Path, job: &Job) -> Result<PathBuf> {
    Ok(workdir.join(job.file_stem()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_clone_url() {
        let extractor = GitStructureExtractor::new("https://github.com/");
        assert_eq!(
            extractor.clone_url("astropy/astropy"),
            "https://github.com/astropy/astropy.git"
        );
    }

    #[test]
    fn test_repo_dir_name() {
        assert_eq!(repo_dir_name("django/django"), "django");
        assert_eq!(repo_dir_name("plain"), "plain");
    }

    #[test]
    fn test_build_tree() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("pkg/sub")).unwrap();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("pkg/mod.py"), "import os\n\ndef f():\n    pass\n").unwrap();
        fs::write(root.join("pkg/sub/data.txt"), "ignored content").unwrap();
        fs::write(root.join(".github.yml"), "hidden").unwrap();
        fs::write(root.join(".gitignore"), "pkg/\n").unwrap();
        fs::write(root.join(".git/HEAD"), "ref").unwrap();

        let tree = build_tree(root, "proj").unwrap();
        let proj = &tree["proj"];

        assert_eq!(
            proj["pkg"]["mod.py"]["text"],
            json!(["import os", "", "def f():", "    pass"])
        );
        assert_eq!(proj["pkg"]["sub"]["data.txt"], json!({}));
        assert_eq!(proj["empty"], json!({}));
        assert_eq!(proj[".github.yml"], json!({}));
        assert!(proj.get(".git").is_none());
    }

    #[tokio::test]
    async fn test_failed_clone_is_git_error_and_cleans_up() {
        let workdir = tempfile::tempdir().unwrap();
        let extractor = GitStructureExtractor::new("http://127.0.0.1:1");
        let job = Job {
            instance_id: "x-1".to_string(),
            repo: "o/x".to_string(),
            base_commit: "abc".to_string(),
        };

        let err = extractor
            .build_structure(&job, workdir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Git(_)));
        assert!(!checkout_dir(workdir.path(), &job).unwrap().exists());
    }

    #[tokio::test]
    async fn test_invalid_instance_id_leaves_workdir_untouched() {
        let workdir = tempfile::tempdir().unwrap();
        let sibling = workdir.path().join("other-job");
        fs::create_dir_all(&sibling).unwrap();
        fs::write(sibling.join("keep.txt"), "in use").unwrap();
        let outside = tempfile::tempdir().unwrap();
        let outside_id = outside.path().to_string_lossy().to_string();

        let extractor = GitStructureExtractor::new("http://127.0.0.1:1");
        for instance_id in ["", ".", "..", "/abs", outside_id.as_str()] {
            let job = Job {
                instance_id: instance_id.to_string(),
                repo: "o/x".to_string(),
                base_commit: "abc".to_string(),
            };
            assert!(checkout_dir(workdir.path(), &job).is_err());

            let err = extractor
                .build_structure(&job, workdir.path())
                .await
                .unwrap_err();
            assert!(matches!(err, DispatchError::Structure { .. }));
        }

        assert!(sibling.join("keep.txt").exists());
        assert!(outside.path().exists());
    }
}
