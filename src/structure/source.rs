//! Job Sources
//!
//! A dataset file is either one JSON array or JSON lines, one record per
//! line. Only `instance_id`, `repo` and `base_commit` are read.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::{DispatchError, Result};

/// One extraction job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub instance_id: String,
    /// `owner/name`
    pub repo: String,
    pub base_commit: String,
}

impl Job {
    /// The instance id, checked to be a single plain path component.
    ///
    /// It names both the output document and the scratch checkout, so it
    /// must never resolve outside the directory it is joined onto.
    pub fn file_stem(&self) -> Result<&str> {
        validate_instance_id(&self.instance_id)?;
        Ok(&self.instance_id)
    }
}

/// Reject ids that are empty, `.`/`..`, absolute or contain separators
pub fn validate_instance_id(instance_id: &str) -> Result<()> {
    if instance_id.is_empty()
        || instance_id == "."
        || instance_id == ".."
        || instance_id.contains(['/', '\\', '\0'])
        || Path::new(instance_id).is_absolute()
    {
        return Err(DispatchError::structure(
            instance_id,
            "instance_id is not a valid file name",
        ));
    }
    Ok(())
}

pub trait JobSource {
    fn jobs(&self) -> Result<Vec<Job>>;
}

impl JobSource for Vec<Job> {
    fn jobs(&self) -> Result<Vec<Job>> {
        Ok(self.clone())
    }
}

/// Jobs read from a `.json` or `.jsonl` file
#[derive(Debug, Clone)]
pub struct JsonJobSource {
    path: PathBuf,
}

impl JsonJobSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl JobSource for JsonJobSource {
    fn jobs(&self) -> Result<Vec<Job>> {
        let content = std::fs::read_to_string(&self.path)?;
        parse_jobs(&content)
    }
}

pub fn parse_jobs(content: &str) -> Result<Vec<Job>> {
    if content.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(content)?);
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| {
                DispatchError::Config(format!("Invalid job record on line {}: {}", index + 1, e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_array_ignores_extra_fields() {
        let jobs = parse_jobs(
            r#"[{"instance_id": "astropy__astropy-12907", "repo": "astropy/astropy",
                 "base_commit": "d16bfe05", "problem_statement": "..."}]"#,
        )
        .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].repo, "astropy/astropy");
    }

    #[test]
    fn test_parse_jsonl() {
        let content = concat!(
            r#"{"instance_id": "a-1", "repo": "o/a", "base_commit": "abc"}"#,
            "\n\n",
            r#"{"instance_id": "b-2", "repo": "o/b", "base_commit": "def"}"#,
            "\n"
        );
        let jobs = parse_jobs(content).unwrap();
        assert_eq!(
            jobs.iter().map(|j| j.instance_id.as_str()).collect::<Vec<_>>(),
            vec!["a-1", "b-2"]
        );
    }

    #[test]
    fn test_parse_jsonl_reports_line() {
        let content = concat!(
            r#"{"instance_id": "a-1", "repo": "o/a", "base_commit": "abc"}"#,
            "\n",
            r#"{"instance_id": "b-2"}"#
        );
        let err = parse_jobs(content).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.jsonl");
        std::fs::write(
            &path,
            r#"{"instance_id": "a-1", "repo": "o/a", "base_commit": "abc"}"#,
        )
        .unwrap();

        let jobs = JsonJobSource::new(&path).jobs().unwrap();
        assert_eq!(jobs[0].base_commit, "abc");
        assert!(JsonJobSource::new(dir.path().join("missing.json")).jobs().is_err());
    }

    #[test]
    fn test_instance_id_must_be_plain_file_name() {
        for bad in ["", ".", "..", "/abs", "a/b", "a\\b", "nul\0id"] {
            assert!(validate_instance_id(bad).is_err(), "{bad:?} accepted");
        }
        let job = Job {
            instance_id: "sympy__sympy-20590".to_string(),
            repo: "sympy/sympy".to_string(),
            base_commit: "abc".to_string(),
        };
        assert_eq!(job.file_stem().unwrap(), "sympy__sympy-20590");
    }
}
