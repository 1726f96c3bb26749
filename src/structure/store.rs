//! Structure Store
//!
//! One pretty-printed JSON document per instance. A document's presence is
//! what marks a job as done.

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use std::path::{Path, PathBuf};

use super::source::validate_instance_id;
use crate::types::Result;

#[derive(Debug, Clone)]
pub struct StructureStore {
    output_dir: PathBuf,
}

impl StructureStore {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `{output_dir}/{instance_id}.json`
    pub fn path_for(&self, instance_id: &str) -> Result<PathBuf> {
        validate_instance_id(instance_id)?;
        Ok(self.output_dir.join(format!("{}.json", instance_id)))
    }

    pub async fn exists(&self, instance_id: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path_for(instance_id)?).await?)
    }

    /// Write the document with four-space indentation, non-ASCII kept as-is
    pub async fn save(&self, instance_id: &str, document: &Value) -> Result<PathBuf> {
        let path = self.path_for(instance_id)?;
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        document.serialize(&mut serializer)?;

        tokio::fs::write(&path, buf).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_and_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = StructureStore::new(dir.path().join("out"));

        assert!(!store.exists("django__django-1").await.unwrap());
        let path = store
            .save("django__django-1", &json!({"repo": "django/django", "note": "héllo"}))
            .await
            .unwrap();
        assert!(store.exists("django__django-1").await.unwrap());

        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains("héllo"));
        assert!(written.contains("\n    \"repo\""));
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let store = StructureStore::new("out");
        assert!(store.path_for("../escape").is_err());
        assert!(store.path_for("a/b").is_err());
        assert!(store.path_for("").is_err());
        assert_eq!(
            store.path_for("astropy__astropy-12907").unwrap(),
            PathBuf::from("out/astropy__astropy-12907.json")
        );
    }
}
