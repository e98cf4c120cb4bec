//! JSON export source system
//!
//! Reads a JSON array of entities exported from the source system, e.g. by
//! the directory export job that runs ahead of a synchronization. The file is
//! read when the first page of a run is requested, so later runs see a fresh
//! export.

use super::traits::SourceSystem;
use crate::domain::entity::{ObjectType, SyncEntity};
use crate::domain::errors::SourceSystemError;
use crate::domain::{Page, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Source system reading a JSON export file
pub struct JsonFileSource {
    system_name: String,
    path: PathBuf,
    cache: Mutex<Option<Vec<SyncEntity>>>,
}

impl JsonFileSource {
    pub fn new(system_name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            system_name: system_name.into(),
            path: path.as_ref().to_path_buf(),
            cache: Mutex::new(None),
        }
    }

    async fn read_export(&self) -> Result<Vec<SyncEntity>> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SourceSystemError::ConnectionFailed(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let mut entities: Vec<SyncEntity> = serde_json::from_str(&contents).map_err(|e| {
            SourceSystemError::InvalidFormat(format!(
                "Failed to parse {}: {}",
                self.path.display(),
                e
            ))
        })?;

        for entity in &mut entities {
            if entity.header().source.is_empty() {
                entity.header_mut().source = self.system_name.clone();
            }
        }

        tracing::debug!(
            path = %self.path.display(),
            count = entities.len(),
            "Loaded source export"
        );

        Ok(entities)
    }
}

#[async_trait]
impl SourceSystem for JsonFileSource {
    fn system_name(&self) -> &str {
        &self.system_name
    }

    fn object_types(&self) -> Vec<ObjectType> {
        ObjectType::ALL.to_vec()
    }

    async fn get_batch(
        &self,
        object_type: ObjectType,
        start: usize,
        batch_size: usize,
    ) -> Result<Page<SyncEntity>> {
        let mut cache = self.cache.lock().await;
        if start == 0 || cache.is_none() {
            *cache = Some(self.read_export().await?);
        }

        let of_type: Vec<SyncEntity> = cache
            .as_ref()
            .map(|all| {
                all.iter()
                    .filter(|e| e.object_type() == object_type)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(Page::slice(&of_type, start, batch_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::SyncError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_reads_entities_of_requested_type() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"object_type": "user", "user_name": "alice",
                  "external_ids": [{{"id": "E1", "source": "LDAP"}}]}},
                {{"object_type": "group", "name": "Engineering"}},
                {{"object_type": "user", "user_name": "bob", "source": "HR"}}
            ]"#
        )
        .unwrap();

        let source = JsonFileSource::new("LDAP", file.path());
        let page = source.get_batch(ObjectType::User, 0, 10).await.unwrap();

        assert_eq!(page.items.len(), 2);
        assert!(!page.has_more);
        assert_eq!(page.items[0].header().source, "LDAP");
        assert_eq!(page.items[1].header().source, "HR");
        assert!(page.items[0].external_id_for("ldap").is_some());
    }

    #[tokio::test]
    async fn test_missing_file_is_a_source_error() {
        let source = JsonFileSource::new("LDAP", "/nonexistent/export.json");
        let err = source.get_batch(ObjectType::User, 0, 10).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Source(SourceSystemError::ConnectionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_json_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        let source = JsonFileSource::new("LDAP", file.path());
        let err = source.get_batch(ObjectType::User, 0, 10).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Source(SourceSystemError::InvalidFormat(_))
        ));
    }
}
