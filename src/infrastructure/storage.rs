//! JSON files under the data directory

use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::DomainError;

/// Read and decode `path`; a missing file is `None`
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, DomainError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(DomainError::storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )));
        }
    };

    let value = serde_json::from_slice(&bytes)
        .map_err(|e| DomainError::storage(format!("Corrupt file {}: {}", path.display(), e)))?;

    Ok(Some(value))
}

/// Encode as pretty JSON and replace `path` atomically, creating parents
pub(crate) async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), DomainError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            DomainError::storage(format!("Failed to create {}: {}", dir.display(), e))
        })?;
    }

    let json = serde_json::to_vec_pretty(value).map_err(|e| {
        DomainError::internal(format!("Failed to encode {}: {}", path.display(), e))
    })?;

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomically(&target, &json))
        .await
        .map_err(|e| DomainError::internal(format!("Write task failed: {}", e)))?
}

/// Remove `path`; a missing file is fine
pub(crate) async fn remove(path: &Path) -> Result<(), DomainError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DomainError::storage(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Write through a uniquely named sibling temp file, then rename over `path`
fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), DomainError> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        DomainError::storage(format!("Failed to create temp file in {}: {}", dir.display(), e))
    })?;
    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| {
            DomainError::storage(format!("Failed to write {}: {}", tmp.path().display(), e))
        })?;
    tmp.persist(path).map_err(|e| {
        DomainError::storage(format!("Failed to replace {}: {}", path.display(), e.error))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_write_creates_parents_and_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b.json");

        let mut value = BTreeMap::new();
        value.insert("k".to_string(), 1u32);
        write_json(&path, &value).await.unwrap();

        let loaded: Option<BTreeMap<String, u32>> = read_json(&path).await.unwrap();
        assert_eq!(loaded, Some(value));

        remove(&path).await.unwrap();
        remove(&path).await.unwrap();
        let loaded: Option<BTreeMap<String, u32>> = read_json(&path).await.unwrap();
        assert!(loaded.is_none());
    }
}
