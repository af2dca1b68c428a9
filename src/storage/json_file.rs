use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;

use super::Storage;

/// JSON file-based key/value storage.
///
/// Directory structure:
/// ```text
/// data/
///   store/
///     travelTransactions.json
///     travelTransactionsLastDate.json
/// ```
///
/// Each file holds the raw value for its key. Writes go through a temporary
/// file and a rename so a reader never sees a half-written snapshot.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    base_path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn store_dir(&self) -> PathBuf {
        self.base_path.join("store")
    }

    fn key_file(&self, key: &str) -> Result<PathBuf> {
        if !is_safe_key(key) {
            anyhow::bail!("Invalid storage key {key:?}: keys must be a single path segment");
        }
        Ok(self.store_dir().join(format!("{key}.json")))
    }
}

fn is_safe_key(key: &str) -> bool {
    if key.is_empty() || key == "." || key == ".." {
        return false;
    }
    !key.chars().any(|c| c == '/' || c == '\\' || c == '\0')
}

#[async_trait::async_trait]
impl Storage for JsonFileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_file(key)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_file(key)?;
        let dir = self.store_dir();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let dir = self.store_dir();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e).context("Failed to read store directory"),
        };

        while let Some(entry) = entries.next_entry().await.context("Failed to read entry")? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                fs::remove_file(&path)
                    .await
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
        }

        Ok(())
    }
}
