use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{CacheError, CacheKey, LookupCache};

/// Cache persisted as a single JSON object `{ "<key>": "<locator>" }`.
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, while holding the lock, so concurrent writers never interleave and
/// the file on disk is always a complete document.
pub struct JsonFileCache {
    path: PathBuf,
    entries: Mutex<HashMap<CacheKey, String>>,
}

impl JsonFileCache {
    /// Loads the cache from `path`.
    ///
    /// A missing file gives an empty cache. An unreadable or corrupt file is
    /// logged and also gives an empty cache; it is replaced on the next write.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<HashMap<CacheKey, String>>(&bytes) {
                Ok(entries) => {
                    debug!(path = %path.display(), entries = entries.len(), "Loaded search cache");
                    entries
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Search cache is corrupt, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read search cache, starting empty");
                HashMap::new()
            }
        };

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// In-memory cache that still writes to `path`, starting empty.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Location of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &HashMap<CacheKey, String>) -> Result<(), CacheError> {
        let json = serde_json::to_vec_pretty(entries)?;
        let persist_err = |source| CacheError::Persist {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(persist_err)?;
            }
        }

        let tmp = tmp_path(&self.path);
        if let Err(e) = tokio::fs::write(&tmp, &json).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(persist_err(e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(persist_err(e));
        }
        Ok(())
    }
}

#[async_trait]
impl LookupCache for JsonFileCache {
    async fn get(&self, key: &CacheKey) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    async fn put(&self, key: &CacheKey, locator: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().await;
        if entries.get(key).map(String::as_str) == Some(locator) {
            return Ok(());
        }
        entries.insert(key.clone(), locator.to_string());
        self.persist(&entries).await
    }

    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let cache = JsonFileCache::load(temp.path().join("cache.json")).await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_put_persists_and_reloads() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("cache.json");
        let key = CacheKey::from_parts("Artist", "Title");

        let cache = JsonFileCache::load(&path).await;
        cache.put(&key, "https://example.com/watch?v=1").await.unwrap();
        assert_eq!(
            cache.get(&key).await.as_deref(),
            Some("https://example.com/watch?v=1")
        );

        let reloaded = JsonFileCache::load(&path).await;
        assert_eq!(reloaded.len().await, 1);
        assert_eq!(
            reloaded.get(&key).await.as_deref(),
            Some("https://example.com/watch?v=1")
        );
        assert!(!tmp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty_and_is_replaced() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let cache = JsonFileCache::load(&path).await;
        assert!(cache.is_empty().await);

        let key = CacheKey::from_parts("A", "B");
        cache.put(&key, "loc").await.unwrap();

        let raw = std::fs::read(&path).unwrap();
        let parsed: HashMap<String, String> = serde_json::from_slice(&raw).unwrap();
        assert_eq!(parsed.get(key.as_str()).map(String::as_str), Some("loc"));
    }

    #[tokio::test]
    async fn test_same_value_put_is_noop() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache.json");
        let cache = JsonFileCache::load(&path).await;
        let key = CacheKey::from_parts("A", "B");

        cache.put(&key, "loc").await.unwrap();
        std::fs::remove_file(&path).unwrap();

        // Unchanged value does not rewrite the file.
        cache.put(&key, "loc").await.unwrap();
        assert!(!path.exists());

        cache.put(&key, "other").await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_concurrent_puts_leave_valid_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache.json");
        let cache = Arc::new(JsonFileCache::load(&path).await);

        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let key = CacheKey::from_parts("Artist", &format!("Song {}", i));
                cache.put(&key, &format!("loc-{}", i)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let raw = std::fs::read(&path).unwrap();
        let parsed: HashMap<String, String> = serde_json::from_slice(&raw).unwrap();
        assert_eq!(parsed.len(), 16);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_failure_keeps_memory_entry() {
        let temp = TempDir::new().unwrap();
        // Parent is a file, so the directory cannot be created.
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let cache = JsonFileCache::empty(blocker.join("cache.json"));

        let key = CacheKey::from_parts("A", "B");
        let result = cache.put(&key, "loc").await;
        assert!(matches!(result, Err(CacheError::Persist { .. })));
        assert_eq!(cache.get(&key).await.as_deref(), Some("loc"));
    }
}
