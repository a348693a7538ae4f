//! Durable key/value backends for the client session.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::StorageError;

/// Consumer-provided keyed string storage (the client-side equivalent of
/// browser local storage).
///
/// Keys are independent. The session store only ever writes full values, so a
/// backend needs per-key atomicity, nothing more.
///
/// # Example
///
/// ```rust,ignore
/// impl Storage for KeychainStorage {
///     async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
///         Ok(self.keychain.read(key)?)
///     }
///
///     async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
///         self.keychain.write(key, &value)?;
///         Ok(())
///     }
///
///     async fn remove(&self, key: &str) -> Result<(), StorageError> {
///         self.keychain.delete(key)?;
///         Ok(())
///     }
/// }
/// ```
pub trait Storage: Send + Sync + 'static {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Store several values. Backends that can write them in one go should override this.
    fn set_all(
        &self,
        entries: Vec<(&'static str, String)>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        async move {
            for (key, value) in entries {
                self.set(key, value).await?;
            }
            Ok(())
        }
    }

    /// Delete several keys, attempting every key even if one fails.
    fn remove_all(
        &self,
        keys: &'static [&'static str],
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        async move {
            let mut first_error = None;
            for key in keys {
                if let Err(e) = self.remove(key).await {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
            first_error.map_or(Ok(()), Err)
        }
    }
}

/// In-process storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.write().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn set_all(&self, entries: Vec<(&'static str, String)>) -> Result<(), StorageError> {
        let mut map = self.entries.write().await;
        for (key, value) in entries {
            map.insert(key.to_owned(), value);
        }
        Ok(())
    }

    async fn remove_all(&self, keys: &'static [&'static str]) -> Result<(), StorageError> {
        let mut map = self.entries.write().await;
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

#[cfg(feature = "file-store")]
pub use file::FileStorage;

#[cfg(feature = "file-store")]
mod file {
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use tokio::fs;
    use tokio::sync::Mutex;

    use super::Storage;
    use crate::error::StorageError;

    /// Storage persisted as a single JSON object on disk.
    ///
    /// Every mutation rewrites the file through a sibling temp file and a
    /// rename, so readers never observe a half-written file.
    #[derive(Debug, Clone)]
    pub struct FileStorage {
        path: PathBuf,
        entries: Arc<Mutex<BTreeMap<String, String>>>,
    }

    impl FileStorage {
        /// Open (or lazily create) the store at `path`.
        ///
        /// A missing file is an empty store. An unreadable or corrupt file is
        /// logged and also treated as empty; the next write replaces it.
        pub async fn open(path: impl Into<PathBuf>) -> Self {
            let path = path.into();
            let entries = load_entries(&path).await;
            Self {
                path,
                entries: Arc::new(Mutex::new(entries)),
            }
        }

        #[must_use]
        pub fn path(&self) -> &Path {
            &self.path
        }

        async fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).await?;
                }
            }
            let payload = serde_json::to_vec_pretty(entries)?;
            let mut tmp = self.path.clone().into_os_string();
            tmp.push(".tmp");
            fs::write(&tmp, payload).await?;
            fs::rename(&tmp, &self.path).await?;
            Ok(())
        }
    }

    async fn load_entries(path: &Path) -> BTreeMap<String, String> {
        match fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::error!(path = %path.display(), error = %err, "Failed to parse session file");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "Failed to read session file");
                BTreeMap::new()
            }
        }
    }

    impl Storage for FileStorage {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            Ok(self.entries.lock().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
            let mut entries = self.entries.lock().await;
            entries.insert(key.to_owned(), value);
            self.persist(&entries).await
        }

        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            let mut entries = self.entries.lock().await;
            if entries.remove(key).is_some() {
                self.persist(&entries).await?;
            }
            Ok(())
        }

        async fn set_all(&self, new_entries: Vec<(&'static str, String)>) -> Result<(), StorageError> {
            let mut entries = self.entries.lock().await;
            for (key, value) in new_entries {
                entries.insert(key.to_owned(), value);
            }
            self.persist(&entries).await
        }

        async fn remove_all(&self, keys: &'static [&'static str]) -> Result<(), StorageError> {
            let mut entries = self.entries.lock().await;
            let before = entries.len();
            for key in keys {
                entries.remove(*key);
            }
            if entries.len() != before {
                self.persist(&entries).await?;
            }
            Ok(())
        }
    }

}
