use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use tokio::fs::File;
use tracing::{debug, instrument};

use crate::fs::operations::{remove_if_exists, write_atomically};

/// Interface for abstracting the string keyed store the tracker persists into. Values are opaque
/// strings; the accessor decides whether they hold JSON.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns `None` when the key was never written or has been removed.
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    async fn remove_item(&self, key: &str) -> Result<()>;

    /// Removes every key in `keys`. Best effort: all keys are attempted and the first failure is
    /// reported afterwards, nothing is rolled back.
    async fn multi_remove(&self, keys: Vec<String>) -> Result<()>;
}

const LOCK_FILE_NAME: &str = ".lock";

/// The main realization of [KeyValueStore]. Every key lives in its own file inside `store_dir`,
/// replaced atomically on write. An advisory lock on `store_dir/.lock` is held for the duration of
/// a single get, set or remove, so a reader never sees a value mid write. A read followed by a
/// write is two separate locked steps: two processes changing the same key at once can lose one
/// of the updates.
pub struct FileKeyValueStore {
    store_dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(store_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&store_dir)?;

        Ok(Self { store_dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let name = key.trim_start_matches('@');
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(anyhow!("Illegal storage key {key:?}"));
        }
        Ok(self.store_dir.join(name))
    }

    async fn open_lock(&self) -> Result<File> {
        let path = self.store_dir.join(LOCK_FILE_NAME);
        File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .read(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open lock file {path:?}"))
    }

    async fn read_value(path: &Path) -> Result<Option<String>, std::io::Error> {
        match tokio::fs::read_to_string(path).await {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    #[instrument(skip(self))]
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        let lock = self.open_lock().await?;
        lock.lock_shared()?;
        let result = Self::read_value(&path).await;
        lock.unlock_async().await?;
        debug!("Read {path:?}");
        Ok(result?)
    }

    #[instrument(skip(self, value))]
    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let lock = self.open_lock().await?;
        lock.lock_exclusive()?;
        let result = write_atomically(&path, value.as_bytes()).await;
        lock.unlock_async().await?;
        result.with_context(|| format!("Failed to write {path:?}"))
    }

    #[instrument(skip(self))]
    async fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let lock = self.open_lock().await?;
        lock.lock_exclusive()?;
        let result = remove_if_exists(&path).await;
        lock.unlock_async().await?;
        result.with_context(|| format!("Failed to remove {path:?}"))
    }

    async fn multi_remove(&self, keys: Vec<String>) -> Result<()> {
        let mut first_error = None;
        for key in keys {
            if let Err(e) = self.remove_item(&key).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
