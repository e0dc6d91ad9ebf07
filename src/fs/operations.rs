use std::path::{Path, PathBuf};

use tokio::{
    fs::{self, File},
    io::{self, AsyncWriteExt},
};

/// Replaces the contents of `path` with `contents` so that readers either see the old value or
/// the new one, never a half written file. The data goes into a sibling temp file which is synced
/// and then renamed over the target.
pub async fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), io::Error> {
    let tmp_path = temp_path_for(path);

    let result = async {
        let mut file = File::create(&tmp_path).await?;
        file.write_all(contents).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, path).await
    }
    .await;

    if result.is_err() {
        // Leftover temp files would only confuse the next write.
        let _ = fs::remove_file(&tmp_path).await;
    }
    result
}

/// Removes `path`, treating an already missing file as success.
pub async fn remove_if_exists(path: &Path) -> Result<(), io::Error> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|v| v.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{remove_if_exists, temp_path_for, write_atomically};

    #[tokio::test]
    async fn test_write_atomically_replaces_contents() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("value");

        write_atomically(&path, b"first").await?;
        write_atomically(&path, b"second").await?;

        assert_eq!(tokio::fs::read_to_string(&path).await?, "second");
        assert!(!temp_path_for(&path).exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_write_atomically_missing_dir_fails_cleanly() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("missing").join("value");

        assert!(write_atomically(&path, b"value").await.is_err());
        assert!(!temp_path_for(&path).exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_if_exists_ignores_missing() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("value");

        remove_if_exists(&path).await?;
        write_atomically(&path, b"value").await?;
        remove_if_exists(&path).await?;

        assert!(!path.exists());
        Ok(())
    }
}
