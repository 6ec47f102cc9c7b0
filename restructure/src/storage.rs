//! Async file-system primitives rooted at the workspace `cwd`.
//!
//! Every path argument is relative to the root. Errors carry the absolute
//! path they happened on.

use crate::errors::{RestructureError, Result};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, rel: &Path) -> PathBuf {
        self.root.join(rel)
    }

    pub async fn exists(&self, rel: &Path) -> Result<bool> {
        let abs = self.resolve(rel);
        fs::try_exists(&abs)
            .await
            .map_err(|e| RestructureError::io(abs, e))
    }

    pub async fn read_text(&self, rel: &Path) -> Result<String> {
        let abs = self.resolve(rel);
        match fs::read_to_string(&abs).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(RestructureError::FileNotFound(rel.to_path_buf()))
            }
            Err(e) => Err(RestructureError::io(abs, e)),
        }
    }

    /// Write `text`, creating parent directories.
    #[instrument(level = "debug", skip(self, text), fields(path = %rel.display()))]
    pub async fn write_text(&self, rel: &Path, text: &str) -> Result<()> {
        let abs = self.resolve(rel);
        self.create_parent(&abs).await?;
        fs::write(&abs, text)
            .await
            .map_err(|e| RestructureError::io(abs, e))
    }

    /// Append `text`, creating the file (and its parents) when missing.
    pub async fn append_text(&self, rel: &Path, text: &str) -> Result<()> {
        let abs = self.resolve(rel);
        self.create_parent(&abs).await?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&abs)
            .await
            .map_err(|e| RestructureError::io(&abs, e))?;
        file.write_all(text.as_bytes())
            .await
            .map_err(|e| RestructureError::io(&abs, e))?;
        file.flush().await.map_err(|e| RestructureError::io(abs, e))
    }

    /// Remove a file; a file that is already gone is not an error.
    pub async fn remove(&self, rel: &Path) -> Result<()> {
        let abs = self.resolve(rel);
        match fs::remove_file(&abs).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("remove: {} already gone", rel.display());
                Ok(())
            }
            Err(e) => Err(RestructureError::io(abs, e)),
        }
    }

    /// Move a file, creating the destination's parents.
    ///
    /// Falls back to copy + delete when a plain rename fails (e.g. across devices).
    #[instrument(level = "debug", skip(self), fields(from = %from.display(), to = %to.display()))]
    pub async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let src = self.resolve(from);
        let dst = self.resolve(to);
        if !fs::try_exists(&src)
            .await
            .map_err(|e| RestructureError::io(&src, e))?
        {
            return Err(RestructureError::FileNotFound(from.to_path_buf()));
        }
        self.create_parent(&dst).await?;
        if let Err(e) = fs::rename(&src, &dst).await {
            debug!("rename failed ({e}); copying instead");
            fs::copy(&src, &dst)
                .await
                .map_err(|e| RestructureError::io(&dst, e))?;
            fs::remove_file(&src)
                .await
                .map_err(|e| RestructureError::io(&src, e))?;
        }
        Ok(())
    }

    async fn create_parent(&self, abs: &Path) -> Result<()> {
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| RestructureError::io(parent, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_append_rename_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        let a = Path::new("deep/a.ts");
        let b = Path::new("other/b.ts");

        storage.write_text(a, "one\n").await.unwrap();
        storage.append_text(a, "two\n").await.unwrap();
        assert_eq!(storage.read_text(a).await.unwrap(), "one\ntwo\n");

        storage.rename(a, b).await.unwrap();
        assert!(!storage.exists(a).await.unwrap());
        assert_eq!(storage.read_text(b).await.unwrap(), "one\ntwo\n");

        storage.remove(b).await.unwrap();
        storage.remove(b).await.unwrap();
        assert!(matches!(
            storage.read_text(b).await,
            Err(RestructureError::FileNotFound(_))
        ));
        assert!(matches!(
            storage.rename(b, a).await,
            Err(RestructureError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn append_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        storage.append_text(Path::new("n/new.ts"), "x\n").await.unwrap();
        assert_eq!(storage.read_text(Path::new("n/new.ts")).await.unwrap(), "x\n");
    }
}
