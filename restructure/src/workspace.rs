//! Explicit project store: configuration, storage, syntax model and journal.
//!
//! A `Workspace` is opened once per script run and passed by reference to
//! every operation. The syntax model sits behind an async mutex that each
//! operation holds for the duration of one file mutation.

use crate::{
    config::RestructureConfig,
    errors::{RestructureError, Result},
    oplog::OpLog,
    storage::FsStorage,
};
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};
use ts_syntax::{PendingChanges, Project, specifier::normalize_path};

/// Files written and removed by one save.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SaveSummary {
    pub written: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct Workspace {
    config: RestructureConfig,
    storage: FsStorage,
    project: Mutex<Project>,
    log: OpLog,
}

impl Workspace {
    /// Validate `config`, then load every file its include/ignore globs select.
    #[instrument(skip_all, fields(cwd = %config.cwd.display(), dry = config.dry))]
    pub async fn open(config: RestructureConfig) -> Result<Self> {
        config.validate()?;
        let root = dunce::canonicalize(&config.cwd)
            .map_err(|e| RestructureError::io(&config.cwd, e))?;
        let storage = FsStorage::new(root.clone());

        let options = config.project.clone();
        let paths =
            tokio::task::spawn_blocking(move || Project::discover(&root, &options)).await??;

        let mut project = Project::new();
        for path in paths {
            let text = storage.read_text(&path).await?;
            if let Err(e) = project.add_file(&path, text) {
                warn!("workspace: skipping {}: {e}", path.display());
            }
        }
        info!("workspace: {} file(s) tracked", project.len());

        Ok(Self {
            config,
            storage,
            project: Mutex::new(project),
            log: OpLog::new(),
        })
    }

    pub fn config(&self) -> &RestructureConfig {
        &self.config
    }

    pub fn is_dry(&self) -> bool {
        self.config.dry
    }

    pub fn storage(&self) -> &FsStorage {
        &self.storage
    }

    pub fn log(&self) -> &OpLog {
        &self.log
    }

    pub async fn project(&self) -> MutexGuard<'_, Project> {
        self.project.lock().await
    }

    /// Project-relative form of `path`; absolute paths under the root are stripped.
    pub fn relative(&self, path: &Path) -> PathBuf {
        let rel = if path.is_absolute() {
            path.strip_prefix(self.storage.root()).unwrap_or(path)
        } else {
            path
        };
        normalize_path(rel)
    }

    /// Make sure `path` is tracked, loading it from storage if needed.
    pub async fn ensure_loaded(&self, project: &mut Project, path: &Path) -> Result<()> {
        if project.tracks(path) {
            return Ok(());
        }
        let text = self.storage.read_text(path).await?;
        project.add_file(path, text)?;
        debug!("workspace: loaded {} on demand", path.display());
        Ok(())
    }

    /// Like [`Self::ensure_loaded`], but a file missing from storage is created empty.
    pub async fn load_or_create(&self, project: &mut Project, path: &Path) -> Result<()> {
        if project.tracks(path) {
            return Ok(());
        }
        if self.storage.exists(path).await? {
            return self.ensure_loaded(project, path).await;
        }
        project.create_file(path, String::new())?;
        debug!("workspace: created {}", path.display());
        Ok(())
    }

    /// Persist one file's pending changes.
    pub async fn save_file(&self, project: &mut Project, path: &Path) -> Result<SaveSummary> {
        let pending = project.take_pending_for(path);
        self.apply(pending).await
    }

    /// Persist every dirty file and remove the old paths of moved files.
    #[instrument(skip(self))]
    pub async fn save_all(&self) -> Result<SaveSummary> {
        let pending = self.project.lock().await.take_pending();
        let summary = self.apply(pending).await?;
        info!(
            "workspace: saved {} file(s), removed {}",
            summary.written.len(),
            summary.removed.len()
        );
        Ok(summary)
    }

    async fn apply(&self, pending: PendingChanges) -> Result<SaveSummary> {
        if self.is_dry() || pending.is_empty() {
            return Ok(SaveSummary::default());
        }
        let mut summary = SaveSummary::default();
        for (path, text) in pending.writes {
            self.storage.write_text(&path, &text).await?;
            summary.written.push(path);
        }
        for path in pending.removals {
            self.storage.remove(&path).await?;
            summary.removed.push(path);
        }
        Ok(summary)
    }

    /// Flush everything and release the project.
    pub async fn close(self) -> Result<SaveSummary> {
        self.save_all().await
    }
}
