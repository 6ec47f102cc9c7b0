//! Glob selection of files relative to a directory.

use crate::errors::Result;
use std::path::{Path, PathBuf};
use tracing::instrument;
use ts_syntax::discover::walk_matching;

/// Files under `cwd` matching `pattern`, relative to `cwd`, sorted.
///
/// The walk runs on the blocking pool. A missing `cwd` matches nothing.
#[instrument(level = "debug", skip(cwd), fields(cwd = %cwd.display()))]
pub async fn match_files(pattern: &str, cwd: &Path) -> Result<Vec<PathBuf>> {
    if !tokio::fs::try_exists(cwd).await.unwrap_or(false) {
        return Ok(Vec::new());
    }
    let root = cwd.to_path_buf();
    let include = vec![pattern.to_string()];
    let files = tokio::task::spawn_blocking(move || walk_matching(&root, &include, &[])).await??;
    Ok(files)
}
