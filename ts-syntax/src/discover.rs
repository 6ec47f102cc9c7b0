//! Directory walking with glob include/ignore filters.
//!
//! Results are project-relative paths with `/` separators, sorted, so callers
//! can use them directly as [`crate::project::Project`] keys.

use crate::{errors::Result, specifier::to_unix_sep};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Directories never descended into.
const SKIPPED_DIRS: [&str; 4] = [".git", "node_modules", "target", ".idea"];

/// Compile `patterns` into one set; blank patterns are ignored.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        if pat.trim().is_empty() {
            continue;
        }
        builder.add(Glob::new(pat.trim())?);
    }
    Ok(builder.build()?)
}

fn keep_entry(e: &DirEntry) -> bool {
    if e.depth() == 0 || !e.file_type().is_dir() {
        return true;
    }
    let name = e.file_name().to_string_lossy();
    !SKIPPED_DIRS.contains(&name.as_ref())
}

/// Files under `root` matching any `include` glob and no `ignore` glob.
pub fn walk_matching(root: &Path, include: &[String], ignore: &[String]) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(include)?;
    let ignore_set = build_globset(ignore)?;

    let mut out = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(keep_entry);
    for entry in walker.filter_map(std::result::Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel = to_unix_sep(rel.to_string_lossy());
        if !include_set.is_match(&rel) {
            continue;
        }
        if ignore_set.is_match(&rel) {
            debug!("discover: ignore {rel}");
            continue;
        }
        out.push(PathBuf::from(rel));
    }
    out.sort();
    info!("discover: {} file(s) under {}", out.len(), root.display());
    Ok(out)
}
