//! Conflict merger: folds a source file into an already occupied destination.
//!
//! Imports are reconciled by resolved target, never by specifier text, so
//! `./a` seen from two different directories compares correctly. Non-import
//! statements are appended verbatim and never deduplicated.

use crate::{errors::Result, oplog::Action, workspace::Workspace};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};
use ts_syntax::{
    Project,
    imports::{ImportDeclaration, NamedImport},
    specifier::{
        SpecifierStyle, is_relative, normalize_path, rebase_specifier, relative_specifier,
    },
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    /// New import declarations written into the destination.
    pub imports_added: usize,
    /// Named bindings added to imports the destination already had.
    pub bindings_added: usize,
    /// Source imports of the destination itself, dropped.
    pub self_imports_dropped: usize,
    /// Destination imports of the source, removed because its statements now live there.
    pub source_imports_removed: usize,
    pub statements_appended: usize,
}

/// What an import points at: a project file, or a package/alias specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ImportTarget {
    File(PathBuf),
    Module(String),
}

fn import_target(project: &Project, importer: &Path, spec: &str) -> ImportTarget {
    match project.resolve_module(importer, spec) {
        Some(path) => ImportTarget::File(path),
        None if is_relative(spec) => {
            let dir = importer.parent().unwrap_or(Path::new(""));
            ImportTarget::File(normalize_path(&dir.join(spec)))
        }
        None => ImportTarget::Module(spec.to_string()),
    }
}

/// `spec`, written in `source`, re-expressed for `dest` in the same style.
fn specifier_for(project: &Project, source: &Path, dest: &Path, spec: &str) -> String {
    match project.resolve_module(source, spec) {
        Some(target) => relative_specifier(dest, &target, SpecifierStyle::detect(spec, &target)),
        None => rebase_specifier(spec, source, dest),
    }
}

/// Merge `source` into `destination` and persist the destination.
///
/// The source file itself is left in place; the batch mover deletes it.
#[instrument(skip(ws), fields(source = %source.display(), destination = %destination.display()))]
pub async fn merge_files(ws: &Workspace, source: &Path, destination: &Path) -> Result<MergeSummary> {
    let (source, destination) = (ws.relative(source), ws.relative(destination));
    ws.log().record(
        Action::Merge,
        format!("{} into {}", source.display(), destination.display()),
    );

    let mut project = ws.project().await;
    ws.ensure_loaded(&mut project, &source).await?;
    ws.ensure_loaded(&mut project, &destination).await?;
    if ws.is_dry() {
        return Ok(MergeSummary::default());
    }
    merge_into(ws, &mut project, &source, &destination).await
}

pub(crate) async fn merge_into(
    ws: &Workspace,
    project: &mut Project,
    source: &Path,
    dest: &Path,
) -> Result<MergeSummary> {
    ws.ensure_loaded(project, source).await?;
    ws.ensure_loaded(project, dest).await?;

    let mut summary = MergeSummary::default();
    let source_imports = project.get(source)?.imports();

    for import in &source_imports {
        let target = import_target(project, source, &import.source.specifier);
        if target == ImportTarget::File(dest.to_path_buf()) {
            summary.self_imports_dropped += 1;
            debug!("merge: dropping self-import `{}`", import.source.specifier);
            continue;
        }
        let spec = specifier_for(project, source, dest, &import.source.specifier);

        let dest_imports = project.get(dest)?.imports();
        let bound: HashSet<&str> = dest_imports.iter().flat_map(|i| i.local_names()).collect();
        let same: Vec<&ImportDeclaration> = dest_imports
            .iter()
            .filter(|i| import_target(project, dest, &i.source.specifier) == target)
            .collect();

        let file = project.get_mut(dest)?;
        let Some(first) = same.first() else {
            file.insert_import(&import.text_with_specifier(&spec))?;
            summary.imports_added += 1;
            continue;
        };
        if import.is_side_effect_only() {
            continue;
        }

        let quoted = first.source.quoted(&spec);
        let type_kw = if import.type_only { "type " } else { "" };
        if let Some(ns) = &import.namespace_import {
            if !bound.contains(ns.as_str()) {
                file.insert_import(&import.text_with_specifier(&spec))?;
                summary.imports_added += 1;
            }
            continue;
        }
        if let Some(default) = &import.default_import {
            if !bound.contains(default.as_str()) {
                file.insert_import(&format!("import {type_kw}{default} from {quoted};"))?;
                summary.imports_added += 1;
            }
        }

        let missing: Vec<NamedImport> = import
            .named
            .iter()
            .filter(|n| !bound.contains(n.local_name()))
            .cloned()
            .collect();
        if missing.is_empty() {
            continue;
        }
        let host = same
            .iter()
            .find(|i| i.type_only == import.type_only && i.namespace_import.is_none());
        // A default import inserted above shifted the destination text.
        let host = match host {
            Some(h) => file.imports().into_iter().find(|i| i.span == h.span && i.text == h.text),
            None => None,
        };
        let added = match &host {
            Some(h) => file.add_named_imports(h, &missing)?,
            None => false,
        };
        if added {
            summary.bindings_added += missing.len();
        } else {
            let names = missing
                .iter()
                .map(NamedImport::render)
                .collect::<Vec<_>>()
                .join(", ");
            file.insert_import(&format!("import {type_kw}{{ {names} }} from {quoted};"))?;
            summary.imports_added += 1;
        }
    }

    // Destination imports of the source would now point at its own statements.
    let dest_imports = project.get(dest)?.imports();
    let stale: Vec<ImportDeclaration> = dest_imports
        .into_iter()
        .filter(|i| import_target(project, dest, &i.source.specifier) == ImportTarget::File(source.to_path_buf()))
        .collect();
    if !stale.is_empty() {
        summary.source_imports_removed = stale.len();
        project.get_mut(dest)?.remove_imports(&stale)?;
    }

    // Non-import statements, with their own relative specifiers re-expressed for `dest`.
    let body = {
        let mut copy = project.get(source)?.clone();
        let edits = copy
            .module_references()
            .into_iter()
            .filter(|r| r.is_relative())
            .filter_map(|r| {
                let spec = specifier_for(project, source, dest, &r.specifier);
                (spec != r.specifier).then(|| (r.span.byte_range(), r.quoted(&spec)))
            })
            .collect();
        copy.apply_edits(edits)?;
        summary.statements_appended = copy
            .top_level_statements()
            .iter()
            .filter(|s| !s.is_import)
            .count();
        copy.non_import_text()
    };
    if !body.is_empty() {
        project.get_mut(dest)?.append_block(&body)?;
    }

    ws.save_file(project, dest).await?;
    debug!("merge: {summary:?}");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RestructureConfig;
    use std::fs;

    async fn workspace(files: &[(&str, &str)], dry: bool) -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        for (path, text) in files {
            let abs = dir.path().join(path);
            fs::create_dir_all(abs.parent().unwrap()).unwrap();
            fs::write(abs, text).unwrap();
        }
        let ws = Workspace::open(RestructureConfig::new(dir.path()).with_dry(dry))
            .await
            .unwrap();
        (dir, ws)
    }

    #[tokio::test]
    async fn unions_imports_without_self_import() {
        let (dir, ws) = workspace(
            &[
                ("src/shared/x.ts", "export const x = 1;\nexport const y = 2;\n"),
                ("src/shared/z.ts", "export const z = 3;\n"),
                (
                    "src/new/b.ts",
                    "import { x } from '../shared/x';\n\nexport const b = x;\n",
                ),
                (
                    "src/old/b.ts",
                    "import { x, y } from '../shared/x';\nimport { b } from '../new/b';\nimport { z } from \"../shared/z\";\nimport React from 'react';\n\n// legacy\nexport const a = y + b + z;\n",
                ),
            ],
            false,
        )
        .await;

        let summary = merge_files(&ws, Path::new("src/old/b.ts"), Path::new("src/new/b.ts"))
            .await
            .unwrap();
        assert_eq!(summary.self_imports_dropped, 1);
        assert_eq!(summary.bindings_added, 1);
        assert_eq!(summary.imports_added, 2);
        assert_eq!(summary.statements_appended, 1);

        let merged = fs::read_to_string(dir.path().join("src/new/b.ts")).unwrap();
        assert_eq!(
            merged,
            "import { x, y } from '../shared/x';\nimport { z } from \"../shared/z\";\nimport React from 'react';\n\nexport const b = x;\n\n// legacy\nexport const a = y + b + z;\n"
        );
        assert!(!merged.contains("../new/b"));
    }

    #[tokio::test]
    async fn removes_destination_imports_of_source_and_rebases_reexports() {
        let (dir, ws) = workspace(
            &[
                ("lib/util.ts", "export const u = 1;\n"),
                ("a/types.ts", "export * from '../lib/util';\nexport type T = string;\n"),
                ("b/deep/types.ts", "import { T } from '../../a/types';\nexport const t: T = '';\n"),
            ],
            false,
        )
        .await;

        let summary = merge_files(&ws, Path::new("a/types.ts"), Path::new("b/deep/types.ts"))
            .await
            .unwrap();
        assert_eq!(summary.source_imports_removed, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("b/deep/types.ts")).unwrap(),
            "export const t: T = '';\n\nexport * from '../../lib/util';\nexport type T = string;\n"
        );
    }

    #[tokio::test]
    async fn dry_merge_leaves_files() {
        let files = [("a.ts", "export const a = 1;\n"), ("b/a.ts", "export const b = 2;\n")];
        let (dir, ws) = workspace(&files, true).await;
        merge_files(&ws, Path::new("a.ts"), Path::new("b/a.ts")).await.unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("b/a.ts")).unwrap(),
            "export const b = 2;\n"
        );
        assert_eq!(ws.log().entries(), vec!["[MERGE] a.ts into b/a.ts"]);
    }
}
