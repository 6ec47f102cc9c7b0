//! Batch file mover.
//!
//! For every file selected under `from_dir` the destination is
//! `to_dir/<relative path>`. Each file goes down exactly one branch:
//!
//! 1. destination occupied and `auto_resolve_conflict` → merge, then delete the source
//!    (files the syntax model cannot parse are appended as text, with a warning)
//! 2. destination occupied → [`RestructureError::PathConflict`]
//! 3. `use_simple_move` → raw storage move; the project forgets the source
//! 4. tracked by the project → reference-aware move
//! 5. untracked → raw storage move with a warning
//!
//! Moves run as one set of joined futures; the first error aborts the batch,
//! with moves that already completed left in place.

use crate::{
    errors::{RestructureError, Result},
    glob::match_files,
    merger::merge_into,
    oplog::Action,
    workspace::Workspace,
};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use ts_syntax::{LanguageKind, specifier::normalize_path};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOptions {
    /// Merge into an occupied destination instead of failing.
    pub auto_resolve_conflict: bool,
    /// Move bytes only; no reference rewriting.
    pub use_simple_move: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Merged,
    /// Non-TypeScript collision: source text appended to the destination.
    Appended,
    SimpleMoved,
    /// Moved through the project; `updated` other files had specifiers rewritten.
    ProjectMoved { updated: usize },
    /// Untracked file moved in storage only.
    RawMoved,
    /// Source and destination are the same path.
    InPlace,
    /// Dry run: the branch was decided and logged, nothing changed.
    Planned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub from: PathBuf,
    pub to: PathBuf,
    pub outcome: MoveOutcome,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MoveSummary {
    pub files: Vec<FileOutcome>,
}

impl MoveSummary {
    pub fn count(&self, pred: impl Fn(&MoveOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }
}

/// An occupied destination found by [`check_conflicts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConflict {
    pub from: PathBuf,
    pub to: PathBuf,
}

async fn planned_moves(
    ws: &Workspace,
    from_dir: &Path,
    pattern: &str,
    to_dir: &Path,
) -> Result<Vec<(PathBuf, PathBuf)>> {
    let (from_dir, to_dir) = (ws.relative(from_dir), ws.relative(to_dir));
    let matched = match_files(pattern, &ws.storage().resolve(&from_dir)).await?;
    Ok(matched
        .into_iter()
        .map(|rel| {
            (
                normalize_path(&from_dir.join(&rel)),
                normalize_path(&to_dir.join(&rel)),
            )
        })
        .collect())
}

/// Move every file matching `pattern` under `from_dir` into `to_dir`.
///
/// Branches are decided and journaled for every file first, in path order,
/// so dry and real runs log the same lines; the moves then run concurrently.
#[instrument(skip(ws), fields(from_dir = %from_dir.display(), to_dir = %to_dir.display()))]
pub async fn move_files(
    ws: &Workspace,
    from_dir: &Path,
    pattern: &str,
    to_dir: &Path,
    options: MoveOptions,
) -> Result<MoveSummary> {
    let plan = planned_moves(ws, from_dir, pattern, to_dir).await?;
    info!("move_files: {} file(s) matched", plan.len());

    let mut decided = Vec::with_capacity(plan.len());
    for (from, to) in plan {
        let branch = decide(ws, &from, &to, options).await?;
        decided.push((from, to, branch));
    }

    if ws.is_dry() {
        let files = decided
            .into_iter()
            .map(|(from, to, _)| FileOutcome {
                from,
                to,
                outcome: MoveOutcome::Planned,
            })
            .collect();
        return Ok(MoveSummary { files });
    }

    let tasks = decided.into_iter().map(|(from, to, branch)| async move {
        let outcome = execute(ws, &from, &to, branch).await?;
        Ok::<_, RestructureError>(FileOutcome { from, to, outcome })
    });
    let files = try_join_all(tasks).await?;

    if files
        .iter()
        .any(|f| matches!(f.outcome, MoveOutcome::ProjectMoved { .. }))
    {
        ws.save_all().await?;
    }
    Ok(MoveSummary { files })
}

/// [`move_files`] with conflict merging and simple moves.
pub async fn move_and_merge(
    ws: &Workspace,
    from_dir: &Path,
    pattern: &str,
    to_dir: &Path,
) -> Result<MoveSummary> {
    let options = MoveOptions {
        auto_resolve_conflict: true,
        use_simple_move: true,
    };
    move_files(ws, from_dir, pattern, to_dir, options).await
}

/// Every destination a [`move_files`] call would find occupied.
pub async fn check_conflicts(
    ws: &Workspace,
    from_dir: &Path,
    pattern: &str,
    to_dir: &Path,
) -> Result<Vec<PathConflict>> {
    let mut conflicts = Vec::new();
    for (from, to) in planned_moves(ws, from_dir, pattern, to_dir).await? {
        if from != to && ws.storage().exists(&to).await? {
            conflicts.push(PathConflict { from, to });
        }
    }
    Ok(conflicts)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    InPlace,
    Merge,
    TextMerge,
    Simple,
    Project,
    Raw,
}

/// Pick the branch for one file and journal it. An occupied destination
/// without conflict merging fails here, before anything is moved.
async fn decide(ws: &Workspace, from: &Path, to: &Path, options: MoveOptions) -> Result<Branch> {
    let (src, dst) = (from.display(), to.display());
    if from == to {
        ws.log()
            .record(Action::Skip, format!("{src} is already in place"));
        return Ok(Branch::InPlace);
    }

    if ws.storage().exists(to).await? {
        if !options.auto_resolve_conflict {
            ws.log().record(Action::Move, format!("{src} -> {dst}"));
            return Err(RestructureError::PathConflict {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
            });
        }
        ws.log().record(Action::Merge, format!("{src} into {dst}"));
        if LanguageKind::from_path(from).is_none() {
            ws.log().record(
                Action::Warn,
                format!("{src} is not a TypeScript file; appended to {dst} as text"),
            );
            return Ok(Branch::TextMerge);
        }
        return Ok(Branch::Merge);
    }

    ws.log().record(Action::Move, format!("{src} -> {dst}"));
    if options.use_simple_move {
        return Ok(Branch::Simple);
    }
    if ws.project().await.try_get(from).is_some() {
        return Ok(Branch::Project);
    }
    ws.log().record(
        Action::Warn,
        format!("{src} is not tracked by the project; moved without updating references"),
    );
    Ok(Branch::Raw)
}

async fn execute(ws: &Workspace, from: &Path, to: &Path, branch: Branch) -> Result<MoveOutcome> {
    match branch {
        Branch::InPlace => Ok(MoveOutcome::InPlace),
        Branch::Merge => {
            let mut project = ws.project().await;
            merge_into(ws, &mut project, from, to).await?;
            ws.storage().remove(from).await?;
            project.forget(from);
            Ok(MoveOutcome::Merged)
        }
        Branch::TextMerge => {
            let storage = ws.storage();
            let text = storage.read_text(from).await?;
            let existing = storage.read_text(to).await?;
            let sep = if existing.is_empty() || existing.ends_with('\n') { "" } else { "\n" };
            storage.append_text(to, &format!("{sep}{text}")).await?;
            storage.remove(from).await?;
            Ok(MoveOutcome::Appended)
        }
        Branch::Simple => {
            ws.storage().rename(from, to).await?;
            ws.project().await.forget(from);
            Ok(MoveOutcome::SimpleMoved)
        }
        Branch::Project => {
            let moved = ws.project().await.move_file(from, to)?;
            Ok(MoveOutcome::ProjectMoved {
                updated: moved.updated.len(),
            })
        }
        Branch::Raw => {
            ws.storage().rename(from, to).await?;
            Ok(MoveOutcome::RawMoved)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RestructureConfig;
    use std::{collections::BTreeMap, fs};

    fn write_tree(root: &Path, files: &[(&str, &str)]) {
        for (path, text) in files {
            let abs = root.join(path);
            fs::create_dir_all(abs.parent().unwrap()).unwrap();
            fs::write(abs, text).unwrap();
        }
    }

    fn snapshot(root: &Path) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for entry in walk(root) {
            let rel = entry.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            out.insert(rel, fs::read_to_string(&entry).unwrap());
        }
        out
    }

    fn walk(dir: &Path) -> Vec<PathBuf> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                out.extend(walk(&path));
            } else {
                out.push(path);
            }
        }
        out
    }

    const LEGACY: &[(&str, &str)] = &[
        ("src/app/main.ts", "import { User } from '../legacy/models/user';\nimport { helper } from \"../legacy/util.js\";\n\nexport const u = new User(helper());\n"),
        ("src/legacy/models/user.ts", "import { helper } from '../util.js';\n\nexport class User {\n  constructor(readonly id: string) {}\n}\n"),
        ("src/legacy/util.ts", "export function helper(): string {\n  return 'x';\n}\n"),
        ("src/legacy/notes.txt", "plain text\n"),
    ];

    #[tokio::test]
    async fn project_aware_move_rewrites_references() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), LEGACY);
        let ws = Workspace::open(RestructureConfig::new(dir.path())).await.unwrap();

        let summary = move_files(
            &ws,
            Path::new("src/legacy"),
            "**/*.ts",
            Path::new("src/core"),
            MoveOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(
            summary.count(|o| matches!(o, MoveOutcome::ProjectMoved { .. })),
            2
        );

        let tree = snapshot(dir.path());
        assert!(!tree.contains_key("src/legacy/util.ts"));
        assert_eq!(
            tree["src/app/main.ts"],
            "import { User } from '../core/models/user';\nimport { helper } from \"../core/util.js\";\n\nexport const u = new User(helper());\n"
        );
        assert!(tree["src/core/models/user.ts"].starts_with("import { helper } from '../util.js';"));
        assert_eq!(tree["src/legacy/notes.txt"], "plain text\n");
    }

    #[tokio::test]
    async fn untracked_file_moves_raw_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), LEGACY);
        let before = snapshot(dir.path());
        let ws = Workspace::open(RestructureConfig::new(dir.path())).await.unwrap();

        let summary = move_files(
            &ws,
            Path::new("src/legacy"),
            "*.txt",
            Path::new("docs"),
            MoveOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(summary.files[0].outcome, MoveOutcome::RawMoved);
        assert_eq!(ws.log().count(Action::Warn), 1);

        let mut after = snapshot(dir.path());
        assert_eq!(after.remove("docs/notes.txt").as_deref(), Some("plain text\n"));
        let mut expected = before;
        expected.remove("src/legacy/notes.txt");
        assert_eq!(after, expected);
    }

    #[tokio::test]
    async fn occupied_destination_without_merge_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[("old/a.ts", "export const a = 1;\n"), ("new/a.ts", "export const b = 2;\n")],
        );
        let ws = Workspace::open(RestructureConfig::new(dir.path())).await.unwrap();

        let conflicts = check_conflicts(&ws, Path::new("old"), "**/*.ts", Path::new("new"))
            .await
            .unwrap();
        assert_eq!(
            conflicts,
            vec![PathConflict {
                from: PathBuf::from("old/a.ts"),
                to: PathBuf::from("new/a.ts"),
            }]
        );

        let err = move_files(
            &ws,
            Path::new("old"),
            "**/*.ts",
            Path::new("new"),
            MoveOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RestructureError::PathConflict { .. }));
        assert_eq!(
            fs::read_to_string(dir.path().join("new/a.ts")).unwrap(),
            "export const b = 2;\n"
        );
    }

    #[tokio::test]
    async fn move_and_merge_scenario() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("src/shared/x.ts", "export const x = 1;\n"),
                ("src/old/a.ts", "import { x } from '../shared/x';\n\nexport const a = x;\n"),
                ("src/old/b.ts", "import { x } from '../shared/x';\nimport { b } from '../new/b';\n\nexport const fromOld = b + x;\n"),
                ("src/new/b.ts", "import { x } from '../shared/x';\n\nexport const b = x;\n"),
            ],
        );
        let ws = Workspace::open(RestructureConfig::new(dir.path())).await.unwrap();

        let summary = move_and_merge(&ws, Path::new("src/old"), "**/*.ts", Path::new("src/new"))
            .await
            .unwrap();
        assert_eq!(summary.count(|o| *o == MoveOutcome::Merged), 1);
        assert_eq!(summary.count(|o| *o == MoveOutcome::SimpleMoved), 1);

        let tree = snapshot(dir.path());
        assert!(!tree.contains_key("src/old/a.ts") && !tree.contains_key("src/old/b.ts"));
        assert_eq!(
            tree["src/new/a.ts"],
            "import { x } from '../shared/x';\n\nexport const a = x;\n"
        );
        assert_eq!(
            tree["src/new/b.ts"],
            "import { x } from '../shared/x';\n\nexport const b = x;\n\nexport const fromOld = b + x;\n"
        );
        assert!(!ws.project().await.tracks(Path::new("src/old/b.ts")));
    }

    #[tokio::test]
    async fn dry_run_journal_matches_real_run() {
        let real_dir = tempfile::tempdir().unwrap();
        let dry_dir = tempfile::tempdir().unwrap();
        for d in [&real_dir, &dry_dir] {
            write_tree(d.path(), LEGACY);
            write_tree(d.path(), &[("src/core/util.ts", "export const other = 1;\n")]);
        }
        let before = snapshot(dry_dir.path());

        let real = Workspace::open(RestructureConfig::new(real_dir.path())).await.unwrap();
        let dry = Workspace::open(RestructureConfig::new(dry_dir.path()).with_dry(true))
            .await
            .unwrap();
        for ws in [&real, &dry] {
            move_and_merge(ws, Path::new("src/legacy"), "**/*", Path::new("src/core"))
                .await
                .unwrap();
        }

        assert_eq!(real.log().entries(), dry.log().entries());
        assert_eq!(snapshot(dry_dir.path()), before);
        assert_ne!(snapshot(real_dir.path()), before);
    }

    #[tokio::test]
    async fn non_typescript_collision_is_appended_as_text() {
        let files: &[(&str, &str)] = &[
            ("old/a.ts", "export const a = 1;\n"),
            ("old/data.json", "{\"b\": 2}\n"),
            ("new/data.json", "{\"a\": 1}"),
        ];
        let real_dir = tempfile::tempdir().unwrap();
        let dry_dir = tempfile::tempdir().unwrap();
        write_tree(real_dir.path(), files);
        write_tree(dry_dir.path(), files);

        let real = Workspace::open(RestructureConfig::new(real_dir.path())).await.unwrap();
        let dry = Workspace::open(RestructureConfig::new(dry_dir.path()).with_dry(true))
            .await
            .unwrap();
        let summary = move_and_merge(&real, Path::new("old"), "**/*", Path::new("new"))
            .await
            .unwrap();
        move_and_merge(&dry, Path::new("old"), "**/*", Path::new("new"))
            .await
            .unwrap();

        assert_eq!(summary.count(|o| *o == MoveOutcome::Appended), 1);
        assert_eq!(real.log().entries(), dry.log().entries());
        assert_eq!(real.log().count(Action::Warn), 1);

        let tree = snapshot(real_dir.path());
        assert_eq!(tree["new/data.json"], "{\"a\": 1}\n{\"b\": 2}\n");
        assert_eq!(tree["new/a.ts"], "export const a = 1;\n");
        assert!(!tree.contains_key("old/data.json") && !tree.contains_key("old/a.ts"));
    }

    #[tokio::test]
    async fn project_move_rewrites_loader_calls() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("src/old/u.ts", "export const u = 1;\n"),
                (
                    "src/app.ts",
                    "import { u } from './old/u';\n\nexport async function load() {\n  const lazy = await import('./old/u');\n  const cjs = require(\"./old/u\");\n  return [u, lazy, cjs];\n}\n",
                ),
                ("src/legacy.ts", "import legacy = require('./old/u');\nexport const l = legacy;\n"),
            ],
        );
        let ws = Workspace::open(RestructureConfig::new(dir.path())).await.unwrap();

        move_files(
            &ws,
            Path::new("src/old"),
            "*.ts",
            Path::new("src/new"),
            MoveOptions::default(),
        )
        .await
        .unwrap();

        let tree = snapshot(dir.path());
        assert_eq!(
            tree["src/app.ts"],
            "import { u } from './new/u';\n\nexport async function load() {\n  const lazy = await import('./new/u');\n  const cjs = require(\"./new/u\");\n  return [u, lazy, cjs];\n}\n"
        );
        assert_eq!(
            tree["src/legacy.ts"],
            "import legacy = require('./new/u');\nexport const l = legacy;\n"
        );
    }
}
