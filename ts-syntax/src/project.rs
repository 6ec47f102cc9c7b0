//! In-memory project: every tracked source file, keyed by project-relative path.
//!
//! The project never touches storage itself (apart from [`Project::discover`]).
//! Callers load texts with [`Project::add_file`] and persist with
//! [`Project::take_pending`], which hands back dirty texts and the old paths of
//! moved files.

use crate::{
    discover::walk_matching,
    errors::{Result, SyntaxError},
    index::{FileIndex, ImportedName},
    model::language::LanguageKind,
    source_file::SourceFile,
    specifier::{
        SpecifierStyle, candidate_paths, is_relative, normalize_path, rebase_specifier,
        relative_specifier,
    },
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    ops::Range,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Which files a project tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectOptions {
    pub include: Vec<String>,
    pub ignore: Vec<String>,
    /// Indentation for inserted class members when a file gives no hint.
    pub indent: Option<String>,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            include: vec!["**/*.ts".to_string(), "**/*.tsx".to_string()],
            ignore: vec!["**/dist/**".to_string(), "**/build/**".to_string()],
            indent: None,
        }
    }
}

/// Where an identifier is defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Resolution {
    /// Declared as `name` in another tracked file.
    Declaration { path: PathBuf, name: String },
    /// Declared in the file it was looked up from.
    Local,
    /// Imported from a package or a file outside the project.
    External { specifier: String },
    Unresolved,
}

/// Writes and removals accumulated since the last save.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingChanges {
    pub writes: Vec<(PathBuf, String)>,
    pub removals: Vec<PathBuf>,
}

impl PendingChanges {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.removals.is_empty()
    }
}

/// Result of a reference-aware move.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileMove {
    pub from: PathBuf,
    pub to: PathBuf,
    /// Other files whose specifiers were rewritten.
    pub updated: Vec<PathBuf>,
    /// Specifiers rewritten inside the moved file itself.
    pub own_rewrites: usize,
}

#[derive(Debug, Default)]
pub struct Project {
    files: BTreeMap<PathBuf, SourceFile>,
    removed: BTreeSet<PathBuf>,
    indexes: HashMap<PathBuf, FileIndex>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project-relative paths under `root` selected by `options`.
    pub fn discover(root: &Path, options: &ProjectOptions) -> Result<Vec<PathBuf>> {
        let files = walk_matching(root, &options.include, &options.ignore)?;
        Ok(files
            .into_iter()
            .filter(|p| LanguageKind::from_path(p).is_some())
            .collect())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }

    pub fn tracks(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize_path(path))
    }

    pub fn try_get(&self, path: &Path) -> Option<&SourceFile> {
        self.files.get(&normalize_path(path))
    }

    pub fn try_get_mut(&mut self, path: &Path) -> Option<&mut SourceFile> {
        self.files.get_mut(&normalize_path(path))
    }

    pub fn get(&self, path: &Path) -> Result<&SourceFile> {
        self.try_get(path)
            .ok_or_else(|| SyntaxError::FileNotFound(path.to_path_buf()))
    }

    pub fn get_mut(&mut self, path: &Path) -> Result<&mut SourceFile> {
        self.try_get_mut(path)
            .ok_or_else(|| SyntaxError::FileNotFound(path.to_path_buf()))
    }

    /// Track a file with the text storage holds. An already tracked file is kept as is.
    pub fn add_file(&mut self, path: &Path, text: String) -> Result<&mut SourceFile> {
        let key = normalize_path(path);
        if !self.files.contains_key(&key) {
            let file = SourceFile::parse(&key, text)?;
            self.removed.remove(&key);
            self.files.insert(key.clone(), file);
        }
        self.get_mut(&key)
    }

    /// Track a file that does not exist in storage yet; it is written on the next save.
    pub fn create_file(&mut self, path: &Path, text: String) -> Result<&mut SourceFile> {
        let key = normalize_path(path);
        if !self.files.contains_key(&key) {
            let mut file = SourceFile::parse(&key, text)?;
            file.mark_dirty();
            self.removed.remove(&key);
            self.files.insert(key.clone(), file);
        }
        self.get_mut(&key)
    }

    /// Stop tracking a file without queueing any storage change.
    pub fn forget(&mut self, path: &Path) -> Option<SourceFile> {
        let key = normalize_path(path);
        self.indexes.remove(&key);
        self.files.remove(&key)
    }

    /// Stop tracking a file and queue its removal for the next save.
    pub fn delete_file(&mut self, path: &Path) -> Result<()> {
        let key = normalize_path(path);
        self.forget(&key)
            .ok_or_else(|| SyntaxError::FileNotFound(key.clone()))?;
        self.removed.insert(key);
        Ok(())
    }

    /// The tracked file a relative `spec` written in `importer` points to.
    pub fn resolve_module(&self, importer: &Path, spec: &str) -> Option<PathBuf> {
        if !is_relative(spec) {
            return None;
        }
        candidate_paths(importer, spec)
            .into_iter()
            .find(|c| self.files.contains_key(c))
    }

    /// Move a tracked file to `to`, rewriting relative specifiers in the moved
    /// file and in every tracked file that referenced it.
    #[instrument(level = "debug", skip(self), fields(from = %from.display(), to = %to.display()))]
    pub fn move_file(&mut self, from: &Path, to: &Path) -> Result<FileMove> {
        let from = normalize_path(from);
        let to = normalize_path(to);
        if !self.files.contains_key(&from) {
            return Err(SyntaxError::FileNotFound(from));
        }
        if from == to {
            return Ok(FileMove {
                from,
                to,
                ..FileMove::default()
            });
        }
        if self.files.contains_key(&to) {
            return Err(SyntaxError::PathConflict { from, to });
        }
        LanguageKind::from_path(&to).ok_or_else(|| SyntaxError::UnsupportedFile(to.clone()))?;

        // Incoming references.
        let mut incoming: Vec<(PathBuf, Vec<(Range<usize>, String)>)> = Vec::new();
        for (path, file) in &self.files {
            if *path == from {
                continue;
            }
            let edits: Vec<_> = file
                .module_references()
                .into_iter()
                .filter(|r| r.is_relative())
                .filter(|r| self.resolve_module(path, &r.specifier).as_ref() == Some(&from))
                .filter_map(|r| {
                    let style = SpecifierStyle::detect(&r.specifier, &from);
                    let spec = relative_specifier(path, &to, style);
                    (spec != r.specifier).then(|| (r.span.byte_range(), r.quoted(&spec)))
                })
                .collect();
            if !edits.is_empty() {
                incoming.push((path.clone(), edits));
            }
        }

        // Outgoing references of the moved file.
        let own: Vec<_> = self.files[&from]
            .module_references()
            .into_iter()
            .filter(|r| r.is_relative())
            .filter_map(|r| {
                let spec = match self.resolve_module(&from, &r.specifier) {
                    Some(target) => {
                        let style = SpecifierStyle::detect(&r.specifier, &target);
                        let target = if target == from { to.clone() } else { target };
                        relative_specifier(&to, &target, style)
                    }
                    None => rebase_specifier(&r.specifier, &from, &to),
                };
                (spec != r.specifier).then(|| (r.span.byte_range(), r.quoted(&spec)))
            })
            .collect();

        let mut updated = Vec::with_capacity(incoming.len());
        for (path, edits) in incoming {
            if let Some(file) = self.files.get_mut(&path) {
                file.apply_edits(edits)?;
            }
            self.indexes.remove(&path);
            updated.push(path);
        }

        let own_rewrites = own.len();
        let mut file = self
            .files
            .remove(&from)
            .ok_or_else(|| SyntaxError::FileNotFound(from.clone()))?;
        file.apply_edits(own)?;
        file.relocate(to.clone())?;
        self.indexes.remove(&from);
        self.removed.insert(from.clone());
        self.removed.remove(&to);
        self.files.insert(to.clone(), file);

        debug!(
            "moved {} -> {} ({} referencing file(s) updated)",
            from.display(),
            to.display(),
            updated.len()
        );
        Ok(FileMove {
            from,
            to,
            updated,
            own_rewrites,
        })
    }

    /// Index of a tracked file, rebuilt when the file changed since it was taken.
    pub fn index(&mut self, path: &Path) -> Result<&FileIndex> {
        let key = normalize_path(path);
        let file = self
            .files
            .get(&key)
            .ok_or_else(|| SyntaxError::FileNotFound(key.clone()))?;
        let fresh = self
            .indexes
            .get(&key)
            .is_some_and(|idx| idx.version == file.version());
        if !fresh {
            let idx = FileIndex::build(file);
            self.indexes.insert(key.clone(), idx);
        }
        self.indexes
            .get(&key)
            .ok_or(SyntaxError::InvalidState("index missing after build"))
    }

    /// Resolve `name` as used in `file` to its defining declaration.
    ///
    /// Follows named, aliased, default and namespace-qualified imports and any
    /// chain of re-exports. Names declared in `file` itself resolve to
    /// [`Resolution::Local`].
    pub fn resolve_identifier(&mut self, file: &Path, name: &str) -> Result<Resolution> {
        let file = normalize_path(file);
        let (head, member) = match name.split_once('.') {
            Some((head, member)) => (head, Some(member)),
            None => (name, None),
        };
        let idx = self.index(&file)?.clone();

        if let Some((import, imported)) = idx.imported_binding(head) {
            let export_name = match (imported, member) {
                (ImportedName::Namespace, Some(member)) => member.to_string(),
                (ImportedName::Namespace, None) => return Ok(Resolution::Unresolved),
                (ImportedName::Default, _) => "default".to_string(),
                (ImportedName::Named(n), _) => n,
            };
            let mut visited = HashSet::new();
            return self.follow_import(&file, &import.source.specifier, &export_name, &mut visited);
        }
        if member.is_none() && idx.declares(name) {
            return Ok(Resolution::Local);
        }
        Ok(Resolution::Unresolved)
    }

    fn follow_import(
        &mut self,
        importer: &Path,
        specifier: &str,
        export_name: &str,
        visited: &mut HashSet<(PathBuf, String)>,
    ) -> Result<Resolution> {
        match self.resolve_module(importer, specifier) {
            Some(target) => self.resolve_export(&target, export_name, visited),
            None if is_relative(specifier) => Ok(Resolution::Unresolved),
            None => Ok(Resolution::External {
                specifier: specifier.to_string(),
            }),
        }
    }

    fn resolve_export(
        &mut self,
        path: &Path,
        export_name: &str,
        visited: &mut HashSet<(PathBuf, String)>,
    ) -> Result<Resolution> {
        if !visited.insert((path.to_path_buf(), export_name.to_string())) {
            return Ok(Resolution::Unresolved);
        }
        let idx = self.index(path)?.clone();

        if let Some(local) = idx.exports.get(export_name) {
            if idx.declares(local) {
                return Ok(Resolution::Declaration {
                    path: path.to_path_buf(),
                    name: local.clone(),
                });
            }
            if let Some((import, imported)) = idx.imported_binding(local) {
                let next = match imported {
                    ImportedName::Named(n) => n,
                    ImportedName::Default => "default".to_string(),
                    ImportedName::Namespace => return Ok(Resolution::Unresolved),
                };
                return self.follow_import(path, &import.source.specifier, &next, visited);
            }
            return Ok(Resolution::Unresolved);
        }

        for re in &idx.reexports {
            let original = match re {
                crate::imports::ReExport::Named { names, .. } => {
                    match names.iter().find(|(exported, _)| exported == export_name) {
                        Some((_, original)) => original.clone(),
                        None => continue,
                    }
                }
                crate::imports::ReExport::All { .. } if export_name != "default" => {
                    export_name.to_string()
                }
                crate::imports::ReExport::All { .. } => continue,
            };
            let found =
                self.follow_import(path, &re.source().specifier, &original, visited)?;
            if matches!(found, Resolution::Declaration { .. } | Resolution::External { .. }) {
                return Ok(found);
            }
        }
        Ok(Resolution::Unresolved)
    }

    /// Dirty texts and queued removals; every returned file is marked saved.
    pub fn take_pending(&mut self) -> PendingChanges {
        let mut writes = Vec::new();
        for (path, file) in self.files.iter_mut() {
            if file.is_dirty() {
                writes.push((path.clone(), file.text().to_string()));
                file.mark_saved();
            }
        }
        PendingChanges {
            writes,
            removals: std::mem::take(&mut self.removed).into_iter().collect(),
        }
    }

    /// Dirty text and removal state of one file, marking it saved.
    pub fn take_pending_for(&mut self, path: &Path) -> PendingChanges {
        let key = normalize_path(path);
        let mut pending = PendingChanges::default();
        if let Some(file) = self.files.get_mut(&key) {
            if file.is_dirty() {
                pending.writes.push((key.clone(), file.text().to_string()));
                file.mark_saved();
            }
        }
        if self.removed.remove(&key) {
            pending.removals.push(key);
        }
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(files: &[(&str, &str)]) -> Project {
        let mut p = Project::new();
        for (path, text) in files {
            p.add_file(Path::new(path), text.to_string()).unwrap();
        }
        p
    }

    #[test]
    fn move_rewrites_incoming_and_outgoing_specifiers() {
        let mut p = project(&[
            ("src/util.ts", "export const u = 1;\n"),
            ("src/a.ts", "import { u } from './util';\nimport { b } from \"./b.js\";\nexport const a = u + b;\n"),
            ("src/b.ts", "export const b = 2;\n"),
            ("src/main.ts", "import { a } from './a';\nexport * from './a';\n"),
        ]);

        let moved = p.move_file(Path::new("src/a.ts"), Path::new("src/feature/a.ts")).unwrap();
        assert_eq!(moved.updated, vec![PathBuf::from("src/main.ts")]);
        assert_eq!(moved.own_rewrites, 2);

        let a = p.get(Path::new("src/feature/a.ts")).unwrap();
        assert!(a.text().contains("from '../util';"));
        assert!(a.text().contains("from \"../b.js\";"));
        let main = p.get(Path::new("src/main.ts")).unwrap();
        assert_eq!(
            main.text(),
            "import { a } from './feature/a';\nexport * from './feature/a';\n"
        );
        assert!(!p.tracks(Path::new("src/a.ts")));

        let pending = p.take_pending();
        assert_eq!(pending.removals, vec![PathBuf::from("src/a.ts")]);
        let written: Vec<_> = pending.writes.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(
            written,
            vec![PathBuf::from("src/feature/a.ts"), PathBuf::from("src/main.ts")]
        );
        assert!(p.take_pending().is_empty());
    }

    #[test]
    fn move_onto_tracked_path_conflicts() {
        let mut p = project(&[("a.ts", ""), ("b/a.ts", "")]);
        assert!(matches!(
            p.move_file(Path::new("a.ts"), Path::new("b/a.ts")),
            Err(SyntaxError::PathConflict { .. })
        ));
    }

    #[test]
    fn resolves_through_aliases_defaults_and_reexports() {
        let mut p = project(&[
            ("src/base.ts", "export class Base {}\nexport default class Root {}\n"),
            ("src/barrel/index.ts", "export * from '../base';\nexport { Base as Renamed } from '../base';\n"),
            (
                "src/child.ts",
                "import { Renamed as R } from './barrel';\nimport Root from './base';\nimport * as b from './barrel';\nimport { Ext } from 'pkg';\nclass Own {}\n",
            ),
        ]);
        let child = Path::new("src/child.ts");
        let base = Resolution::Declaration {
            path: PathBuf::from("src/base.ts"),
            name: "Base".to_string(),
        };
        assert_eq!(p.resolve_identifier(child, "R").unwrap(), base);
        assert_eq!(p.resolve_identifier(child, "b.Base").unwrap(), base);
        assert_eq!(
            p.resolve_identifier(child, "Root").unwrap(),
            Resolution::Declaration {
                path: PathBuf::from("src/base.ts"),
                name: "Root".to_string(),
            }
        );
        assert_eq!(
            p.resolve_identifier(child, "Ext").unwrap(),
            Resolution::External {
                specifier: "pkg".to_string()
            }
        );
        assert_eq!(p.resolve_identifier(child, "Own").unwrap(), Resolution::Local);
        assert_eq!(p.resolve_identifier(child, "Nope").unwrap(), Resolution::Unresolved);
    }

    #[test]
    fn created_files_are_written_once() {
        let mut p = Project::new();
        p.create_file(Path::new("./x/new.ts"), "export {};\n".to_string()).unwrap();
        assert!(p.tracks(Path::new("x/new.ts")));
        let pending = p.take_pending_for(Path::new("x/new.ts"));
        assert_eq!(pending.writes.len(), 1);
        assert!(p.take_pending().is_empty());
    }
}
