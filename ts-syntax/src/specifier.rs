//! Path normalization and relative module-specifier arithmetic.
//!
//! All project paths are relative to the project root and use `/` separators,
//! so they are stable keys regardless of platform. Specifier resolution is
//! lexical plus a lookup in the set of known files; `tsconfig` `paths`
//! aliasing is not modelled.

use std::path::{Component, Path, PathBuf};

/// Extensions tried, in order, for an extensionless relative specifier.
const SOURCE_EXTENSIONS: [&str; 3] = ["ts", "tsx", "d.ts"];
const INDEX_FILES: [&str; 2] = ["index.ts", "index.tsx"];

/// Replace OS-specific separators with `/`.
pub fn to_unix_sep<S: AsRef<str>>(s: S) -> String {
    s.as_ref().replace('\\', "/")
}

/// Lexically normalize a relative path: drop `.`, fold `dir/..`.
///
/// Leading `..` components that cannot be folded are kept.
pub fn normalize_path(p: &Path) -> PathBuf {
    let mut parts: Vec<String> = Vec::new();
    for c in p.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|l| l != "..") {
                    parts.pop();
                } else {
                    parts.push("..".to_string());
                }
            }
            Component::Normal(s) => parts.push(s.to_string_lossy().to_string()),
            Component::RootDir | Component::Prefix(_) => {}
        }
    }
    PathBuf::from(parts.join("/"))
}

/// `./x`, `../x`, `.` and `..` are relative; everything else is a package or alias.
pub fn is_relative(spec: &str) -> bool {
    spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../")
}

fn parent_dir(file: &Path) -> PathBuf {
    file.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Strip a TypeScript source extension (`.d.ts`, `.ts`, `.tsx`, `.mts`, `.cts`).
pub fn strip_source_extension(path: &Path) -> PathBuf {
    let s = to_unix_sep(path.to_string_lossy());
    for ext in [".d.ts", ".tsx", ".ts", ".mts", ".cts"] {
        if let Some(stem) = s.strip_suffix(ext) {
            return PathBuf::from(stem);
        }
    }
    PathBuf::from(s)
}

/// Candidate files a relative specifier may point to, most specific first.
///
/// `./a.js` also maps to `a.ts`/`a.tsx` (ESM-style imports of TS sources).
pub fn candidate_paths(importer: &Path, spec: &str) -> Vec<PathBuf> {
    let base = normalize_path(&parent_dir(importer).join(spec));
    let base_str = to_unix_sep(base.to_string_lossy());

    for js_ext in [".js", ".jsx", ".mjs", ".cjs"] {
        if let Some(stem) = base_str.strip_suffix(js_ext) {
            let ts_ext = match js_ext {
                ".jsx" => "tsx",
                ".mjs" => "mts",
                ".cjs" => "cts",
                _ => "ts",
            };
            return vec![
                PathBuf::from(format!("{stem}.{ts_ext}")),
                PathBuf::from(format!("{stem}.tsx")),
                base,
            ];
        }
    }
    if [".ts", ".tsx", ".mts", ".cts"]
        .iter()
        .any(|e| base_str.ends_with(e))
    {
        return vec![base];
    }

    let mut out: Vec<PathBuf> = SOURCE_EXTENSIONS
        .iter()
        .map(|ext| PathBuf::from(format!("{base_str}.{ext}")))
        .collect();
    out.extend(INDEX_FILES.iter().map(|index| base.join(index)));
    out
}

/// How a specifier spells its target, so rewrites keep the author's style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierStyle {
    /// `./a`
    Extensionless,
    /// `./a.js` for `a.ts`
    JsExtension,
    /// `./a.ts`
    Explicit,
    /// `./dir` for `dir/index.ts`
    DirectoryIndex,
}

impl SpecifierStyle {
    /// Detect the style of `spec`, which resolved to `target`.
    pub fn detect(spec: &str, target: &Path) -> Self {
        let target_str = to_unix_sep(target.to_string_lossy());
        let is_index = INDEX_FILES.iter().any(|i| target_str.ends_with(i));
        if [".js", ".jsx", ".mjs", ".cjs"].iter().any(|e| spec.ends_with(e)) {
            SpecifierStyle::JsExtension
        } else if [".ts", ".tsx", ".mts", ".cts"].iter().any(|e| spec.ends_with(e)) {
            SpecifierStyle::Explicit
        } else if is_index && !spec.ends_with("/index") {
            SpecifierStyle::DirectoryIndex
        } else {
            SpecifierStyle::Extensionless
        }
    }
}

/// Relative specifier from `importer` to `target`, spelled in `style`.
pub fn relative_specifier(importer: &Path, target: &Path, style: SpecifierStyle) -> String {
    let from_dir = parent_dir(importer);
    let target_str = to_unix_sep(target.to_string_lossy());

    let spelled: PathBuf = match style {
        SpecifierStyle::Explicit => target.to_path_buf(),
        SpecifierStyle::JsExtension => {
            let stem = strip_source_extension(target);
            let ext = if target_str.ends_with(".tsx") {
                "jsx"
            } else if target_str.ends_with(".mts") {
                "mjs"
            } else if target_str.ends_with(".cts") {
                "cjs"
            } else {
                "js"
            };
            PathBuf::from(format!("{}.{ext}", to_unix_sep(stem.to_string_lossy())))
        }
        SpecifierStyle::DirectoryIndex
            if target
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| INDEX_FILES.contains(&n)) =>
        {
            parent_dir(target)
        }
        SpecifierStyle::DirectoryIndex | SpecifierStyle::Extensionless => {
            strip_source_extension(target)
        }
    };

    let rel = pathdiff::diff_paths(&spelled, &from_dir).unwrap_or(spelled);
    dot_prefixed(&to_unix_sep(rel.to_string_lossy()))
}

/// Re-express a relative `spec` written in `old_importer` as seen from `new_importer`.
///
/// Purely lexical: works whether or not the target is loaded.
pub fn rebase_specifier(spec: &str, old_importer: &Path, new_importer: &Path) -> String {
    if !is_relative(spec) {
        return spec.to_string();
    }
    let target = normalize_path(&parent_dir(old_importer).join(spec));
    let new_dir = parent_dir(new_importer);
    let rel = pathdiff::diff_paths(&target, &new_dir).unwrap_or(target);
    let mut out = dot_prefixed(&to_unix_sep(rel.to_string_lossy()));
    if spec.ends_with('/') && !out.ends_with('/') {
        out.push('/');
    }
    out
}

fn dot_prefixed(rel: &str) -> String {
    if rel.is_empty() {
        ".".to_string()
    } else if rel == ".." || rel.starts_with("../") || rel.starts_with("./") {
        rel.to_string()
    } else {
        format!("./{rel}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_lexically() {
        assert_eq!(normalize_path(Path::new("src/./a/../b.ts")), PathBuf::from("src/b.ts"));
        assert_eq!(normalize_path(Path::new("../x/y")), PathBuf::from("../x/y"));
    }

    #[test]
    fn candidates_cover_extensions_and_index() {
        let c = candidate_paths(Path::new("src/app/main.ts"), "../util");
        assert_eq!(c[0], PathBuf::from("src/util.ts"));
        assert!(c.contains(&PathBuf::from("src/util/index.ts")));

        let js = candidate_paths(Path::new("src/main.ts"), "./a.js");
        assert_eq!(js[0], PathBuf::from("src/a.ts"));

        let dotted = candidate_paths(Path::new("src/main.ts"), "./user.service");
        assert_eq!(dotted[0], PathBuf::from("src/user.service.ts"));
    }

    #[test]
    fn relative_specifier_keeps_style() {
        let importer = Path::new("src/app/main.ts");
        assert_eq!(
            relative_specifier(importer, Path::new("lib/util.ts"), SpecifierStyle::Extensionless),
            "../../lib/util"
        );
        assert_eq!(
            relative_specifier(importer, Path::new("src/app/x.ts"), SpecifierStyle::JsExtension),
            "./x.js"
        );
        assert_eq!(
            relative_specifier(
                importer,
                Path::new("src/models/index.ts"),
                SpecifierStyle::DirectoryIndex
            ),
            "../models"
        );
    }

    #[test]
    fn detects_style() {
        assert_eq!(
            SpecifierStyle::detect("./models", Path::new("src/models/index.ts")),
            SpecifierStyle::DirectoryIndex
        );
        assert_eq!(
            SpecifierStyle::detect("./models/index", Path::new("src/models/index.ts")),
            SpecifierStyle::Extensionless
        );
        assert_eq!(
            SpecifierStyle::detect("./a.js", Path::new("src/a.ts")),
            SpecifierStyle::JsExtension
        );
    }

    #[test]
    fn rebases_from_new_location() {
        assert_eq!(
            rebase_specifier("./b", Path::new("src/a.ts"), Path::new("src/deep/a.ts")),
            "../b"
        );
        assert_eq!(
            rebase_specifier("../shared/x", Path::new("src/legacy/a.ts"), Path::new("src/a.ts")),
            "./shared/x"
        );
        assert_eq!(
            rebase_specifier("react", Path::new("a.ts"), Path::new("b/a.ts")),
            "react"
        );
    }
}
