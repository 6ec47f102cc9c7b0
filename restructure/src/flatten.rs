//! Single-level inheritance flattening.
//!
//! The parent's properties, accessors and methods are copied into the child
//! and the `extends` clause is dropped. Collisions are checked against the
//! child's *property* names only, taken once before anything is copied; child
//! methods and accessors do not shadow parent members.

use crate::{
    errors::{RestructureError, Result},
    oplog::Action,
    workspace::Workspace,
};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};
use tracing::instrument;
use ts_syntax::{DeclarationKind, MemberKind, Resolution};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlattenSummary {
    pub parent: String,
    pub parent_path: PathBuf,
    /// Copied member names, in insertion order.
    pub copied: Vec<String>,
    /// Parent members skipped because the child has a property of that name.
    pub skipped: Vec<String>,
    /// Parent members not copied because they cannot be carried structurally.
    pub unsupported: Vec<String>,
}

const PASSES: [MemberKind; 4] = [
    MemberKind::Property,
    MemberKind::GetAccessor,
    MemberKind::SetAccessor,
    MemberKind::Method,
];

/// Flatten `class_name` in `file` onto its direct parent. Only `file` is persisted.
#[instrument(skip(ws), fields(file = %file.display()))]
pub async fn unextends_class(ws: &Workspace, class_name: &str, file: &Path) -> Result<FlattenSummary> {
    let file = ws.relative(file);
    ws.log().record(
        Action::Flatten,
        format!("class `{class_name}` in {}", file.display()),
    );

    let mut project = ws.project().await;
    ws.ensure_loaded(&mut project, &file).await?;

    let (parent_name, child_properties, indent) = {
        let child_file = project.get(&file)?;
        let child = child_file.find_declaration(DeclarationKind::Class, class_name)?;
        let heritage = child_file.heritage(&child)?;
        let Some(parent_name) = heritage.as_ref().and_then(|h| h.extends.first()).cloned() else {
            return Err(RestructureError::HeritageNotFound {
                class: class_name.to_string(),
                path: file.clone(),
            });
        };
        if let Some(h) = heritage.as_ref().filter(|h| h.extends.len() > 1) {
            ws.log().record(
                Action::Warn,
                format!(
                    "`{class_name}` extends {} values; only `{parent_name}` is flattened",
                    h.extends.len()
                ),
            );
        }

        let members = child_file.class_members(&child)?;
        let properties: HashSet<String> = members
            .iter()
            .filter(|m| m.kind == MemberKind::Property)
            .map(|m| m.name.clone())
            .collect();
        let indent = match &ws.config().project.indent {
            Some(unit) if members.is_empty() => {
                format!("{}{unit}", child_file.line_indent_at(child.statement.start_byte))
            }
            _ => child_file.member_indent(&child)?,
        };
        (parent_name, properties, indent)
    };

    let (parent_path, parent_decl) = match project.resolve_identifier(&file, &parent_name)? {
        Resolution::Declaration { path, name } => (path, name),
        _ => {
            return Err(RestructureError::ParentNotFound {
                class: class_name.to_string(),
                parent: parent_name,
                path: file,
            });
        }
    };

    let parent_file = project.get(&parent_path)?;
    let parent = parent_file
        .find_declaration(DeclarationKind::Class, &parent_decl)
        .map_err(|_| RestructureError::ParentNotFound {
            class: class_name.to_string(),
            parent: parent_name.clone(),
            path: file.clone(),
        })?;
    if let Some(grand) = parent_file.heritage(&parent)?.and_then(|h| h.extends.first().cloned()) {
        ws.log().record(
            Action::Warn,
            format!("`{parent_decl}` extends `{grand}`; members of `{grand}` are not flattened"),
        );
    }

    let parent_members = parent_file.class_members(&parent)?;
    let implemented: HashSet<&str> = parent_members
        .iter()
        .filter(|m| m.kind == MemberKind::Method)
        .map(|m| m.name.as_str())
        .collect();
    let overloaded: HashSet<&str> = parent_members
        .iter()
        .filter(|m| m.kind == MemberKind::MethodSignature && implemented.contains(m.name.as_str()))
        .map(|m| m.name.as_str())
        .collect();

    let mut summary = FlattenSummary {
        parent: parent_decl.clone(),
        parent_path: parent_path.clone(),
        ..FlattenSummary::default()
    };
    let mut rendered = Vec::new();

    for pass in PASSES {
        for m in parent_members.iter().filter(|m| m.kind == pass) {
            if child_properties.contains(&m.name) {
                ws.log().record(
                    Action::Skip,
                    format!("{pass} `{}`: `{class_name}` already has a property of that name", m.name),
                );
                summary.skipped.push(m.name.clone());
                continue;
            }
            if pass == MemberKind::Method && overloaded.contains(m.name.as_str()) {
                ws.log().record(
                    Action::Warn,
                    format!("method `{}` of `{parent_decl}` is overloaded; not copied", m.name),
                );
                summary.unsupported.push(m.name.clone());
                continue;
            }
            let Some(mut structure) = parent_file.member_structure(m)? else {
                summary.unsupported.push(m.name.clone());
                continue;
            };
            structure.set_leading_trivia(
                m.leading_comments.iter().map(|c| c.text.clone()).collect(),
            );
            rendered.push(structure.render(&indent));
            summary.copied.push(m.name.clone());
        }
    }

    for m in &parent_members {
        match m.kind {
            MemberKind::MethodSignature if !implemented.contains(m.name.as_str()) => {
                ws.log().record(
                    Action::Warn,
                    format!("`{}` of `{parent_decl}` has no implementation; not copied", m.name),
                );
                summary.unsupported.push(m.name.clone());
            }
            MemberKind::Constructor => {
                ws.log().record(
                    Action::Warn,
                    format!("constructor of `{parent_decl}` is not copied"),
                );
            }
            _ => {}
        }
    }

    if ws.is_dry() {
        return Ok(summary);
    }

    let child_file = project.get_mut(&file)?;
    let child = child_file.find_declaration(DeclarationKind::Class, class_name)?;
    child_file.insert_class_members(&child, &rendered)?;
    let child = child_file.find_declaration(DeclarationKind::Class, class_name)?;
    child_file.remove_extends_clause(&child)?;

    ws.save_file(&mut project, &file).await?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RestructureConfig;
    use std::fs;

    const BASE: &str = "export abstract class Base {\n  /** Shared id. */\n  id = 0;\n  label: string = 'base';\n\n  get name(): string {\n    return this.label;\n  }\n\n  describe(): string {\n    return `${this.id}`;\n  }\n\n  format(x: number): string;\n  format(x: string): string;\n  format(x: unknown): string {\n    return String(x);\n  }\n\n  abstract render(): void;\n}\n";

    const CHILD: &str = "import { Base as Parent } from './base';\n\nexport class Child extends Parent implements Renderable {\n  label = 'child';\n\n  render(): void {}\n}\n";

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
    async fn flattens_one_level() {
        let (dir, ws) = workspace(&[("src/base.ts", BASE), ("src/child.ts", CHILD)], false).await;

        let summary = unextends_class(&ws, "Child", Path::new("src/child.ts"))
            .await
            .unwrap();
        assert_eq!(summary.parent, "Base");
        assert_eq!(summary.copied, vec!["id", "name", "describe"]);
        assert_eq!(summary.skipped, vec!["label"]);
        assert_eq!(summary.unsupported, vec!["format", "render"]);

        let child = fs::read_to_string(dir.path().join("src/child.ts")).unwrap();
        assert_eq!(
            child,
            "import { Base as Parent } from './base';\n\nexport class Child implements Renderable {\n  label = 'child';\n\n  render(): void {}\n  /** Shared id. */\n  id = 0;\n  get name(): string {\n    return this.label;\n  }\n  describe(): string {\n    return `${this.id}`;\n  }\n}\n"
        );
        assert_eq!(fs::read_to_string(dir.path().join("src/base.ts")).unwrap(), BASE);
    }

    #[tokio::test]
    async fn fills_empty_child_with_accessor_pairs() {
        let parent = "export class P {\n  x = 1;\n  get v(): number {\n    return this.x;\n  }\n  set y(value: number) {\n    this.x = value;\n  }\n}\n";
        let (dir, ws) = workspace(
            &[
                ("p.ts", parent),
                ("c.ts", "import { P } from './p';\n\nexport class C extends P {}\n"),
            ],
            false,
        )
        .await;

        let summary = unextends_class(&ws, "C", Path::new("c.ts")).await.unwrap();
        assert_eq!(summary.copied, vec!["x", "v", "y"]);
        assert!(summary.skipped.is_empty());
        assert_eq!(
            fs::read_to_string(dir.path().join("c.ts")).unwrap(),
            "import { P } from './p';\n\nexport class C {\n    x = 1;\n    get v(): number {\n      return this.x;\n    }\n    set y(value: number) {\n      this.x = value;\n    }\n}\n"
        );
    }

    #[tokio::test]
    async fn missing_heritage_and_local_parent_fail() {
        let (_dir, ws) = workspace(
            &[("a.ts", "class P {}\nclass Local extends P {}\nclass Plain {}\n")],
            false,
        )
        .await;
        assert!(matches!(
            unextends_class(&ws, "Plain", Path::new("a.ts")).await,
            Err(RestructureError::HeritageNotFound { .. })
        ));
        assert!(matches!(
            unextends_class(&ws, "Local", Path::new("a.ts")).await,
            Err(RestructureError::ParentNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn dry_run_logs_the_same_lines() {
        let files = [("src/base.ts", BASE), ("src/child.ts", CHILD)];
        let (_real_dir, real) = workspace(&files, false).await;
        let (dry_dir, dry) = workspace(&files, true).await;
        unextends_class(&real, "Child", Path::new("src/child.ts")).await.unwrap();
        unextends_class(&dry, "Child", Path::new("src/child.ts")).await.unwrap();

        assert_eq!(real.log().entries(), dry.log().entries());
        assert_eq!(
            fs::read_to_string(dry_dir.path().join("src/child.ts")).unwrap(),
            CHILD
        );
    }
}
