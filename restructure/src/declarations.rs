//! Declaration index and mutator: lookup, copy, move and delete of top-level
//! declarations and class members.
//!
//! Function, variable statement and type alias are copied structurally with
//! their comments re-attached as trivia; enum, interface and class are copied
//! as their exact original text.

use crate::{errors::Result, oplog::Action, workspace::Workspace};
use std::path::Path;
use tracing::instrument;
use ts_syntax::{
    ClassMember, Declaration, DeclarationKind, Project, SourceFile, comments::trailing_trivia,
};

/// Look up the unique declaration of `kind` named `name` in `file`.
pub async fn get_declaration(
    ws: &Workspace,
    kind: DeclarationKind,
    name: &str,
    file: &Path,
) -> Result<Declaration> {
    let file = ws.relative(file);
    let mut project = ws.project().await;
    ws.ensure_loaded(&mut project, &file).await?;
    Ok(project.get(&file)?.find_declaration(kind, name)?)
}

/// Delete a declaration with its comments and persist the file.
#[instrument(skip(ws), fields(file = %file.display()))]
pub async fn delete_declaration(
    ws: &Workspace,
    kind: DeclarationKind,
    name: &str,
    file: &Path,
) -> Result<()> {
    let file = ws.relative(file);
    ws.log()
        .record(Action::Delete, format!("{kind} `{name}` from {}", file.display()));
    let mut project = ws.project().await;
    ws.ensure_loaded(&mut project, &file).await?;
    let source = project.get_mut(&file)?;
    let decl = source.find_declaration(kind, name)?;
    if ws.is_dry() {
        return Ok(());
    }
    source.remove_declaration(&decl)?;
    ws.save_file(&mut project, &file).await?;
    Ok(())
}

/// Append a copy of a declaration to `to` (created when missing) and persist it.
#[instrument(skip(ws), fields(from = %from.display(), to = %to.display()))]
pub async fn copy_declaration(
    ws: &Workspace,
    kind: DeclarationKind,
    name: &str,
    from: &Path,
    to: &Path,
) -> Result<()> {
    let (from, to) = (ws.relative(from), ws.relative(to));
    ws.log().record(
        Action::Copy,
        format!("{kind} `{name}` {} -> {}", from.display(), to.display()),
    );
    let mut project = ws.project().await;
    inspect(ws, &mut project, kind, name, &from).await?;
    announce_target(ws, &project, &to).await?;
    if ws.is_dry() {
        return Ok(());
    }

    copy_into(ws, &mut project, kind, name, &from, &to).await?;
    ws.save_file(&mut project, &to).await?;
    Ok(())
}

/// Copy a declaration into `to`, then remove it from `from`; both files are persisted.
#[instrument(skip(ws), fields(from = %from.display(), to = %to.display()))]
pub async fn move_declaration(
    ws: &Workspace,
    kind: DeclarationKind,
    name: &str,
    from: &Path,
    to: &Path,
) -> Result<()> {
    let (from, to) = (ws.relative(from), ws.relative(to));
    if from == to {
        ws.log().record(
            Action::Skip,
            format!("{kind} `{name}` already in {}", to.display()),
        );
        return Ok(());
    }
    ws.log().record(
        Action::Move,
        format!("{kind} `{name}` {} -> {}", from.display(), to.display()),
    );
    let mut project = ws.project().await;
    inspect(ws, &mut project, kind, name, &from).await?;
    announce_target(ws, &project, &to).await?;
    if ws.is_dry() {
        return Ok(());
    }

    copy_into(ws, &mut project, kind, name, &from, &to).await?;

    let source = project.get_mut(&from)?;
    let decl = source.find_declaration(kind, name)?;
    source.remove_declaration(&decl)?;

    ws.save_file(&mut project, &to).await?;
    ws.save_file(&mut project, &from).await?;
    Ok(())
}

/// Resolve the declaration (failing early, dry runs included) and warn when
/// its statement declares other names too.
async fn inspect(
    ws: &Workspace,
    project: &mut Project,
    kind: DeclarationKind,
    name: &str,
    from: &Path,
) -> Result<Declaration> {
    ws.ensure_loaded(project, from).await?;
    let source = project.get(from)?;
    let decl = source.find_declaration(kind, name)?;
    let siblings = source
        .declarations()
        .into_iter()
        .filter(|d| d.statement == decl.statement)
        .count();
    if siblings > 1 {
        ws.log().record(
            Action::Warn,
            format!(
                "`{name}` shares its statement with {} other declaration(s) in {}; they travel with it",
                siblings - 1,
                from.display()
            ),
        );
    }
    Ok(decl)
}

/// Journal the creation of a target file that neither storage nor the project has.
async fn announce_target(ws: &Workspace, project: &Project, to: &Path) -> Result<()> {
    if !project.tracks(to) && !ws.storage().exists(to).await? {
        ws.log().record(Action::Add, to.display());
    }
    Ok(())
}

async fn copy_into(
    ws: &Workspace,
    project: &mut Project,
    kind: DeclarationKind,
    name: &str,
    from: &Path,
    to: &Path,
) -> Result<()> {
    let snippet = {
        let source = project.get(from)?;
        let decl = source.find_declaration(kind, name)?;
        render_for_copy(source, &decl)?
    };

    ws.load_or_create(project, to).await?;
    project.get_mut(to)?.append_block(&snippet)?;
    Ok(())
}

/// Source text for a copy of `decl` in another file.
pub fn render_for_copy(source: &SourceFile, decl: &Declaration) -> Result<String> {
    // Overloaded functions travel as raw text so their signatures stay attached.
    if decl.kind.moves_by_text() || decl.overloads.is_some() {
        return Ok(source.full_text(decl)?.to_string());
    }
    match source.declaration_structure(decl)? {
        Some(mut structure) => {
            structure.set_leading_trivia(
                decl.leading_comments.iter().map(|c| c.text.clone()).collect(),
            );
            structure.set_trailing_trivia(trailing_trivia(&decl.trailing_comments));
            Ok(structure.render())
        }
        None => Ok(source.full_text(decl)?.to_string()),
    }
}

/// First member named `member` in class `class` of `file`.
pub async fn get_class_member(
    ws: &Workspace,
    class: &str,
    member: &str,
    file: &Path,
) -> Result<ClassMember> {
    let file = ws.relative(file);
    let mut project = ws.project().await;
    ws.ensure_loaded(&mut project, &file).await?;
    let source = project.get(&file)?;
    let decl = source.find_declaration(DeclarationKind::Class, class)?;
    let mut members = source.members_named(&decl, member)?;
    Ok(members.remove(0))
}

/// Move every member named `member` (overloads and accessor pairs included)
/// from one class to another. Both files are persisted.
#[instrument(skip(ws), fields(from = %from_file.display(), to = %to_file.display()))]
pub async fn move_class_member(
    ws: &Workspace,
    from_class: &str,
    member: &str,
    from_file: &Path,
    to_class: &str,
    to_file: &Path,
) -> Result<()> {
    let (from_file, to_file) = (ws.relative(from_file), ws.relative(to_file));
    ws.log().record(
        Action::Move,
        format!(
            "member `{from_class}.{member}` ({}) -> `{to_class}` ({})",
            from_file.display(),
            to_file.display()
        ),
    );
    if from_file == to_file && from_class == to_class {
        ws.log()
            .record(Action::Skip, format!("`{member}` already in `{to_class}`"));
        return Ok(());
    }

    let mut project = ws.project().await;
    ws.ensure_loaded(&mut project, &from_file).await?;
    ws.ensure_loaded(&mut project, &to_file).await?;

    let (indent, taken) = {
        let target = project.get(&to_file)?;
        let class = target.find_declaration(DeclarationKind::Class, to_class)?;
        let existing = target.class_members(&class)?;
        let taken = existing.iter().any(|m| m.name == member);
        let indent = match &ws.config().project.indent {
            Some(unit) if existing.is_empty() => {
                format!("{}{unit}", target.line_indent_at(class.statement.start_byte))
            }
            _ => target.member_indent(&class)?,
        };
        (indent, taken)
    };

    let source = project.get(&from_file)?;
    let class = source.find_declaration(DeclarationKind::Class, from_class)?;
    let members = source.members_named(&class, member)?;
    if taken {
        ws.log().record(
            Action::Warn,
            format!("`{to_class}` already declares `{member}`; not moved"),
        );
        return Ok(());
    }
    if ws.is_dry() {
        return Ok(());
    }

    let mut rendered = Vec::with_capacity(members.len());
    for m in &members {
        let text = match source.member_structure(m)? {
            Some(mut structure) => {
                structure.set_leading_trivia(
                    m.leading_comments.iter().map(|c| c.text.clone()).collect(),
                );
                structure.render(&indent)
            }
            None => source.member_text(m, &indent)?,
        };
        rendered.push(text);
    }

    project.get_mut(&from_file)?.remove_class_members(&members)?;
    let target = project.get_mut(&to_file)?;
    let class = target.find_declaration(DeclarationKind::Class, to_class)?;
    target.insert_class_members(&class, &rendered)?;

    ws.save_file(&mut project, &to_file).await?;
    if from_file != to_file {
        ws.save_file(&mut project, &from_file).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RestructureConfig;
    use std::fs;
    use crate::errors::RestructureError;
    use ts_syntax::SyntaxError;

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

    fn read(dir: &tempfile::TempDir, path: &str) -> String {
        fs::read_to_string(dir.path().join(path)).unwrap()
    }

    #[tokio::test]
    async fn moves_function_with_comments() {
        let (dir, ws) = workspace(
            &[
                (
                    "src/a.ts",
                    "const keep = 1;\n\n/** Adds numbers. */\nexport function add(a: number, b: number): number {\n  return a + b;\n} // inline\n",
                ),
                ("src/b.ts", "export const b = 2;\n"),
            ],
            false,
        )
        .await;

        move_declaration(
            &ws,
            DeclarationKind::Function,
            "add",
            Path::new("src/a.ts"),
            Path::new("src/b.ts"),
        )
        .await
        .unwrap();

        assert_eq!(read(&dir, "src/a.ts"), "const keep = 1;\n");
        assert_eq!(
            read(&dir, "src/b.ts"),
            "export const b = 2;\n\n/** Adds numbers. */\nexport function add(a: number, b: number): number {\n  return a + b;\n} // inline\n"
        );
        let moved = get_declaration(&ws, DeclarationKind::Function, "add", Path::new("src/b.ts"))
            .await
            .unwrap();
        assert_eq!(moved.name, "add");
        assert!(matches!(
            get_declaration(&ws, DeclarationKind::Function, "add", Path::new("src/a.ts")).await,
            Err(RestructureError::Syntax(SyntaxError::DeclarationNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn moves_overload_signatures_with_implementation() {
        let (dir, ws) = workspace(
            &[(
                "a.ts",
                "const keep = 1;\n\n// Parses input.\nexport function f(a: string): void;\nexport function f(a: number): void;\nexport function f(a: any) {}\n",
            )],
            false,
        )
        .await;

        move_declaration(
            &ws,
            DeclarationKind::Function,
            "f",
            Path::new("a.ts"),
            Path::new("b.ts"),
        )
        .await
        .unwrap();

        assert_eq!(read(&dir, "a.ts"), "const keep = 1;\n");
        assert_eq!(
            read(&dir, "b.ts"),
            "// Parses input.\nexport function f(a: string): void;\nexport function f(a: number): void;\nexport function f(a: any) {}\n"
        );
    }

    #[tokio::test]
    async fn copies_enum_text_into_new_file() {
        let enum_text = "// Colors.\nexport enum Color {\n  Red = 'red', // primary\n  Blue = 'blue',\n}";
        let (dir, ws) = workspace(&[("src/a.ts", &format!("{enum_text}\n"))], false).await;

        copy_declaration(
            &ws,
            DeclarationKind::Enum,
            "Color",
            Path::new("src/a.ts"),
            Path::new("src/shared/color.ts"),
        )
        .await
        .unwrap();

        assert_eq!(read(&dir, "src/shared/color.ts"), format!("{enum_text}\n"));
        assert_eq!(read(&dir, "src/a.ts"), format!("{enum_text}\n"));
    }

    #[tokio::test]
    async fn deletes_and_reports_missing() {
        let (dir, ws) = workspace(
            &[("a.ts", "type A = string;\n// about B\ntype B = number;\n")],
            false,
        )
        .await;
        delete_declaration(&ws, DeclarationKind::TypeAlias, "B", Path::new("a.ts"))
            .await
            .unwrap();
        assert_eq!(read(&dir, "a.ts"), "type A = string;\n");

        let err = delete_declaration(&ws, DeclarationKind::TypeAlias, "B", Path::new("a.ts"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RestructureError::Syntax(SyntaxError::DeclarationNotFound { .. })
        ));
        assert!(matches!(
            delete_declaration(&ws, DeclarationKind::TypeAlias, "B", Path::new("none.ts")).await,
            Err(RestructureError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn moves_class_member_between_classes() {
        let (dir, ws) = workspace(
            &[(
                "src/m.ts",
                "export class A {\n  // the id\n  id = 1;\n  keep(): void {}\n}\n\nexport class B {\n}\n",
            )],
            false,
        )
        .await;

        let member = get_class_member(&ws, "A", "id", Path::new("src/m.ts")).await.unwrap();
        assert_eq!(member.kind, ts_syntax::MemberKind::Property);

        move_class_member(
            &ws,
            "A",
            "id",
            Path::new("src/m.ts"),
            "B",
            Path::new("src/m.ts"),
        )
        .await
        .unwrap();
        assert_eq!(
            read(&dir, "src/m.ts"),
            "export class A {\n  keep(): void {}\n}\n\nexport class B {\n  // the id\n  id = 1;\n}\n"
        );
    }

    #[tokio::test]
    async fn dry_run_touches_nothing() {
        let original = "export interface Shape {\n  area(): number;\n}\n";
        let (dir, ws) = workspace(&[("a.ts", original)], true).await;
        move_declaration(
            &ws,
            DeclarationKind::Interface,
            "Shape",
            Path::new("a.ts"),
            Path::new("b.ts"),
        )
        .await
        .unwrap();
        assert_eq!(read(&dir, "a.ts"), original);
        assert!(!dir.path().join("b.ts").exists());
        assert_eq!(
            ws.log().entries(),
            vec!["[MOVE] interface `Shape` a.ts -> b.ts", "[ADD] b.ts"]
        );
    }
}
