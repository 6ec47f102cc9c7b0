//! Command-line surface over the `restructure` operations.

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use restructure::{
    DeclarationKind, MoveOptions, RestructureConfig, Workspace, check_conflicts, copy_declaration,
    delete_declaration, merge_files, move_and_merge, move_class_member, move_declaration,
    move_files, unextends_class,
};
use tracing::Level;

/// Restructure a TypeScript project: move files and declarations, merge
/// colliding files and flatten class inheritance.
#[derive(Parser, Debug)]
#[command(name = "ts-restructure")]
#[command(about, long_about = None)]
pub struct Cli {
    /// Log every operation without touching any file
    #[arg(long, global = true)]
    pub dry: bool,

    /// Project root (defaults to RESTRUCTURE_CWD, then the current directory)
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// YAML config file; flags override its values
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Move every file matching a glob into another directory, rewriting imports
    Move {
        from_dir: PathBuf,
        pattern: String,
        to_dir: PathBuf,
        /// Merge into destinations that already exist
        #[arg(long)]
        merge: bool,
        /// Move bytes only, without rewriting imports
        #[arg(long)]
        simple: bool,
    },
    /// Move with conflict merging and simple moves
    MoveAndMerge {
        from_dir: PathBuf,
        pattern: String,
        to_dir: PathBuf,
    },
    /// List destinations a move would find occupied
    CheckConflicts {
        from_dir: PathBuf,
        pattern: String,
        to_dir: PathBuf,
    },
    /// Move a top-level declaration to another file
    MoveDecl {
        kind: DeclarationKind,
        name: String,
        from: PathBuf,
        to: PathBuf,
    },
    /// Copy a top-level declaration into another file
    CopyDecl {
        kind: DeclarationKind,
        name: String,
        from: PathBuf,
        to: PathBuf,
    },
    /// Delete a top-level declaration
    DeleteDecl {
        kind: DeclarationKind,
        name: String,
        file: PathBuf,
    },
    /// Move a class member (all overloads) to another class
    MoveMember {
        from_class: String,
        member: String,
        from_file: PathBuf,
        to_class: String,
        to_file: PathBuf,
    },
    /// Merge one file into another
    MergeFiles { source: PathBuf, destination: PathBuf },
    /// Copy a class's parent members into it and drop its `extends` clause
    Unextends { class: String, file: PathBuf },
}

impl Cli {
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    }

    /// Config file (or env), with `--cwd` and `--dry` applied on top.
    pub fn config(&self) -> anyhow::Result<RestructureConfig> {
        let mut cfg = match &self.config {
            Some(path) => RestructureConfig::from_yaml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => RestructureConfig::from_env()?,
        };
        if let Some(cwd) = &self.cwd {
            cfg.cwd = cwd.clone();
        }
        cfg.dry |= self.dry;
        cfg.validate()?;
        Ok(cfg)
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = cli.config()?;
    let dry = cfg.dry;
    let ws = Workspace::open(cfg).await?;

    let result = dispatch(&ws, cli.command).await;
    print_journal(&ws);
    result?;

    let saved = ws.close().await?;
    if dry {
        println!("{}", "dry run: no files were changed".yellow());
    } else if !saved.written.is_empty() || !saved.removed.is_empty() {
        println!(
            "saved {} file(s), removed {}",
            saved.written.len(),
            saved.removed.len()
        );
    }
    Ok(())
}

async fn dispatch(ws: &Workspace, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Move {
            from_dir,
            pattern,
            to_dir,
            merge,
            simple,
        } => {
            let options = MoveOptions {
                auto_resolve_conflict: merge,
                use_simple_move: simple,
            };
            let summary = move_files(ws, &from_dir, &pattern, &to_dir, options).await?;
            println!("{} file(s) processed", summary.files.len());
        }
        Command::MoveAndMerge {
            from_dir,
            pattern,
            to_dir,
        } => {
            let summary = move_and_merge(ws, &from_dir, &pattern, &to_dir).await?;
            println!("{} file(s) processed", summary.files.len());
        }
        Command::CheckConflicts {
            from_dir,
            pattern,
            to_dir,
        } => {
            let conflicts = check_conflicts(ws, &from_dir, &pattern, &to_dir).await?;
            if conflicts.is_empty() {
                println!("{}", "no conflicts".green());
            }
            for c in conflicts {
                println!(
                    "{} {} -> {}",
                    "conflict".red(),
                    c.from.display(),
                    c.to.display()
                );
            }
        }
        Command::MoveDecl {
            kind,
            name,
            from,
            to,
        } => move_declaration(ws, kind, &name, &from, &to).await?,
        Command::CopyDecl {
            kind,
            name,
            from,
            to,
        } => copy_declaration(ws, kind, &name, &from, &to).await?,
        Command::DeleteDecl { kind, name, file } => {
            delete_declaration(ws, kind, &name, &file).await?
        }
        Command::MoveMember {
            from_class,
            member,
            from_file,
            to_class,
            to_file,
        } => move_class_member(ws, &from_class, &member, &from_file, &to_class, &to_file).await?,
        Command::MergeFiles {
            source,
            destination,
        } => {
            let summary = merge_files(ws, &source, &destination).await?;
            println!(
                "{} import(s) added, {} binding(s) added, {} statement(s) appended",
                summary.imports_added, summary.bindings_added, summary.statements_appended
            );
        }
        Command::Unextends { class, file } => {
            let summary = unextends_class(ws, &class, &file).await?;
            println!(
                "flattened `{class}` onto `{}` ({}): {} copied, {} skipped",
                summary.parent,
                summary.parent_path.display(),
                summary.copied.len(),
                summary.skipped.len()
            );
        }
    }
    Ok(())
}

fn print_journal(ws: &Workspace) {
    for line in ws.log().entries() {
        let Some((tag, rest)) = line.split_once(' ') else {
            println!("{line}");
            continue;
        };
        let tag = match tag {
            "[WARN]" => tag.yellow().bold(),
            "[SKIP]" => tag.dimmed(),
            "[DELETE]" => tag.red(),
            _ => tag.green(),
        };
        println!("{tag} {rest}");
    }
}
