//! Restructuring operations over a TypeScript workspace.
//!
//! Every operation takes a [`Workspace`] (config + storage + syntax project +
//! operation journal). With `dry` set, operations journal what they would do
//! and leave storage untouched.

pub mod config;
pub mod declarations;
pub mod errors;
pub mod flatten;
pub mod glob;
pub mod merger;
pub mod mover;
pub mod oplog;
pub mod storage;
pub mod telemetry;
pub mod workspace;

pub use config::RestructureConfig;
pub use declarations::{
    copy_declaration, delete_declaration, get_class_member, get_declaration, move_class_member,
    move_declaration,
};
pub use errors::{RestructureError, Result};
pub use flatten::{FlattenSummary, unextends_class};
pub use merger::{MergeSummary, merge_files};
pub use mover::{
    FileOutcome, MoveOptions, MoveOutcome, MoveSummary, PathConflict, check_conflicts,
    move_and_merge, move_files,
};
pub use oplog::{Action, OpLog};
pub use workspace::{SaveSummary, Workspace};

pub use ts_syntax::{DeclarationKind, MemberKind};
