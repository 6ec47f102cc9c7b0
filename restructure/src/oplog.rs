//! Operation journal.
//!
//! Every mutating call records one action-tagged line *before* acting, in dry
//! runs as well, so a dry run and a real run of the same script produce the
//! same journal. Lines are emitted through `tracing` and kept in memory.

use std::fmt::{Display, Formatter};
use std::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Add,
    Copy,
    Delete,
    Move,
    Merge,
    Flatten,
    Skip,
    Warn,
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Action::Add => "ADD",
            Action::Copy => "COPY",
            Action::Delete => "DELETE",
            Action::Move => "MOVE",
            Action::Merge => "MERGE",
            Action::Flatten => "FLATTEN",
            Action::Skip => "SKIP",
            Action::Warn => "WARN",
        })
    }
}

#[derive(Debug, Default)]
pub struct OpLog {
    entries: Mutex<Vec<String>>,
}

impl OpLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit and remember `[ACTION] detail`.
    pub fn record(&self, action: Action, detail: impl Display) {
        let line = format!("[{action}] {detail}");
        match action {
            Action::Warn => warn!("{line}"),
            _ => info!("{line}"),
        }
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line);
    }

    /// Snapshot of every line recorded so far.
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self, action: Action) -> usize {
        let prefix = format!("[{action}]");
        self.entries()
            .iter()
            .filter(|l| l.starts_with(&prefix))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_tagged_lines_in_order() {
        let log = OpLog::new();
        log.record(Action::Move, "a.ts -> b/a.ts");
        log.record(Action::Warn, format_args!("{} is untracked", "x.ts"));
        assert_eq!(
            log.entries(),
            vec!["[MOVE] a.ts -> b/a.ts", "[WARN] x.ts is untracked"]
        );
        assert_eq!(log.count(Action::Warn), 1);
        assert_eq!(log.count(Action::Skip), 0);
    }
}
