use std::io::{self, IsTerminal};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, filter, fmt};

/// Targets whose events the library layer renders: this crate and the syntax model.
pub const TARGET_PREFIXES: [&str; 2] = ["restructure", "ts_syntax"];

/// RFC3339 UTC timer implemented via `chrono`.
/// Example output: `2025-09-12T10:20:30Z`
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        let s = now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        w.write_str(&s)
    }
}

/// Build a **library-scoped** formatting layer for restructuring events.
///
/// - RFC3339 UTC timestamps
/// - Compact single-line format with target
/// - Span close events (durations of instrumented operations)
/// - ANSI colors only when stdout is a terminal
///
/// A per-event filter keeps it from rendering other crates' logs, so the
/// binary can compose it with its own global subscriber.
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = io::stdout().is_terminal();

    let only_ours = filter::filter_fn(|meta| {
        TARGET_PREFIXES
            .iter()
            .any(|prefix| meta.target().starts_with(prefix))
    });

    fmt::layer()
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_ansi(use_ansi)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .event_format(fmt::format().compact())
        .with_filter(only_ours)
}

/// Level directives (`restructure=debug`, `ts_syntax=debug`) for the library crates.
pub fn level_directives(level: Level) -> Vec<Directive> {
    TARGET_PREFIXES
        .iter()
        .filter_map(|prefix| {
            Directive::from_str(&format!("{prefix}={}", level.as_str().to_lowercase())).ok()
        })
        .collect()
}

/// EnvFilter from `RUST_LOG` (or `default`), with `level` applied to the library crates.
pub fn env_filter_with_level(default: &str, level: Level) -> EnvFilter {
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    level_directives(level)
        .into_iter()
        .fold(base, |filter, directive| filter.add_directive(directive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cover_both_crates() {
        let rendered: Vec<String> = level_directives(Level::DEBUG)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, vec!["restructure=debug", "ts_syntax=debug"]);
    }
}
