//! Structured logging bootstrap using `tracing`.
//!
//! Logs go to stderr; stdout is reserved for command output such as the
//! label printed by `classify`.

use std::env;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directives when neither `RELATION_MINER_LOG` nor `RUST_LOG` is set.
/// sqlx logs every statement at info.
const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn";

/// Crate-specific filter variable; wins over `RUST_LOG`.
const LOG_ENV: &str = "RELATION_MINER_LOG";

/// Pick the filter directives: `RELATION_MINER_LOG`, then `RUST_LOG`, then the default.
fn directives<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    [LOG_ENV, EnvFilter::DEFAULT_ENV]
        .into_iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_string())
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_tracing() -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let directives = directives(|key| env::var(key).ok());
    let env_filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid log directives {directives:?}"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(fmt_layer).try_init()?;

    tracing::debug!(%directives, "tracing initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_variable_wins_over_rust_log() {
        let lookup = |key: &str| match key {
            "RELATION_MINER_LOG" => Some("debug".to_string()),
            "RUST_LOG" => Some("warn".to_string()),
            _ => None,
        };
        assert_eq!(directives(lookup), "debug");
    }

    #[test]
    fn blank_values_fall_through_to_default() {
        let lookup = |key: &str| match key {
            "RELATION_MINER_LOG" => Some("  ".to_string()),
            _ => None,
        };
        assert_eq!(directives(lookup), DEFAULT_DIRECTIVES);
        assert_eq!(
            directives(|key| (key == "RUST_LOG").then(|| "trace".to_string())),
            "trace"
        );
    }
}
