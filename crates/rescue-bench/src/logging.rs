//! Structured JSON telemetry for search runs.

use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{Level, event};
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::EnvFilter;

use crate::config::{LoggingConfig, ResolvedOutputs};

const TELEMETRY_FILE: &str = "telemetry.jsonl";

/// Overrides the configured level with a full filter directive string.
pub const LOG_FILTER_ENV: &str = "RESCUE_LOG";

/// Keeps the background writer alive; drop it only after the last round is logged.
pub struct TelemetryGuard {
    _worker: WorkerGuard,
    pub path: PathBuf,
}

/// Sends round and session events as flattened JSON lines to `telemetry.jsonl` next to the
/// summary. Returns `None` when structured logging is off.
pub fn init_logging(
    logging: &LoggingConfig,
    outputs: &ResolvedOutputs,
    run_id: &str,
) -> Result<Option<TelemetryGuard>> {
    if !logging.enable_structured {
        return Ok(None);
    }

    let dir = outputs.telemetry_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("creating telemetry directory {}", dir.display()))?;
    let path = dir.join(TELEMETRY_FILE);
    let file =
        File::create(&path).with_context(|| format!("creating telemetry log {}", path.display()))?;

    // Round rows must not be dropped under load.
    let (writer, worker) = NonBlockingBuilder::default().lossy(false).finish(file);

    let subscriber = tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_target(true)
        .with_env_filter(round_filter(logging))
        .with_writer(writer)
        .finish();

    // Tests share one process, so a subscriber may already be installed.
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        event!(target: "rescue_bench::run", Level::INFO, run_id, action = "start");
    }

    Ok(Some(TelemetryGuard {
        _worker: worker,
        path,
    }))
}

/// Core and bench events at the configured level, everything else at `warn`.
fn round_filter(logging: &LoggingConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_FILTER_ENV) {
        return filter;
    }
    let level = logging
        .level()
        .unwrap_or(Level::INFO)
        .as_str()
        .to_ascii_lowercase();
    EnvFilter::new(format!("warn,rescue_core={level},rescue_bench={level}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn outputs(root: &std::path::Path, sub: &str) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: root.join(sub).join("rounds.jsonl"),
            summary_md: root.join(sub).join("summary.md"),
        }
    }

    #[test]
    fn disabled_logging_creates_nothing() {
        let dir = tempdir().expect("temp dir");
        let guard =
            init_logging(&LoggingConfig::default(), &outputs(dir.path(), "logs"), "quiet")
                .expect("init");
        assert!(guard.is_none());
        assert!(!dir.path().join("logs").exists());
    }

    #[test]
    fn telemetry_lands_beside_the_summary() {
        let dir = tempdir().expect("temp dir");
        let logging = LoggingConfig {
            enable_structured: true,
            tracing_level: "debug".to_string(),
        };
        let guard = init_logging(&logging, &outputs(dir.path(), "run"), "drill")
            .expect("init")
            .expect("guard when enabled");
        assert_eq!(guard.path, dir.path().join("run").join(TELEMETRY_FILE));
        assert!(guard.path.exists());
    }

    #[test]
    fn filter_scopes_configured_level_to_rescue_crates() {
        if std::env::var_os(LOG_FILTER_ENV).is_some() {
            return;
        }
        let logging = LoggingConfig {
            enable_structured: true,
            tracing_level: "debug".to_string(),
        };
        let filter = round_filter(&logging).to_string();
        assert!(filter.contains("rescue_core=debug"), "{filter}");
        assert!(filter.contains("rescue_bench=debug"), "{filter}");
    }
}
