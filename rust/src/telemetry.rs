//! Tracing setup: human-readable stderr logs, or JSON lines to a trace file.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_subscriber::fmt::time::UtcTime;

use crate::config::AppConfig;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Where logs go for a given config.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    Disabled,
    Stderr,
    TraceFile(PathBuf),
}

fn log_target(config: &AppConfig) -> LogTarget {
    if config.no_logs {
        return LogTarget::Disabled;
    }
    match &config.trace_log {
        Some(path) if !path.as_os_str().is_empty() => LogTarget::TraceFile(path.clone()),
        _ => LogTarget::Stderr,
    }
}

fn init_tracing_once(config: &AppConfig, once: &OnceLock<()>) {
    let target = log_target(config);
    if target == LogTarget::Disabled {
        return;
    }
    let level = config.log_level.as_tracing_level();

    let _ = once.get_or_init(|| match target {
        LogTarget::TraceFile(path) => {
            let file = match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => file,
                Err(err) => {
                    eprintln!("oscvoice: cannot open trace log {}: {err}", path.display());
                    return;
                }
            };
            let subscriber = tracing_subscriber::fmt()
                .json()
                .with_max_level(level)
                .with_timer(UtcTime::rfc_3339())
                .with_writer(file)
                .with_current_span(false)
                .with_span_list(false)
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        LogTarget::Stderr => {
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_timer(UtcTime::rfc_3339())
                .with_target(false)
                .with_writer(std::io::stderr)
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        LogTarget::Disabled => {}
    });
}

/// Install the global subscriber once; later calls are no-ops.
pub fn init_tracing(config: &AppConfig) {
    init_tracing_once(config, &TRACING_INIT);
}
