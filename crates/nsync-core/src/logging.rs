use std::path::Path;

use nsync_types::{Result, SyncError};
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the tracing/logging system.
///
/// Console output goes to stderr so stdout stays free for reports. `RUST_LOG`
/// takes precedence over `log_level`. With `log_file`, a daily-rolling file
/// layer is added.
pub fn init_logging(log_level: &str, log_file: Option<&Path>, structured: bool) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let appender = log_file.map(daily_appender);
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if structured {
        let console = fmt::layer()
            .json()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(std::io::stderr);
        let file = appender.map(|w| {
            fmt::layer()
                .json()
                .with_writer(w)
                .with_target(true)
                .with_ansi(false)
        });
        registry.with(console).with(file).try_init()
    } else {
        let console = fmt::layer()
            .with_target(true)
            .with_ansi(true)
            .with_writer(std::io::stderr);
        let file = appender.map(|w| {
            fmt::layer()
                .with_writer(w)
                .with_target(true)
                .with_ansi(false)
        });
        registry.with(console).with(file).try_init()
    };

    installed.map_err(|e| SyncError::Config(format!("Failed to install log subscriber: {e}")))
}

fn daily_appender(log_path: &Path) -> RollingFileAppender {
    let dir = log_path.parent().unwrap_or(Path::new("."));
    let filename = log_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "nsync.log".to_string());
    rolling::daily(dir, filename)
}
