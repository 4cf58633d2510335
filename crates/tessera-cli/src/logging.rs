//! Logging and tracing setup for the `tessera` binary
//!
//! Console output goes to stderr so result tables on stdout stay clean.
//! The JSON file layer rolls daily under the local data directory and is
//! meant for bug reports. `RUST_LOG` overrides the configured filter.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where log files should be written
    pub log_dir: PathBuf,

    /// Write JSON logs to a rolling file
    pub enable_json_logs: bool,

    /// Human readable logs on stderr
    pub enable_console_logs: bool,

    /// Include file/line information
    pub include_location: bool,

    /// Log span open/close (for timing)
    pub enable_spans: bool,

    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_verbosity(0)
    }
}

impl LoggingConfig {
    /// `-v` raises tessera crates to info, `-vv` to debug, `-vvv` to trace
    pub fn for_verbosity(verbose: u8) -> Self {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        Self {
            log_dir: log_directory(),
            enable_json_logs: false,
            enable_console_logs: true,
            include_location: verbose >= 2,
            enable_spans: verbose >= 3,
            default_filter: format!(
                "warn,tessera={level},tessera_core={level},tessera_drivers={level},\
                 tessera_driver_sqlite={level},tessera_driver_postgres={level},\
                 tessera_driver_mysql={level},tessera_driver_mssql={level},\
                 tessera_driver_mongodb={level},tessera_connection={level}"
            ),
        }
    }

    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.enable_json_logs = enabled;
        self
    }
}

/// Initialize the global subscriber.
///
/// The returned guard flushes the file writer; keep it alive until exit.
pub fn init(config: LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    // NEW fires once per span; ENTER would repeat on every async re-poll.
    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();
    let mut guard = None;

    if config.enable_console_logs {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone())
            .compact()
            .with_filter(env_filter.clone())
            .boxed();
        layers.push(console_layer);
    }

    if config.enable_json_logs {
        std::fs::create_dir_all(&config.log_dir)?;
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "tessera.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed();
        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        log_dir = %config.log_dir.display(),
        json_enabled = config.enable_json_logs,
        "logging initialized"
    );
    Ok(guard)
}

/// `<local data dir>/tessera/logs`
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tessera")
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_by_default() {
        let config = LoggingConfig::default();
        assert!(config.enable_console_logs);
        assert!(!config.enable_json_logs);
        assert!(config.default_filter.contains("tessera_core=warn"));
    }

    #[test]
    fn test_verbosity_levels() {
        assert!(LoggingConfig::for_verbosity(1).default_filter.contains("tessera_connection=info"));
        let debug = LoggingConfig::for_verbosity(2);
        assert!(debug.default_filter.contains("tessera_driver_postgres=debug"));
        assert!(debug.include_location);
        assert!(LoggingConfig::for_verbosity(9).enable_spans);
    }

    #[test]
    fn test_log_directory_is_namespaced() {
        assert!(log_directory().ends_with("tessera/logs"));
    }
}
