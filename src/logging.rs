//! Structured logging setup
//!
//! Provides:
//! - JSON output for production
//! - Pretty formatting for development
//! - Console, daily rolling file, or both
//!
//! `RUST_LOG` takes precedence over the configured level.

use crate::config::Config;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_FILE_NAME: &str = "toggl-wiki.log";

/// Initialize the logging system based on configuration.
///
/// File output is written by a background worker; keep the returned guard
/// alive until shutdown so buffered lines are flushed.
pub fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let logging = &config.logging;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.output.as_str() {
        "file" => Some(init_file_logging(env_filter, &logging.format, &config.paths.log_directory)),
        "both" => Some(init_combined_logging(
            env_filter,
            &logging.format,
            &config.paths.log_directory,
        )),
        _ => {
            init_console_logging(env_filter, &logging.format);
            None
        }
    }
}

fn init_console_logging(filter: EnvFilter, format: &str) {
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        "json" => {
            let _ = subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(true),
                )
                .try_init();
        }
        _ => {
            let _ = subscriber
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .pretty(),
                )
                .try_init();
        }
    }
}

fn init_file_logging(filter: EnvFilter, format: &str, log_dir: &Path) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        "json" => {
            let _ = subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(non_blocking)
                        .with_current_span(true)
                        .with_span_list(true),
                )
                .try_init();
        }
        _ => {
            let _ = subscriber
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .try_init();
        }
    }

    guard
}

fn init_combined_logging(filter: EnvFilter, format: &str, log_dir: &Path) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        "json" => {
            let _ = subscriber
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .with(fmt::layer().json().with_writer(non_blocking))
                .try_init();
        }
        _ => {
            let _ = subscriber
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
                .try_init();
        }
    }

    guard
}
