//! Tracing subscriber setup.
//!
//! Two sinks share one registry:
//! - the console, filtered by `RUST_LOG` or [`Config::log_filter`];
//! - a daily rolling file `log.<date>.txt` under [`Config::log_dir`] that
//!   only receives `WARN` and above, written without ANSI colours.

use std::fs;
use std::path::Path;

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::Config;
use crate::error::Error;

/// Installs the global subscriber.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the background file writer.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init(config: &Config) -> Result<WorkerGuard, Error> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let (writer, guard) = tracing_appender::non_blocking(file_appender(&config.log_dir)?);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_filter(filter))
        .with(file_layer(writer))
        .init();

    Ok(guard)
}

fn file_appender(dir: &Path) -> Result<RollingFileAppender, Error> {
    fs::create_dir_all(dir)?;
    Ok(RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("log")
        .filename_suffix("txt")
        .build(dir)?)
}

fn file_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(LevelFilter::WARN)
}
