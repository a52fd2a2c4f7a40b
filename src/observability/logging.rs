//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Send the same JSON stream to stdout and to the rotating log file
//! - Resolve the log level from environment and config
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format on both outputs; span fields carry trace and session ids
//! - `RUST_LOG` wins over the configured level

use std::io;
use std::sync::Arc;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::observability::rotation::RotatingFile;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("log file path is not configured")]
    MissingLogFile,
    #[error("failed to open log file {path}: {source}")]
    Sink { path: String, source: io::Error },
    #[error("failed to install subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// A cloneable handle on the shared sink, handed to the fmt layer.
#[derive(Clone)]
struct SinkWriter(Arc<RotatingFile>);

impl io::Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write_record(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

/// Level filter from `RUST_LOG`, falling back to `configured`, then `info`.
pub fn resolve_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured.trim().to_ascii_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Open the rotating sink and install the global subscriber.
///
/// The returned sink is shared with the audit log.
pub fn init(settings: &ObservabilityConfig) -> Result<Arc<RotatingFile>, LoggingError> {
    if settings.log_file.trim().is_empty() {
        return Err(LoggingError::MissingLogFile);
    }
    let sink = RotatingFile::open(&settings.log_file).map_err(|source| LoggingError::Sink {
        path: settings.log_file.clone(),
        source,
    })?;
    let sink = Arc::new(sink);

    let file_writer = {
        let sink = Arc::clone(&sink);
        move || SinkWriter(Arc::clone(&sink))
    };

    tracing_subscriber::registry()
        .with(resolve_filter(&settings.log_level))
        .with(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_span_events(FmtSpan::CLOSE),
        )
        .with(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_current_span(true)
                .with_span_list(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(file_writer),
        )
        .try_init()?;

    Ok(sink)
}
