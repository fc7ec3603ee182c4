//! Log output for the server process.
//!
//! Logs go to stderr, either as one JSON object per event or as compact
//! human-readable lines. Each module logs under its own target
//! (`lockd::transport`, `lockd::dispatch`, `lockd::process`), so a filter
//! such as `lockd::dispatch=debug` traces every request.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, time::UtcTime};

use lockd_config::LogFormat;

type BoxedSubscriber = Box<dyn Subscriber + Send + Sync>;

static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Proof that logging is set up, and in which format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Format of the subscriber that is actually installed.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while setting up logging.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The filter expression does not parse.
    #[error("invalid log filter '{filter}': {reason}")]
    Filter {
        /// Filter as configured.
        filter: String,
        /// Parser complaint.
        reason: String,
    },
    /// Some other subscriber already owns the process.
    #[error("failed to install log subscriber: {0}")]
    Install(#[from] SetGlobalDefaultError),
}

/// Installs the process-wide subscriber the first time it is called.
///
/// Later calls keep the first subscriber and report its format.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is malformed or another
/// subscriber is already installed.
pub fn initialise(filter: &str, format: LogFormat) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED
        .get_or_try_init(|| {
            let subscriber = build_subscriber(filter, format)?;
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(format)
        })
        .map(|&format| TelemetryHandle { format })
}

fn build_subscriber(filter: &str, format: LogFormat) -> Result<BoxedSubscriber, TelemetryError> {
    let filter = EnvFilter::try_new(filter).map_err(|error| TelemetryError::Filter {
        filter: filter.to_owned(),
        reason: error.to_string(),
    })?;
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(format == LogFormat::Compact && io::stderr().is_terminal())
        .with_thread_names(true)
        .with_timer(UtcTime::rfc_3339());
    let subscriber: BoxedSubscriber = match format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };
    Ok(subscriber)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn rejects_malformed_filters() {
        let filter = "lockd=notalevel";
        let error = build_subscriber(filter, LogFormat::Compact)
            .err()
            .expect("filter should be rejected");
        assert!(matches!(error, TelemetryError::Filter { .. }));
        assert!(error.to_string().contains(filter));
    }

    #[rstest]
    #[case::json(LogFormat::Json)]
    #[case::compact(LogFormat::Compact)]
    fn builds_both_formats(#[case] format: LogFormat) {
        assert!(build_subscriber("info", format).is_ok());
    }
}
