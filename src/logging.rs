//! Severity-gated logging.
//!
//! A [`SeverityFilter`] sits between the request pipeline and the concrete
//! log sink. Calls below the configured threshold are complete no-ops; calls
//! at or above it are forwarded to the sink unmodified. The audit channel
//! ([`SeverityFilter::log`]) bypasses the gate entirely.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Log severity, least to most severe. Variant order drives the `Ord` derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Warn
    }
}

impl std::str::FromStr for Severity {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            other => Err(AppError::configuration(format!("unknown log level: {other}"))),
        }
    }
}

/// Destination for messages that pass the filter.
///
/// `always` carries the audit channel, which has no severity and is never
/// suppressed.
pub trait LogSink: Send + Sync {
    fn emit(&self, severity: Severity, message: &str);
    fn always(&self, message: &str);
}

/// Pass-through filter around a [`LogSink`].
///
/// The threshold is fixed at construction. No buffering, no reordering:
/// a forwarded call reaches the sink before the method returns.
pub struct SeverityFilter {
    sink: Arc<dyn LogSink>,
    threshold: Severity,
}

impl SeverityFilter {
    pub fn new(sink: Arc<dyn LogSink>, threshold: Severity) -> Self {
        Self { sink, threshold }
    }

    pub fn debug(&self, message: &str) {
        self.forward(Severity::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.forward(Severity::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.forward(Severity::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.forward(Severity::Error, message);
    }

    /// Audit channel: always forwarded, regardless of threshold.
    pub fn log(&self, message: &str) {
        self.sink.always(message);
    }

    fn forward(&self, severity: Severity, message: &str) {
        if severity >= self.threshold {
            self.sink.emit(severity, message);
        }
    }
}

/// Production sink: forwards into `tracing` events.
///
/// Audit lines go out under the `audit` target at info level; the subscriber
/// built in `main` keeps that target enabled even when the global level is
/// stricter.
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!("{message}"),
            Severity::Info => tracing::info!("{message}"),
            Severity::Warn => tracing::warn!("{message}"),
            Severity::Error => tracing::error!("{message}"),
        }
    }

    fn always(&self, message: &str) {
        tracing::info!(target: "audit", "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSink {
        fn entries(&self) -> Vec<(String, String)> {
            self.entries.lock().unwrap().clone()
        }
    }

    impl LogSink for RecordingSink {
        fn emit(&self, severity: Severity, message: &str) {
            self.entries
                .lock()
                .unwrap()
                .push((severity.as_str().to_string(), message.to_string()));
        }

        fn always(&self, message: &str) {
            self.entries
                .lock()
                .unwrap()
                .push(("log".to_string(), message.to_string()));
        }
    }

    #[test]
    fn suppresses_below_threshold_and_forwards_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let filter = SeverityFilter::new(sink.clone(), Severity::Warn);

        filter.log("testLog");
        filter.error("testError");
        filter.warn("testWarn");
        filter.info("testInfo");
        filter.debug("testDebug");

        assert_eq!(
            sink.entries(),
            vec![
                ("log".to_string(), "testLog".to_string()),
                ("error".to_string(), "testError".to_string()),
                ("warn".to_string(), "testWarn".to_string()),
            ]
        );
    }

    #[test]
    fn debug_threshold_forwards_everything() {
        let sink = Arc::new(RecordingSink::default());
        let filter = SeverityFilter::new(sink.clone(), Severity::Debug);

        filter.debug("a");
        filter.info("b");
        filter.warn("c");
        filter.error("d");

        assert_eq!(sink.entries().len(), 4);
    }

    #[test]
    fn audit_channel_survives_error_threshold() {
        let sink = Arc::new(RecordingSink::default());
        let filter = SeverityFilter::new(sink.clone(), Severity::Error);

        filter.warn("dropped");
        filter.log("kept");

        assert_eq!(sink.entries(), vec![("log".to_string(), "kept".to_string())]);
    }

    #[test]
    fn severity_ordering_and_parsing() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);

        assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warn);
        assert!("verbose".parse::<Severity>().is_err());
        // The audit channel is not a configurable threshold.
        assert!("log".parse::<Severity>().is_err());
    }
}
