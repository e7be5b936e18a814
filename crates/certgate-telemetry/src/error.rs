//! Errors raised while wiring up logging and the gate's metrics.

use std::fmt::{self, Display, Formatter};

use prometheus::Error as PrometheusError;
use thiserror::Error;
use tracing_subscriber::util::TryInitError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Step of collector setup that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorStage {
    /// Building the counter vector (bad name or label set).
    Build,
    /// Adding the counter to the registry (usually a duplicate name).
    Register,
}

impl Display for CollectorStage {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Build => "build",
            Self::Register => "register",
        })
    }
}

/// Errors raised by telemetry helpers.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global tracing subscriber was already installed, or installation failed.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Underlying subscriber error.
        #[source]
        source: TryInitError,
    },
    /// A gate counter could not be set up.
    #[error("failed to {stage} gate counter {metric}")]
    Collector {
        /// Counter name.
        metric: &'static str,
        /// Setup step that failed.
        stage: CollectorStage,
        /// Underlying Prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// The gate counters could not be encoded in the text exposition format.
    #[error("failed to encode gate counters")]
    Exposition {
        /// Underlying Prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// The encoded exposition was not UTF-8.
    #[error("gate counter exposition was not valid utf-8")]
    ExpositionUtf8 {
        /// Underlying conversion error.
        #[source]
        source: std::string::FromUtf8Error,
    },
}

impl TelemetryError {
    pub(crate) fn collector(
        metric: &'static str,
        stage: CollectorStage,
    ) -> impl FnOnce(PrometheusError) -> Self {
        move |source| Self::Collector {
            metric,
            stage,
            source,
        }
    }
}
