//! Prometheus-backed metrics registry for the authentication gate.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Outcome labels are coarse on purpose; the rejection cause is only logged.

use std::sync::Arc;

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{CollectorStage, Result, TelemetryError};

/// Policy label values the gate reports under.
const POLICY_LABELS: [&str; 2] = ["basic", "token"];

/// Coarse outcome of a single pass through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Authentication is disabled; the request was forwarded unchecked.
    Bypass,
    /// Credentials were accepted and the request was forwarded.
    Allowed,
    /// No `Authorization` header was presented.
    MissingHeader,
    /// Any other rejection.
    Rejected,
}

impl AuthOutcome {
    /// Label value used in the `auth_requests_total` counter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bypass => "bypass",
            Self::Allowed => "allowed",
            Self::MissingHeader => "missing_header",
            Self::Rejected => "rejected",
        }
    }
}

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    gate_responses_total: IntCounterVec,
    auth_requests_total: IntCounterVec,
}

/// Snapshot of the gate counters for health reporting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    /// Requests forwarded because authentication was disabled.
    pub bypassed_total: u64,
    /// Requests forwarded after successful authentication.
    pub allowed_total: u64,
    /// Requests rejected for lacking an `Authorization` header.
    pub missing_header_total: u64,
    /// Requests rejected for any other reason.
    pub rejected_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let gate_responses_total = IntCounterVec::new(
            Opts::new(
                "gate_responses_total",
                "Responses leaving a gated route, by route, policy and status code",
            ),
            &["route", "policy", "code"],
        )
        .map_err(TelemetryError::collector(
            "gate_responses_total",
            CollectorStage::Build,
        ))?;
        let auth_requests_total = IntCounterVec::new(
            Opts::new(
                "auth_requests_total",
                "Authentication gate decisions by policy and outcome",
            ),
            &["policy", "outcome"],
        )
        .map_err(TelemetryError::collector(
            "auth_requests_total",
            CollectorStage::Build,
        ))?;

        for (metric, collector) in [
            ("gate_responses_total", &gate_responses_total),
            ("auth_requests_total", &auth_requests_total),
        ] {
            registry
                .register(Box::new(collector.clone()))
                .map_err(TelemetryError::collector(metric, CollectorStage::Register))?;
        }

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                gate_responses_total,
                auth_requests_total,
            }),
        })
    }

    /// Count a response leaving the gated `route`, whether produced by the
    /// gate itself or by the handler behind it.
    pub fn inc_gate_response(&self, route: &str, policy: &str, status: u16) {
        let code = status.to_string();
        self.inner
            .gate_responses_total
            .with_label_values(&[route, policy, code.as_str()])
            .inc();
    }

    /// Responses counted so far for `route` under `policy` with `status`.
    #[must_use]
    pub fn gate_responses(&self, route: &str, policy: &str, status: u16) -> u64 {
        let code = status.to_string();
        self.inner
            .gate_responses_total
            .with_label_values(&[route, policy, code.as_str()])
            .get()
    }

    /// Record a gate decision for the given policy label.
    pub fn inc_auth_outcome(&self, policy: &str, outcome: AuthOutcome) {
        self.inner
            .auth_requests_total
            .with_label_values(&[policy, outcome.as_str()])
            .inc();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Exposition { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::ExpositionUtf8 { source })
    }

    /// Take a point-in-time snapshot of the gate counters, summed across policies.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = |outcome: AuthOutcome| {
            POLICY_LABELS
                .iter()
                .map(|policy| {
                    self.inner
                        .auth_requests_total
                        .with_label_values(&[*policy, outcome.as_str()])
                        .get()
                })
                .sum::<u64>()
        };
        MetricsSnapshot {
            bypassed_total: total(AuthOutcome::Bypass),
            allowed_total: total(AuthOutcome::Allowed),
            missing_header_total: total(AuthOutcome::MissingHeader),
            rejected_total: total(AuthOutcome::Rejected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_gate_response("/api/v1/cfssl/enroll", "basic", 200);
        metrics.inc_gate_response("/api/v1/cfssl/enroll", "basic", 200);
        metrics.inc_gate_response("/api/v1/cfssl/revoke", "token", 401);
        metrics.inc_auth_outcome("basic", AuthOutcome::Allowed);
        metrics.inc_auth_outcome("token", AuthOutcome::Allowed);
        metrics.inc_auth_outcome("token", AuthOutcome::Rejected);
        metrics.inc_auth_outcome("token", AuthOutcome::MissingHeader);
        metrics.inc_auth_outcome("basic", AuthOutcome::Bypass);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.allowed_total, 2);
        assert_eq!(snapshot.rejected_total, 1);
        assert_eq!(snapshot.missing_header_total, 1);
        assert_eq!(snapshot.bypassed_total, 1);
        assert_eq!(metrics.gate_responses("/api/v1/cfssl/enroll", "basic", 200), 2);
        assert_eq!(metrics.gate_responses("/api/v1/cfssl/revoke", "token", 401), 1);
        assert_eq!(metrics.gate_responses("/api/v1/cfssl/revoke", "token", 200), 0);

        let rendered = metrics.render()?;
        assert!(rendered.contains("gate_responses_total"));
        assert!(rendered.contains("auth_requests_total"));
        Ok(())
    }

    #[test]
    fn outcome_labels_are_stable() {
        assert_eq!(AuthOutcome::Bypass.as_str(), "bypass");
        assert_eq!(AuthOutcome::MissingHeader.as_str(), "missing_header");
    }
}
