//! Tower layer that runs the authentication checks in front of a route.
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use certgate_telemetry::{AuthOutcome, Metrics};
use tower::{Layer, Service};

use crate::http::auth::{AuthRejection, Authenticator};
use crate::http::policy::AuthPolicy;

/// Counters a gate reports into, labelled with the route it guards.
#[derive(Clone)]
struct GateTelemetry {
    metrics: Metrics,
    route: Arc<str>,
}

impl GateTelemetry {
    fn record(&self, policy: &str, outcome: AuthOutcome, status: u16) {
        self.metrics.inc_auth_outcome(policy, outcome);
        self.metrics.inc_gate_response(&self.route, policy, status);
    }
}

/// Wraps a service so that only authenticated requests reach it.
#[derive(Clone)]
pub struct AuthGateLayer {
    authenticator: Authenticator,
    telemetry: Option<GateTelemetry>,
}

impl AuthGateLayer {
    /// Construct a layer applying `authenticator` to every request.
    #[must_use]
    pub const fn new(authenticator: Authenticator) -> Self {
        Self {
            authenticator,
            telemetry: None,
        }
    }

    /// Count decisions and responses for `route` in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics, route: &str) -> Self {
        self.telemetry = Some(GateTelemetry {
            metrics,
            route: Arc::from(route),
        });
        self
    }
}

impl<S> Layer<S> for AuthGateLayer {
    type Service = AuthGate<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthGate {
            inner,
            authenticator: self.authenticator.clone(),
            telemetry: self.telemetry.clone(),
        }
    }
}

/// Service produced by [`AuthGateLayer`]. Rejected requests never reach `S`.
#[derive(Clone)]
pub struct AuthGate<S> {
    inner: S,
    authenticator: Authenticator,
    telemetry: Option<GateTelemetry>,
}

impl<S> AuthGate<S> {
    /// Policy enforced by this gate.
    #[must_use]
    pub const fn policy(&self) -> AuthPolicy {
        self.authenticator.policy()
    }
}

impl<S> Service<Request<Body>> for AuthGate<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness of the inner service is awaited only once a request is admitted.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let authenticator = self.authenticator.clone();
        let telemetry = self.telemetry.clone();

        Box::pin(async move {
            let policy = authenticator.policy().as_str();
            let (outcome, response) = match authenticator.authenticate(req).await {
                Ok(admission) => {
                    let outcome = if admission.bypassed {
                        AuthOutcome::Bypass
                    } else {
                        AuthOutcome::Allowed
                    };
                    std::future::poll_fn(|cx| inner.poll_ready(cx)).await?;
                    (outcome, inner.call(admission.request).await?)
                }
                Err(rejection) => {
                    let outcome = if matches!(rejection, AuthRejection::MissingAuthHeader) {
                        AuthOutcome::MissingHeader
                    } else {
                        AuthOutcome::Rejected
                    };
                    (outcome, rejection.into_response())
                }
            };
            if let Some(telemetry) = &telemetry {
                telemetry.record(policy, outcome, response.status().as_u16());
            }
            Ok(response)
        })
    }
}
