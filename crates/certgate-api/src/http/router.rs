//! Router assembly for wrapped endpoints.

use std::collections::HashSet;
use std::convert::Infallible;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use axum::{Router, body::Body, http::Request, response::Response};
use certgate_telemetry::build_sha;
use tower::{Service, ServiceBuilder};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{Span, info, warn};

use crate::http::constants::HEADER_REQUEST_ID;
use crate::http::factory::HandlerFactory;

/// Why an endpoint could not be mounted.
#[derive(Debug)]
pub enum MountError<E> {
    /// Building the endpoint's handler failed; the error is passed through untouched.
    Handler(E),
    /// Another endpoint already occupies this path.
    DuplicateRoute {
        /// Canonical path that was already mounted.
        path: String,
    },
    /// The path cannot be routed (no leading `/`, or it contains capture braces).
    InvalidPath {
        /// Canonical path that was rejected.
        path: String,
    },
}

impl<E: Display> Display for MountError<E> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(err) => err.fmt(formatter),
            Self::DuplicateRoute { path } => write!(formatter, "route {path} is already mounted"),
            Self::InvalidPath { path } => write!(formatter, "route {path} cannot be mounted"),
        }
    }
}

impl<E: Error + 'static> Error for MountError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Handler(err) => err.source(),
            Self::DuplicateRoute { .. } | Self::InvalidPath { .. } => None,
        }
    }
}

/// Collects wrapped endpoints into an axum [`Router`].
pub struct AuthRouter {
    factory: HandlerFactory,
    router: Router,
    mounted: HashSet<String>,
}

impl AuthRouter {
    /// Start an empty router whose routes are wrapped by `factory`.
    #[must_use]
    pub fn new(factory: HandlerFactory) -> Self {
        Self {
            factory,
            router: Router::new(),
            mounted: HashSet::new(),
        }
    }

    /// Wrap and mount the handler for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`MountError::Handler`] carrying `next`'s error unchanged, or a
    /// path error when the endpoint collides with a mounted one or cannot be
    /// routed. Nothing is mounted in either case.
    pub fn route<S, E>(
        mut self,
        endpoint: &str,
        next: Result<S, E>,
    ) -> Result<Self, MountError<E>>
    where
        S: Service<Request<Body>, Response = Response, Error = Infallible>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        let wrapped = self.factory.wrap(endpoint, next).map_err(MountError::Handler)?;
        if !wrapped.path.starts_with('/') || wrapped.path.contains(['{', '}']) {
            warn!(path = %wrapped.path, "refusing to mount unroutable path");
            return Err(MountError::InvalidPath { path: wrapped.path });
        }
        if self.mounted.contains(&wrapped.path) {
            warn!(path = %wrapped.path, "refusing to mount duplicate route");
            return Err(MountError::DuplicateRoute { path: wrapped.path });
        }
        info!(
            path = %wrapped.path,
            policy = wrapped.policy.as_str(),
            "mounted authenticated endpoint"
        );
        self.router = self.router.route_service(&wrapped.path, wrapped.gate);
        self.mounted.insert(wrapped.path);
        Ok(self)
    }

    /// Finish assembly, adding request-id and tracing layers.
    #[must_use]
    pub fn into_router(self) -> Router {
        // Route layers on an empty router panic in axum.
        if self.mounted.is_empty() {
            return self.router;
        }
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();

                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(|response: &Response, latency: Duration, span: &Span| {
                span.record("status_code", response.status().as_u16());
                let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                span.record("latency_ms", latency_ms);
            });
        let layered = ServiceBuilder::new()
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(trace_layer);

        self.router.route_layer(layered)
    }
}
