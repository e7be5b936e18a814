//! Route wrapping: picks the credential scheme for an endpoint and builds its gate.
//!
//! # Design
//! - A failure from building the inner handler is returned untouched; no
//!   route is produced, so a broken handler can never end up unauthenticated.
//! - The policy is fixed here and cannot change for the lifetime of the gate.

use certgate_config::{AuthSettings, DEFAULT_MAX_BODY_BYTES, DEFAULT_ROUTE_PREFIX, SharedAuthConfig};
use certgate_telemetry::Metrics;
use tower::Layer;
use tracing::debug;

use crate::http::auth::Authenticator;
use crate::http::gate::{AuthGate, AuthGateLayer};
use crate::http::policy::AuthPolicy;

/// Builds authentication gates bound to one shared configuration.
#[derive(Clone)]
pub struct HandlerFactory {
    config: SharedAuthConfig,
    prefix: String,
    body_limit: usize,
    telemetry: Option<Metrics>,
}

/// A wrapped endpoint ready to be mounted.
pub struct WrappedRoute<S> {
    /// Canonical route path (`prefix` + endpoint name).
    pub path: String,
    /// Policy the gate enforces.
    pub policy: AuthPolicy,
    /// The gate wrapping the endpoint's handler.
    pub gate: AuthGate<S>,
}

impl HandlerFactory {
    /// Create a factory with the default prefix and body limit.
    #[must_use]
    pub fn new(config: SharedAuthConfig) -> Self {
        Self {
            config,
            prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            body_limit: DEFAULT_MAX_BODY_BYTES,
            telemetry: None,
        }
    }

    /// Create a factory whose prefix and body limit come from loaded settings.
    #[must_use]
    pub fn from_settings(config: SharedAuthConfig, settings: &AuthSettings) -> Self {
        Self::new(config)
            .with_prefix(settings.route_prefix.clone())
            .with_body_limit(settings.max_body_bytes)
    }

    /// Override the route namespace.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Override the token-body buffering limit.
    #[must_use]
    pub const fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    /// Record gate decisions and responses for every wrapped route in `telemetry`.
    #[must_use]
    pub fn with_metrics(mut self, telemetry: Metrics) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Telemetry handle attached to this factory, if any.
    #[must_use]
    pub const fn metrics(&self) -> Option<&Metrics> {
        self.telemetry.as_ref()
    }

    /// Wrap the handler for `endpoint`, propagating any error from building it.
    ///
    /// # Errors
    ///
    /// Returns `next`'s error unchanged.
    pub fn wrap<S, E>(&self, endpoint: &str, next: Result<S, E>) -> Result<WrappedRoute<S>, E> {
        let next = next?;
        let policy = AuthPolicy::for_endpoint(endpoint);
        let path = route_path(&self.prefix, endpoint);
        debug!(path = %path, policy = policy.as_str(), "wrapping endpoint");

        let authenticator = Authenticator::new(policy, self.config.clone(), self.body_limit);
        let mut layer = AuthGateLayer::new(authenticator);
        if let Some(metrics) = &self.telemetry {
            layer = layer.with_metrics(metrics.clone(), &path);
        }
        let gate = layer.layer(next);
        Ok(WrappedRoute { path, policy, gate })
    }
}

/// Join a namespace prefix and an endpoint name with exactly one `/`.
#[must_use]
pub fn route_path(prefix: &str, endpoint: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    format!("{prefix}/{endpoint}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use certgate_config::{
        AuthConfig, ClientCertificate, MemoryCertificateStore, MemoryUserRegistry, TokenError,
        TokenVerifier,
    };

    struct NeverVerifies;

    impl TokenVerifier for NeverVerifies {
        fn verify_token(
            &self,
            _header_value: &str,
            _body: &[u8],
        ) -> Result<ClientCertificate, TokenError> {
            Err(TokenError::SignatureMismatch)
        }
    }

    fn factory() -> HandlerFactory {
        let config = AuthConfig::new(
            true,
            Arc::new(MemoryUserRegistry::new()),
            Arc::new(NeverVerifies),
            Arc::new(MemoryCertificateStore::new()),
        )
        .shared();
        HandlerFactory::new(config)
    }

    #[test]
    fn wrap_selects_policy_and_path() -> Result<(), &'static str> {
        let factory = factory();
        let enroll = factory.wrap("enroll", Ok::<_, &'static str>(()))?;
        assert_eq!(enroll.path, "/api/v1/cfssl/enroll");
        assert_eq!(enroll.policy, AuthPolicy::BasicOnly);
        assert_eq!(enroll.gate.policy(), AuthPolicy::BasicOnly);

        let revoke = factory.wrap("revoke", Ok::<_, &'static str>(()))?;
        assert_eq!(revoke.path, "/api/v1/cfssl/revoke");
        assert_eq!(revoke.policy, AuthPolicy::TokenOnly);
        Ok(())
    }

    #[test]
    fn wrap_propagates_construction_errors_verbatim() {
        let result = factory().wrap::<(), _>("sign", Err("handler construction failed"));
        assert!(matches!(result, Err("handler construction failed")));
    }

    #[test]
    fn settings_drive_prefix() -> Result<(), &'static str> {
        let settings = AuthSettings {
            route_prefix: "/api/v2/ca".to_string(),
            ..AuthSettings::default()
        };
        let factory = HandlerFactory::from_settings(factory().config, &settings);
        let route = factory.wrap("sign", Ok::<_, &'static str>(()))?;
        assert_eq!(route.path, "/api/v2/ca/sign");
        Ok(())
    }

    #[test]
    fn route_path_normalises_slashes() {
        assert_eq!(route_path("/api/v1/cfssl/", "sign"), "/api/v1/cfssl/sign");
        assert_eq!(route_path("/api/v1/cfssl", "/sign"), "/api/v1/cfssl/sign");
        assert_eq!(route_path("/", "info"), "/info");
    }
}
