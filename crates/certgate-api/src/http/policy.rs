//! Endpoint to credential-scheme mapping.

/// Endpoints that exchange a one-time enrollment secret for a certificate.
pub const BASIC_AUTH_ENDPOINTS: &[&str] = &["sign", "enroll"];

/// Credential scheme a wrapped endpoint accepts. Fixed when the route is wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthPolicy {
    /// Only basic credentials checked against the user registry.
    BasicOnly,
    /// Only signed-request tokens bound to a certificate in good standing.
    TokenOnly,
}

impl AuthPolicy {
    /// Select the policy for an endpoint name.
    ///
    /// Names outside [`BASIC_AUTH_ENDPOINTS`] are token-gated, never open.
    #[must_use]
    pub fn for_endpoint(endpoint: &str) -> Self {
        if BASIC_AUTH_ENDPOINTS.contains(&endpoint) {
            Self::BasicOnly
        } else {
            Self::TokenOnly
        }
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BasicOnly => "basic",
            Self::TokenOnly => "token",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issuance_endpoints_use_basic() {
        assert_eq!(AuthPolicy::for_endpoint("sign"), AuthPolicy::BasicOnly);
        assert_eq!(AuthPolicy::for_endpoint("enroll"), AuthPolicy::BasicOnly);
    }

    #[test]
    fn everything_else_uses_token() {
        for endpoint in ["reenroll", "revoke", "register", "tcert", "", "Sign", "enroll/", " sign"] {
            assert_eq!(
                AuthPolicy::for_endpoint(endpoint),
                AuthPolicy::TokenOnly,
                "{endpoint:?}"
            );
        }
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(AuthPolicy::BasicOnly.as_str(), "basic");
        assert_eq!(AuthPolicy::TokenOnly.as_str(), "token");
    }
}
