//! Credential classification and the per-request authentication checks.
//!
//! # Design
//! - The policy is bound once per route; every request is checked against it.
//! - Rejection causes stay internal. Callers only ever see "missing header" or
//!   "authorization failure"; the cause goes to the debug log.
//! - Token-signed bodies are buffered once and handed back as a fresh body so
//!   the downstream handler reads exactly what was verified.

use axum::{
    body::{Body, to_bytes},
    http::{HeaderValue, Request, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose};
use certgate_config::{ClientCertificate, SharedAuthConfig, UserRegistryError};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::http::errors::ApiError;
use crate::http::policy::AuthPolicy;

const BASIC_SCHEME_PREFIX: &str = "basic ";

/// Why a request was turned away. Rendered as one of two problem documents.
#[derive(Debug, Error)]
pub enum AuthRejection {
    /// No `Authorization` header was presented.
    #[error("no authorization header")]
    MissingAuthHeader,
    /// Basic credentials were presented on a token-only route.
    #[error("basic authorization is not allowed on this route")]
    DisallowedCredentialForm,
    /// The user registry refused the basic credential.
    #[error("user registry rejected the credential")]
    LoginRejected(#[source] UserRegistryError),
    /// Any other failure: malformed header, unverifiable token, unknown or
    /// revoked certificate, store error, unreadable body.
    #[error("authorization failure")]
    AuthorizationFailure,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::MissingAuthHeader => ApiError::missing_authorization(),
            Self::DisallowedCredentialForm
            | Self::LoginRejected(_)
            | Self::AuthorizationFailure => ApiError::authorization_failure(),
        }
        .into_response()
    }
}

/// Credential form carried by an `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialPresentation {
    /// RFC 7617 basic credentials.
    Basic {
        /// Decoded user name.
        username: String,
        /// Decoded enrollment secret.
        secret: String,
    },
    /// Anything that is not well-formed basic credentials.
    Token {
        /// Raw header value, handed to the token verifier unchanged.
        header_value: String,
    },
}

impl CredentialPresentation {
    /// Classify a header value. Returns `None` when the value is not UTF-8.
    #[must_use]
    pub fn from_header(value: &HeaderValue) -> Option<Self> {
        let raw = std::str::from_utf8(value.as_bytes()).ok()?;
        Some(Self::from_header_str(raw))
    }

    /// Classify a header value already known to be text.
    #[must_use]
    pub fn from_header_str(raw: &str) -> Self {
        parse_basic(raw).map_or_else(
            || Self::Token {
                header_value: raw.to_string(),
            },
            |(username, secret)| Self::Basic { username, secret },
        )
    }
}

fn parse_basic(raw: &str) -> Option<(String, String)> {
    let (scheme, payload) = raw.split_at_checked(BASIC_SCHEME_PREFIX.len())?;
    if !scheme.eq_ignore_ascii_case(BASIC_SCHEME_PREFIX) {
        return None;
    }
    let decoded = general_purpose::STANDARD.decode(payload).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, secret) = decoded.split_once(':')?;
    Some((username.to_string(), secret.to_string()))
}

/// A request that passed the gate.
#[derive(Debug)]
pub struct Admission {
    /// The request to forward, with any buffered body restored.
    pub request: Request<Body>,
    /// `true` when authentication was disabled and nothing was checked.
    pub bypassed: bool,
}

impl Admission {
    const fn checked(request: Request<Body>) -> Self {
        Self {
            request,
            bypassed: false,
        }
    }
}

/// Applies one [`AuthPolicy`] to incoming requests.
#[derive(Clone)]
pub struct Authenticator {
    policy: AuthPolicy,
    config: SharedAuthConfig,
    body_limit: usize,
}

impl Authenticator {
    /// Bind a policy to the shared configuration.
    #[must_use]
    pub const fn new(policy: AuthPolicy, config: SharedAuthConfig, body_limit: usize) -> Self {
        Self {
            policy,
            config,
            body_limit,
        }
    }

    /// Policy this authenticator enforces.
    #[must_use]
    pub const fn policy(&self) -> AuthPolicy {
        self.policy
    }

    /// Check `req` against the bound policy.
    ///
    /// # Errors
    ///
    /// Returns the rejection cause when the request must not be forwarded.
    pub async fn authenticate(&self, req: Request<Body>) -> Result<Admission, AuthRejection> {
        info!(
            method = %req.method(),
            path = %req.uri().path(),
            policy = self.policy.as_str(),
            "received request"
        );

        if !self.config.authentication_enabled() {
            debug!("authentication is disabled");
            return Ok(Admission {
                request: req,
                bypassed: true,
            });
        }

        let header = req
            .headers()
            .get(AUTHORIZATION)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                debug!("no authorization header");
                AuthRejection::MissingAuthHeader
            })?;
        let presentation = CredentialPresentation::from_header(header).ok_or_else(|| {
            debug!("authorization header is not valid UTF-8");
            AuthRejection::AuthorizationFailure
        })?;

        match (presentation, self.policy) {
            (CredentialPresentation::Basic { .. }, AuthPolicy::TokenOnly) => {
                debug!("basic auth is not allowed on a token route");
                Err(AuthRejection::DisallowedCredentialForm)
            }
            (CredentialPresentation::Basic { username, secret }, AuthPolicy::BasicOnly) => {
                self.login(&username, &secret).await?;
                Ok(Admission::checked(req))
            }
            (CredentialPresentation::Token { .. }, AuthPolicy::BasicOnly) => {
                debug!("malformed basic credentials on a basic route");
                Err(AuthRejection::AuthorizationFailure)
            }
            (CredentialPresentation::Token { header_value }, AuthPolicy::TokenOnly) => {
                self.verify_token(req, &header_value).await.map(Admission::checked)
            }
        }
    }

    async fn login(&self, username: &str, secret: &str) -> Result<(), AuthRejection> {
        self.config
            .user_registry()
            .login_basic_auth(username, secret)
            .await
            .map_err(|err| {
                error!(error = %err, username, "failed authorizing user");
                AuthRejection::LoginRejected(err)
            })?;
        debug!(username, "basic credentials accepted");
        Ok(())
    }

    async fn verify_token(
        &self,
        req: Request<Body>,
        header_value: &str,
    ) -> Result<Request<Body>, AuthRejection> {
        let (parts, body) = req.into_parts();
        let bytes = to_bytes(body, self.body_limit).await.map_err(|err| {
            debug!(error = %err, limit = self.body_limit, "failed to buffer request body");
            AuthRejection::AuthorizationFailure
        })?;

        let certificate = self
            .config
            .token_verifier()
            .verify_token(header_value, &bytes)
            .map_err(|err| {
                debug!(error = %err, "token verification failed");
                AuthRejection::AuthorizationFailure
            })?;

        self.check_revocation(&certificate).await?;
        Ok(Request::from_parts(parts, Body::from(bytes)))
    }

    async fn check_revocation(&self, certificate: &ClientCertificate) -> Result<(), AuthRejection> {
        let serial = certificate.serial_number.as_str();
        let aki = certificate.authority_key_id_hex();
        let records = self
            .config
            .cert_store()
            .get_certificate(serial, &aki)
            .await
            .map_err(|err| {
                debug!(error = %err, serial, aki = %aki, "certificate lookup failed");
                AuthRejection::AuthorizationFailure
            })?;

        let [record] = records.as_slice() else {
            debug!(
                found = records.len(),
                serial,
                aki = %aki,
                "expected exactly one certificate record"
            );
            return Err(AuthRejection::AuthorizationFailure);
        };
        if !record.status.is_good() {
            debug!(status = %record.status, serial, "certificate is not in good standing");
            return Err(AuthRejection::AuthorizationFailure);
        }
        Ok(())
    }
}
