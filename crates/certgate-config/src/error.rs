//! Error types for configuration loading and the consumed capabilities.

use std::io;

use argon2::password_hash::Error as PasswordHashError;
use thiserror::Error;

/// Errors raised while loading or validating gate settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Settings document could not be parsed.
    #[error("failed to parse settings document")]
    Parse {
        /// Source serde error.
        source: serde_json::Error,
    },
    /// File system operation failed.
    #[error("filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced by a [`UserRegistry`](crate::UserRegistry) login.
#[derive(Debug, Error)]
pub enum UserRegistryError {
    /// No identity is registered under the supplied name.
    #[error("unknown identity")]
    UnknownIdentity {
        /// Name presented by the caller.
        username: String,
    },
    /// The enrollment secret did not match.
    #[error("invalid enrollment secret")]
    InvalidSecret {
        /// Name presented by the caller.
        username: String,
    },
    /// The identity has used all of its enrollments.
    #[error("enrollment limit reached")]
    EnrollmentLimitReached {
        /// Name presented by the caller.
        username: String,
        /// Configured enrollment ceiling.
        max_enrollments: u32,
    },
    /// Failed to hash secret material.
    #[error("failed to hash secret material")]
    SecretHashFailed {
        /// Hashing error detail.
        detail: PasswordHashError,
    },
    /// Stored secret hash payload was invalid.
    #[error("invalid stored hash")]
    StoredHashInvalid {
        /// Hash parsing error detail.
        detail: PasswordHashError,
    },
    /// Secret verification failed for a reason other than a mismatch.
    #[error("failed to verify secret")]
    SecretVerifyFailed {
        /// Verification error detail.
        detail: PasswordHashError,
    },
    /// The registry backend could not be reached.
    #[error("user registry unavailable")]
    Unavailable {
        /// Operation identifier.
        operation: &'static str,
        /// Backend-supplied detail.
        detail: String,
    },
}

/// Errors surfaced by a [`TokenVerifier`](crate::TokenVerifier).
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token envelope could not be parsed.
    #[error("malformed token")]
    Malformed {
        /// Parser detail.
        detail: String,
    },
    /// The embedded signer certificate could not be decoded.
    #[error("invalid signer certificate")]
    CertificateInvalid {
        /// Decoder detail.
        detail: String,
    },
    /// The signature does not match the request body.
    #[error("token signature mismatch")]
    SignatureMismatch,
}

/// Errors surfaced by a [`CertificateStore`](crate::CertificateStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store backend failed to answer the lookup.
    #[error("certificate store lookup failed")]
    Lookup {
        /// Operation identifier.
        operation: &'static str,
        /// Backend-supplied detail.
        detail: String,
    },
}
