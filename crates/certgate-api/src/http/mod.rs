//! HTTP surface modules (policy, gate, routing).

/// Credential classification and the per-request checks.
pub mod auth;
/// Shared constants and header names.
pub mod constants;
/// Problem response helpers.
pub mod errors;
/// Route wrapping.
pub mod factory;
/// Tower layer/service applying the checks.
pub mod gate;
/// Endpoint to credential-scheme mapping.
pub mod policy;
/// Router assembly.
pub mod router;
