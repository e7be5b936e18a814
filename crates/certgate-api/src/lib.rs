#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, unreachable_pub, clippy::pedantic)]

//! Authentication gate for the certificate-authority HTTP API.
//!
//! Layout: `http/policy.rs` (endpoint → credential scheme), `http/factory.rs`
//! (route wrapping), `http/auth.rs` (credential checks), `http/gate.rs`
//! (tower service), `http/router.rs` (axum assembly), `http/errors.rs`
//! (problem responses).

/// HTTP surface modules.
pub mod http;
/// Wire models shared by responses.
pub mod models;

pub use http::auth::{Admission, AuthRejection, Authenticator, CredentialPresentation};
pub use http::factory::{HandlerFactory, WrappedRoute, route_path};
pub use http::gate::{AuthGate, AuthGateLayer};
pub use http::policy::{AuthPolicy, BASIC_AUTH_ENDPOINTS};
pub use http::router::{AuthRouter, MountError};
