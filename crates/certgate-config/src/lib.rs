#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, unreachable_pub, clippy::pedantic)]

//! Shared authentication configuration and the capabilities the gate consumes.
//!
//! Layout: `settings.rs` (loading and validation), `service.rs` (`AuthConfig`,
//! the live shared handle), `capability.rs` (registry/verifier/store traits),
//! `model.rs` (identities and certificate records), `registry.rs` and
//! `store.rs` (in-memory implementations), `error.rs`.

pub mod capability;
pub mod error;
pub mod model;
pub mod registry;
pub mod service;
pub mod settings;
pub mod store;

pub use capability::{CertificateStore, TokenVerifier, UserRegistry};
pub use error::{ConfigError, ConfigResult, StoreError, TokenError, UserRegistryError};
pub use model::{CertificateRecord, CertificateStatus, ClientCertificate, Identity};
pub use registry::MemoryUserRegistry;
pub use service::{AuthConfig, SharedAuthConfig};
pub use settings::{AuthSettings, DEFAULT_MAX_BODY_BYTES, DEFAULT_ROUTE_PREFIX};
pub use store::MemoryCertificateStore;
