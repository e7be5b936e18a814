//! Capabilities consumed by the authentication gate.
//!
//! Implementations must tolerate concurrent calls from many in-flight requests.

use async_trait::async_trait;

use crate::error::{StoreError, TokenError, UserRegistryError};
use crate::model::{CertificateRecord, ClientCertificate, Identity};

/// Registry of identities allowed to exchange an enrollment secret.
#[async_trait]
pub trait UserRegistry: Send + Sync {
    /// Validate a basic credential. Enrollment bookkeeping, if any, happens here.
    async fn login_basic_auth(
        &self,
        username: &str,
        secret: &str,
    ) -> Result<Identity, UserRegistryError>;
}

/// Verifies signed-request tokens and recovers the signer certificate.
pub trait TokenVerifier: Send + Sync {
    /// Verify `header_value` as a signature over `body`.
    ///
    /// # Errors
    ///
    /// Returns an error when the token cannot be parsed or does not verify.
    fn verify_token(&self, header_value: &str, body: &[u8])
    -> Result<ClientCertificate, TokenError>;
}

/// Read access to issued certificates and their revocation status.
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Return every record matching the `(serial, aki)` pair.
    async fn get_certificate(
        &self,
        serial: &str,
        aki: &str,
    ) -> Result<Vec<CertificateRecord>, StoreError>;
}
