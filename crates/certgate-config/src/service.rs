//! Live, shared authentication configuration.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::capability::{CertificateStore, TokenVerifier, UserRegistry};
use crate::settings::AuthSettings;

/// Process-wide configuration read by every gate on every request.
///
/// Gates hold a [`SharedAuthConfig`] rather than a copy, so toggling
/// authentication is observed by gates that were built earlier.
pub struct AuthConfig {
    authentication: AtomicBool,
    user_registry: Arc<dyn UserRegistry>,
    token_verifier: Arc<dyn TokenVerifier>,
    cert_store: Arc<dyn CertificateStore>,
}

/// Shared reference to the live configuration.
pub type SharedAuthConfig = Arc<AuthConfig>;

impl AuthConfig {
    /// Assemble a configuration from its capabilities.
    #[must_use]
    pub fn new(
        authentication: bool,
        user_registry: Arc<dyn UserRegistry>,
        token_verifier: Arc<dyn TokenVerifier>,
        cert_store: Arc<dyn CertificateStore>,
    ) -> Self {
        Self {
            authentication: AtomicBool::new(authentication),
            user_registry,
            token_verifier,
            cert_store,
        }
    }

    /// Assemble a configuration whose toggle comes from loaded settings.
    #[must_use]
    pub fn from_settings(
        settings: &AuthSettings,
        user_registry: Arc<dyn UserRegistry>,
        token_verifier: Arc<dyn TokenVerifier>,
        cert_store: Arc<dyn CertificateStore>,
    ) -> Self {
        Self::new(
            settings.authentication,
            user_registry,
            token_verifier,
            cert_store,
        )
    }

    /// Wrap the configuration for sharing across gates.
    #[must_use]
    pub fn shared(self) -> SharedAuthConfig {
        Arc::new(self)
    }

    /// Whether credentials are currently enforced.
    #[must_use]
    pub fn authentication_enabled(&self) -> bool {
        self.authentication.load(Ordering::Acquire)
    }

    /// Turn credential enforcement on or off for all gates.
    pub fn set_authentication_enabled(&self, enabled: bool) {
        let previous = self.authentication.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            info!(enabled, "authentication toggled");
        }
    }

    /// Registry consulted for basic credentials.
    #[must_use]
    pub fn user_registry(&self) -> &Arc<dyn UserRegistry> {
        &self.user_registry
    }

    /// Verifier consulted for signed-request tokens.
    #[must_use]
    pub fn token_verifier(&self) -> &Arc<dyn TokenVerifier> {
        &self.token_verifier
    }

    /// Store consulted for revocation status.
    #[must_use]
    pub fn cert_store(&self) -> &Arc<dyn CertificateStore> {
        &self.cert_store
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthConfig")
            .field("authentication", &self.authentication_enabled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TokenError;
    use crate::model::ClientCertificate;
    use crate::registry::MemoryUserRegistry;
    use crate::store::MemoryCertificateStore;

    struct RejectingVerifier;

    impl TokenVerifier for RejectingVerifier {
        fn verify_token(
            &self,
            _header_value: &str,
            _body: &[u8],
        ) -> Result<ClientCertificate, TokenError> {
            Err(TokenError::SignatureMismatch)
        }
    }

    fn config(enabled: bool) -> SharedAuthConfig {
        AuthConfig::new(
            enabled,
            Arc::new(MemoryUserRegistry::new()),
            Arc::new(RejectingVerifier),
            Arc::new(MemoryCertificateStore::new()),
        )
        .shared()
    }

    #[test]
    fn toggle_is_visible_through_every_clone() {
        let config = config(true);
        let observer = Arc::clone(&config);
        assert!(observer.authentication_enabled());
        config.set_authentication_enabled(false);
        assert!(!observer.authentication_enabled());
        config.set_authentication_enabled(true);
        assert!(observer.authentication_enabled());
    }

    #[test]
    fn settings_seed_the_toggle() {
        let settings = AuthSettings {
            authentication: false,
            ..AuthSettings::default()
        };
        let config = AuthConfig::from_settings(
            &settings,
            Arc::new(MemoryUserRegistry::new()),
            Arc::new(RejectingVerifier),
            Arc::new(MemoryCertificateStore::new()),
        );
        assert!(!config.authentication_enabled());
        assert!(format!("{config:?}").contains("authentication: false"));
    }
}
