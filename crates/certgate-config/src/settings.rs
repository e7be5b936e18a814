//! Gate settings and their loaders.
//!
//! # Design
//! - Settings come from environment variables or a JSON document; both paths
//!   share [`AuthSettings::validate`].
//! - The environment loader takes an injectable lookup so tests never touch the
//!   process environment.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Route namespace used when none is configured.
pub const DEFAULT_ROUTE_PREFIX: &str = "/api/v1/cfssl/";
/// Largest token-signed request body the gate will buffer.
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

const ENV_AUTHENTICATION: &str = "CERTGATE_AUTHENTICATION";
const ENV_ROUTE_PREFIX: &str = "CERTGATE_ROUTE_PREFIX";
const ENV_MAX_BODY_BYTES: &str = "CERTGATE_MAX_BODY_BYTES";

/// Deployment settings for the authentication gate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthSettings {
    /// Whether credentials are checked at all.
    pub authentication: bool,
    /// Namespace prepended to every wrapped endpoint name.
    pub route_prefix: String,
    /// Limit applied when buffering token-signed request bodies.
    pub max_body_bytes: usize,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            authentication: true,
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl AuthSettings {
    /// Load settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable holds an invalid value.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through `lookup`, falling back to defaults for unset keys.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is invalid.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(raw) = lookup(ENV_AUTHENTICATION) {
            settings.authentication = parse_bool("authentication", &raw)?;
        }
        if let Some(raw) = lookup(ENV_ROUTE_PREFIX) {
            settings.route_prefix = raw.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_MAX_BODY_BYTES) {
            settings.max_body_bytes = raw.trim().parse().map_err(|_| ConfigError::InvalidField {
                field: "max_body_bytes",
                value: Some(raw.clone()),
                reason: "must be a non-negative integer",
            })?;
        }
        settings.validate()?;
        debug!(
            authentication = settings.authentication,
            route_prefix = %settings.route_prefix,
            "loaded gate settings"
        );
        Ok(settings)
    }

    /// Parse settings from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_json(document: &str) -> ConfigResult<Self> {
        let settings: Self =
            serde_json::from_str(document).map_err(|source| ConfigError::Parse { source })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read and parse a JSON settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its contents are invalid.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            operation: "settings.read",
            source,
        })?;
        Self::from_json(&document)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.route_prefix.starts_with('/') {
            return Err(ConfigError::InvalidField {
                field: "route_prefix",
                value: Some(self.route_prefix.clone()),
                reason: "must start with '/'",
            });
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::InvalidField {
                field: "max_body_bytes",
                value: Some("0".to_string()),
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }
}

fn parse_bool(field: &'static str, raw: &str) -> ConfigResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidField {
            field,
            value: Some(raw.to_string()),
            reason: "must be a boolean",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() -> ConfigResult<()> {
        let settings = AuthSettings::from_lookup(|_| None)?;
        assert_eq!(settings, AuthSettings::default());
        assert!(settings.authentication);
        assert_eq!(settings.route_prefix, "/api/v1/cfssl/");
        Ok(())
    }

    #[test]
    fn lookup_overrides_defaults() -> ConfigResult<()> {
        let settings = AuthSettings::from_lookup(lookup_from(&[
            ("CERTGATE_AUTHENTICATION", "Off"),
            ("CERTGATE_ROUTE_PREFIX", " /api/v2/ca/ "),
            ("CERTGATE_MAX_BODY_BYTES", "1024"),
        ]))?;
        assert!(!settings.authentication);
        assert_eq!(settings.route_prefix, "/api/v2/ca/");
        assert_eq!(settings.max_body_bytes, 1024);
        Ok(())
    }

    #[test]
    fn invalid_boolean_names_the_field() {
        let err = AuthSettings::from_lookup(lookup_from(&[("CERTGATE_AUTHENTICATION", "maybe")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "authentication",
                reason: "must be a boolean",
                ..
            }
        ));
    }

    #[test]
    fn prefix_must_be_absolute() {
        let err = AuthSettings::from_lookup(lookup_from(&[("CERTGATE_ROUTE_PREFIX", "api/")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "route_prefix",
                ..
            }
        ));
    }

    #[test]
    fn zero_body_limit_is_rejected() {
        let err = AuthSettings::from_lookup(lookup_from(&[("CERTGATE_MAX_BODY_BYTES", "0")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "max_body_bytes",
                reason: "must be greater than zero",
                ..
            }
        ));
    }

    #[test]
    fn json_document_rejects_unknown_fields() {
        let err = AuthSettings::from_json(r#"{"authentication": true, "realm": "x"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn json_file_round_trips_partial_documents() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{"authentication": false}}"#)?;
        let settings = AuthSettings::from_file(file.path())?;
        assert!(!settings.authentication);
        assert_eq!(settings.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        Ok(())
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = AuthSettings::from_file(Path::new("/nonexistent/certgate.json")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Io {
                operation: "settings.read",
                ..
            }
        ));
    }
}
