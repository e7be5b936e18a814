//! Identities and certificate records exchanged with the consumed capabilities.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Identity returned by a successful basic-credential login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Registered name of the identity.
    pub name: String,
}

/// Signer certificate recovered from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    /// Serial number in the verifier's canonical (decimal) rendering.
    pub serial_number: String,
    /// Raw authority key identifier extension bytes.
    pub authority_key_id: Vec<u8>,
}

impl ClientCertificate {
    /// Lower-case hex encoding of the authority key identifier, as used for store lookups.
    #[must_use]
    pub fn authority_key_id_hex(&self) -> String {
        hex::encode(&self.authority_key_id)
    }
}

/// Revocation status recorded for an issued certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CertificateStatus {
    /// The certificate is in good standing.
    Good,
    /// The certificate has been revoked.
    Revoked,
    /// Any other status value reported by the store.
    Other(String),
}

impl CertificateStatus {
    /// Canonical string form of the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Good => "good",
            Self::Revoked => "revoked",
            Self::Other(value) => value,
        }
    }

    /// Whether the status permits the bearer's requests.
    #[must_use]
    pub const fn is_good(&self) -> bool {
        matches!(self, Self::Good)
    }
}

impl From<&str> for CertificateStatus {
    fn from(value: &str) -> Self {
        match value {
            "good" => Self::Good,
            "revoked" => Self::Revoked,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for CertificateStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<CertificateStatus> for String {
    fn from(value: CertificateStatus) -> Self {
        value.as_str().to_string()
    }
}

impl Display for CertificateStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Certificate row as held by the certificate store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// Serial number, matching [`ClientCertificate::serial_number`].
    pub serial_number: String,
    /// Hex-encoded authority key identifier.
    pub authority_key_id: String,
    /// Current revocation status.
    pub status: CertificateStatus,
}
