use crate::errors::{require_non_empty, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque handle naming an asymmetric signing key (and, for stores that
/// support it, a symmetric encryption key) held by the remote vault.
///
/// References are resolved per operation and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyReference {
    name: String,
}

impl KeyReference {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        require_non_empty(&name, "key name")?;
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for KeyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Read-only certificate snapshot fetched from the store at verification
/// time. Usable for verification only while `enabled` and unexpired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInfo {
    #[serde(with = "base64_bytes")]
    pub thumbprint: Vec<u8>,
    pub expires_at: DateTime<Utc>,
    pub enabled: bool,
    pub key: KeyReference,
}

impl CertificateInfo {
    /// Lifecycle check: expiry and enablement are preconditions for any
    /// cryptographic use of the certificate.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.enabled && now < self.expires_at
    }

    /// Thumbprint rendered as lowercase hex for logs and reports.
    pub fn thumbprint_hex(&self) -> String {
        hex_string(&self.thumbprint)
    }
}

/// Entry returned when enumerating secrets held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretListing {
    pub name: String,
    pub enabled: bool,
}

/// Hash algorithm recorded in a signed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[serde(rename = "SHA-256")]
    Sha256,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha256 => f.write_str("SHA-256"),
        }
    }
}

/// Signature algorithm recorded in a signed document.
///
/// The set is open ended: remote vaults report whichever scheme the named
/// key uses, the in-process [`MemoryVault`](crate::MemoryVault) signs
/// Ed25519.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    #[serde(rename = "RS256")]
    RsaPkcs1Sha256,
    #[serde(rename = "PS256")]
    RsaPssSha256,
    #[serde(rename = "EdDSA")]
    Ed25519,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::RsaPkcs1Sha256 => "RS256",
            SignatureAlgorithm::RsaPssSha256 => "PS256",
            SignatureAlgorithm::Ed25519 => "EdDSA",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "RS256" => Ok(SignatureAlgorithm::RsaPkcs1Sha256),
            "PS256" => Ok(SignatureAlgorithm::RsaPssSha256),
            "EdDSA" => Ok(SignatureAlgorithm::Ed25519),
            other => Err(Error::Signing(format!(
                "unknown signature algorithm: {other}"
            ))),
        }
    }
}

/// A document with a detached signature over its canonical content.
///
/// Logically immutable once assembled: the verifier recomputes the content
/// hash from `canonical_content`, so any field change invalidates the
/// signature. Persistence and transport are the caller's concern, but the
/// JSON field names below are a wire contract shared by signer and
/// verifier processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedDocument {
    pub document_id: Uuid,
    pub document_type: String,
    pub canonical_content: String,
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub certificate_thumbprint: Vec<u8>,
    pub signed_at: DateTime<Utc>,
    pub signer_identity: String,
    pub hash_algorithm: HashAlgorithm,
    pub signature_algorithm: SignatureAlgorithm,
}

/// Why a verification came back negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyReason {
    CertificateNotFound,
    CertificateExpired,
    CertificateDisabled,
    SignatureMismatch,
}

impl VerifyReason {
    pub fn describe(&self) -> &'static str {
        match self {
            VerifyReason::CertificateNotFound => "signing certificate not found",
            VerifyReason::CertificateExpired => "signing certificate has expired",
            VerifyReason::CertificateDisabled => "signing certificate is disabled",
            VerifyReason::SignatureMismatch => "signature does not match document content",
        }
    }
}

/// Result of verifying a [`SignedDocument`]. Rejection is a value, not an
/// error: callers branch on `valid` and may surface `reason` to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub valid: bool,
    pub reason: Option<VerifyReason>,
}

impl VerifyOutcome {
    pub(crate) fn pass() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub(crate) fn reject(reason: VerifyReason) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
        }
    }
}

/// Audit/display report produced by
/// [`DocumentSigner::signature_info`](crate::DocumentSigner::signature_info).
///
/// Intended for humans; security decisions belong to
/// [`VerifyOutcome::valid`], not to the problem list being empty or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureReport {
    pub valid: bool,
    pub signer_identity: String,
    pub certificate_thumbprint: String,
    pub certificate_expires_at: Option<DateTime<Utc>>,
    pub problems: Vec<String>,
}

/// Render bytes as lowercase hex.
pub(crate) fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Serde helper encoding byte fields as standard base64 strings.
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
