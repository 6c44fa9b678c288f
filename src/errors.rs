use thiserror::Error;

/// Result alias for vault operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Canonical error surface for the crate.
///
/// `NotFound` for plain secret reads is modelled as `Ok(None)` at the call
/// sites that expect it; the variant here covers lookups where absence is a
/// hard failure (signing key, certificate during signing).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{field} must not be empty")]
    EmptyComponent { field: &'static str },
    #[error("{entity} not found")]
    NotFound { entity: String },
    #[error("transient store error: {0}")]
    Transient(String),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Fail-closed failures raised while decrypting or decoding field values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("message authentication failed")]
    MacMismatch,
    #[error("ciphertext is malformed: {0}")]
    Malformed(String),
    #[error("decrypted value failed to decode: {0}")]
    Decode(String),
}

impl Error {
    pub(crate) fn not_found(entity: impl Into<String>) -> Self {
        Error::NotFound {
            entity: entity.into(),
        }
    }

    /// True when the operation may succeed on retry against the store.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_))
    }
}

/// Reject empty or whitespace-only caller input.
pub(crate) fn require_non_empty(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::EmptyComponent { field });
    }
    Ok(())
}
