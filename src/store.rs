//! Narrow async interface to the remote secret/key store.
//!
//! Everything this crate does ends in one of these calls. Transport,
//! authentication, timeout, and retry policy live outside the trait: a
//! failing call surfaces as [`Error::Transient`](crate::Error::Transient)
//! (or [`Error::Crypto`](crate::Error::Crypto) for fail-closed decrypt
//! failures) and the caller decides what to do with it.

use crate::errors::Result;
use crate::types::{CertificateInfo, KeyReference, SecretListing, SignatureAlgorithm};
use async_trait::async_trait;
use std::sync::Arc;

/// Handle for a store-side delete, which may be a long-running operation.
///
/// Obtained from [`SecretStore::begin_delete_secret`] and redeemed with
/// [`SecretStore::await_deletion`]; local state must not change until the
/// store confirms completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOperation {
    pub name: String,
    pub token: u64,
}

/// Remote secret/key store contract.
///
/// `fetch_secret` and the certificate lookups model absence as `Ok(None)`;
/// absence is a normal outcome the caller must branch on, not an error.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the current value of a named secret.
    async fn fetch_secret(&self, name: &str) -> Result<Option<String>>;

    /// Create or replace a named secret.
    async fn write_secret(&self, name: &str, value: &str) -> Result<()>;

    /// Start deleting a named secret.
    async fn begin_delete_secret(&self, name: &str) -> Result<DeleteOperation>;

    /// Wait until a previously started delete has completed store-side.
    async fn await_deletion(&self, operation: DeleteOperation) -> Result<()>;

    /// Enumerate the secrets the store knows about.
    async fn list_secrets(&self) -> Result<Vec<SecretListing>>;

    /// Encrypt `plaintext` under the key material bound to `purpose`.
    async fn encrypt(&self, purpose: &str, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt `ciphertext` under the key material bound to `purpose`.
    ///
    /// Fails closed with [`CryptoError::MacMismatch`](crate::CryptoError)
    /// when the ciphertext was produced under different material.
    async fn decrypt(&self, purpose: &str, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Sign a content digest with the named key.
    async fn sign(&self, key: &KeyReference, digest: &[u8]) -> Result<Vec<u8>>;

    /// Verify a signature over a content digest with the named key.
    async fn verify(&self, key: &KeyReference, digest: &[u8], signature: &[u8]) -> Result<bool>;

    /// Resolve the current certificate for a signing key.
    async fn certificate_for_key(&self, key: &KeyReference) -> Result<Option<CertificateInfo>>;

    /// Look a certificate up by thumbprint, including rotated-out ones.
    async fn find_certificate(&self, thumbprint: &[u8]) -> Result<Option<CertificateInfo>>;

    /// Signature scheme the store uses for [`SecretStore::sign`].
    fn signature_algorithm(&self) -> SignatureAlgorithm;
}

#[async_trait]
impl<T> SecretStore for Arc<T>
where
    T: SecretStore + ?Sized,
{
    async fn fetch_secret(&self, name: &str) -> Result<Option<String>> {
        (**self).fetch_secret(name).await
    }

    async fn write_secret(&self, name: &str, value: &str) -> Result<()> {
        (**self).write_secret(name, value).await
    }

    async fn begin_delete_secret(&self, name: &str) -> Result<DeleteOperation> {
        (**self).begin_delete_secret(name).await
    }

    async fn await_deletion(&self, operation: DeleteOperation) -> Result<()> {
        (**self).await_deletion(operation).await
    }

    async fn list_secrets(&self) -> Result<Vec<SecretListing>> {
        (**self).list_secrets().await
    }

    async fn encrypt(&self, purpose: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        (**self).encrypt(purpose, plaintext).await
    }

    async fn decrypt(&self, purpose: &str, ciphertext: &[u8]) -> Result<Vec<u8>> {
        (**self).decrypt(purpose, ciphertext).await
    }

    async fn sign(&self, key: &KeyReference, digest: &[u8]) -> Result<Vec<u8>> {
        (**self).sign(key, digest).await
    }

    async fn verify(&self, key: &KeyReference, digest: &[u8], signature: &[u8]) -> Result<bool> {
        (**self).verify(key, digest, signature).await
    }

    async fn certificate_for_key(&self, key: &KeyReference) -> Result<Option<CertificateInfo>> {
        (**self).certificate_for_key(key).await
    }

    async fn find_certificate(&self, thumbprint: &[u8]) -> Result<Option<CertificateInfo>> {
        (**self).find_certificate(thumbprint).await
    }

    fn signature_algorithm(&self) -> SignatureAlgorithm {
        (**self).signature_algorithm()
    }
}
