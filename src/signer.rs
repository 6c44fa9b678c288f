//! Signing and verification of structured documents.
//!
//! Signing canonicalizes the document, hashes the canonical bytes with
//! SHA-256, and has the store sign the digest under a named key. The
//! produced [`SignedDocument`] records the active certificate's thumbprint
//! so verification — possibly in another process, possibly years later —
//! can resolve the exact certificate, check its lifecycle, and only then
//! check the cryptography.

use crate::canonical::to_canonical_json;
use crate::errors::{require_non_empty, Error, Result};
use crate::store::SecretStore;
use crate::types::{
    CertificateInfo, HashAlgorithm, KeyReference, SignatureReport, SignedDocument, VerifyOutcome,
    VerifyReason,
};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

/// Produces and verifies non-repudiable signatures over documents.
pub struct DocumentSigner<S> {
    store: S,
    key: KeyReference,
    signer_identity: String,
}

impl<S> DocumentSigner<S>
where
    S: SecretStore,
{
    pub fn new(store: S, key: KeyReference, signer_identity: impl Into<String>) -> Result<Self> {
        let signer_identity = signer_identity.into();
        require_non_empty(&signer_identity, "signer identity")?;
        Ok(Self {
            store,
            key,
            signer_identity,
        })
    }

    /// Sign a document. Any step failing yields [`Error::Signing`] and no
    /// partial artifact.
    pub async fn sign<T: Serialize>(
        &self,
        document: &T,
        document_type: &str,
    ) -> Result<SignedDocument> {
        require_non_empty(document_type, "document type")?;

        let canonical_content = to_canonical_json(document)?;
        let digest = content_digest(&canonical_content);

        let signature = self
            .store
            .sign(&self.key, &digest)
            .await
            .map_err(signing_failure)?;

        let certificate = self
            .store
            .certificate_for_key(&self.key)
            .await
            .map_err(signing_failure)?
            .ok_or_else(|| {
                Error::Signing(format!("no certificate for signing key `{}`", self.key))
            })?;

        let signed = SignedDocument {
            document_id: Uuid::new_v4(),
            document_type: document_type.to_string(),
            canonical_content,
            signature,
            certificate_thumbprint: certificate.thumbprint.clone(),
            signed_at: Utc::now(),
            signer_identity: self.signer_identity.clone(),
            hash_algorithm: HashAlgorithm::Sha256,
            signature_algorithm: self.store.signature_algorithm(),
        };

        info!(
            document_id = %signed.document_id,
            document_type = %signed.document_type,
            key = %self.key,
            thumbprint = %certificate.thumbprint_hex(),
            "document signed"
        );
        Ok(signed)
    }

    /// Verify a signed document. Rejection — unknown certificate, expired
    /// or disabled certificate, signature mismatch — is a negative
    /// [`VerifyOutcome`], never an `Err`; errors surface only when the
    /// store itself cannot be consulted.
    pub async fn verify(&self, document: &SignedDocument) -> Result<VerifyOutcome> {
        let digest = match document.hash_algorithm {
            HashAlgorithm::Sha256 => content_digest(&document.canonical_content),
        };

        let certificate = match self
            .store
            .find_certificate(&document.certificate_thumbprint)
            .await?
        {
            Some(certificate) => certificate,
            None => {
                warn!(
                    document_id = %document.document_id,
                    "verification rejected: certificate not found"
                );
                return Ok(VerifyOutcome::reject(VerifyReason::CertificateNotFound));
            }
        };

        // Lifecycle is a precondition: an expired or disabled certificate
        // rejects the document even when the raw crypto would pass.
        if let Some(reason) = lifecycle_rejection(&certificate) {
            warn!(
                document_id = %document.document_id,
                thumbprint = %certificate.thumbprint_hex(),
                reason = reason.describe(),
                "verification rejected"
            );
            return Ok(VerifyOutcome::reject(reason));
        }

        let matches = self
            .store
            .verify(&certificate.key, &digest, &document.signature)
            .await?;
        if matches {
            Ok(VerifyOutcome::pass())
        } else {
            Ok(VerifyOutcome::reject(VerifyReason::SignatureMismatch))
        }
    }

    /// Verification plus human-readable diagnostics for audit or display.
    /// Callers must branch on [`VerifyOutcome::valid`] (surfaced here as
    /// `valid`), not on the problem list being empty.
    pub async fn signature_info(&self, document: &SignedDocument) -> Result<SignatureReport> {
        let outcome = self.verify(document).await?;
        let certificate = self
            .store
            .find_certificate(&document.certificate_thumbprint)
            .await?;

        let mut problems = Vec::new();
        if let Some(reason) = outcome.reason {
            problems.push(reason.describe().to_string());
        }
        if let Some(certificate) = &certificate {
            if !certificate.enabled {
                let note = VerifyReason::CertificateDisabled.describe().to_string();
                if !problems.contains(&note) {
                    problems.push(note);
                }
            }
            if certificate.expires_at <= Utc::now() {
                let note = VerifyReason::CertificateExpired.describe().to_string();
                if !problems.contains(&note) {
                    problems.push(note);
                }
            }
        }

        Ok(SignatureReport {
            valid: outcome.valid,
            signer_identity: document.signer_identity.clone(),
            certificate_thumbprint: crate::types::hex_string(&document.certificate_thumbprint),
            certificate_expires_at: certificate.map(|certificate| certificate.expires_at),
            problems,
        })
    }
}

fn content_digest(canonical_content: &str) -> Vec<u8> {
    Sha256::digest(canonical_content.as_bytes()).to_vec()
}

fn signing_failure(err: Error) -> Error {
    match err {
        already @ Error::Signing(_) => already,
        other => Error::Signing(other.to_string()),
    }
}

fn lifecycle_rejection(certificate: &CertificateInfo) -> Option<VerifyReason> {
    if !certificate.enabled {
        return Some(VerifyReason::CertificateDisabled);
    }
    if certificate.expires_at <= Utc::now() {
        return Some(VerifyReason::CertificateExpired);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryVault;
    use serde_json::json;
    use std::sync::Arc;

    fn rt() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
    }

    fn signer(vault: &Arc<MemoryVault>) -> DocumentSigner<Arc<MemoryVault>> {
        DocumentSigner::new(
            Arc::clone(vault),
            KeyReference::new("orders-signing").unwrap(),
            "orders-service",
        )
        .unwrap()
    }

    #[test]
    fn empty_document_type_is_rejected() {
        rt().block_on(async {
            let vault = Arc::new(MemoryVault::new());
            let err = signer(&vault)
                .sign(&json!({"a": 1}), "")
                .await
                .unwrap_err();
            assert!(matches!(err, Error::EmptyComponent { .. }));
        });
    }

    #[test]
    fn sign_records_algorithms_and_identity() {
        rt().block_on(async {
            let vault = Arc::new(MemoryVault::new());
            let signed = signer(&vault)
                .sign(&json!({"total": 10}), "invoice")
                .await
                .unwrap();

            assert_eq!(signed.document_type, "invoice");
            assert_eq!(signed.signer_identity, "orders-service");
            assert_eq!(signed.hash_algorithm, HashAlgorithm::Sha256);
            assert_eq!(
                signed.signature_algorithm,
                vault.signature_algorithm()
            );
            assert_eq!(signed.canonical_content, r#"{"total":10}"#);
        });
    }

    #[test]
    fn verify_is_reordering_insensitive() {
        rt().block_on(async {
            let vault = Arc::new(MemoryVault::new());
            let signer = signer(&vault);

            // Sign one logical document, verify canonical bytes derived
            // from differently ordered declarations.
            let signed = signer
                .sign(&json!({"b": 2, "a": 1}), "report")
                .await
                .unwrap();
            let reordered = signer
                .sign(&json!({"a": 1, "b": 2}), "report")
                .await
                .unwrap();
            assert_eq!(signed.canonical_content, reordered.canonical_content);
            assert!(signer.verify(&signed).await.unwrap().valid);
        });
    }
}
