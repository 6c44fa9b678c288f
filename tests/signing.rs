use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use vaultkit::{
    DocumentSigner, Error, KeyReference, MemoryVault, SignedDocument, VerifyReason,
};

#[derive(Serialize)]
struct Invoice {
    number: String,
    customer: String,
    total_cents: i64,
}

fn sample_invoice() -> Invoice {
    Invoice {
        number: "INV-2026-0042".into(),
        customer: "acme".into(),
        total_cents: 129_900,
    }
}

fn signer_for(vault: &Arc<MemoryVault>) -> DocumentSigner<Arc<MemoryVault>> {
    DocumentSigner::new(
        Arc::clone(vault),
        KeyReference::new("invoice-signing").unwrap(),
        "billing-service",
    )
    .unwrap()
}

#[tokio::test]
async fn freshly_signed_document_verifies() {
    let vault = Arc::new(MemoryVault::new());
    let signer = signer_for(&vault);

    let signed = signer.sign(&sample_invoice(), "invoice").await.unwrap();
    let outcome = signer.verify(&signed).await.unwrap();
    assert!(outcome.valid);
    assert_eq!(outcome.reason, None);
}

#[tokio::test]
async fn tampered_content_is_rejected() {
    let vault = Arc::new(MemoryVault::new());
    let signer = signer_for(&vault);

    let mut signed = signer.sign(&sample_invoice(), "invoice").await.unwrap();
    signed.canonical_content = signed.canonical_content.replace("129900", "129  0");

    let outcome = signer.verify(&signed).await.unwrap();
    assert!(!outcome.valid);
    assert_eq!(outcome.reason, Some(VerifyReason::SignatureMismatch));
}

#[tokio::test]
async fn tampered_signature_bytes_are_rejected() {
    let vault = Arc::new(MemoryVault::new());
    let signer = signer_for(&vault);

    let mut signed = signer.sign(&sample_invoice(), "invoice").await.unwrap();
    signed.signature[0] ^= 0xFF;

    let outcome = signer.verify(&signed).await.unwrap();
    assert!(!outcome.valid);
    assert_eq!(outcome.reason, Some(VerifyReason::SignatureMismatch));
}

#[tokio::test]
async fn expired_certificate_rejects_even_valid_crypto() {
    let vault = Arc::new(MemoryVault::new());
    let signer = signer_for(&vault);
    let key = KeyReference::new("invoice-signing").unwrap();

    let signed = signer.sign(&sample_invoice(), "invoice").await.unwrap();
    vault.expire_certificate(&key);

    let outcome = signer.verify(&signed).await.unwrap();
    assert!(!outcome.valid);
    assert_eq!(outcome.reason, Some(VerifyReason::CertificateExpired));
}

#[tokio::test]
async fn disabled_certificate_rejects_even_valid_crypto() {
    let vault = Arc::new(MemoryVault::new());
    let signer = signer_for(&vault);
    let key = KeyReference::new("invoice-signing").unwrap();

    let signed = signer.sign(&sample_invoice(), "invoice").await.unwrap();
    vault.disable_certificate(&key);

    let outcome = signer.verify(&signed).await.unwrap();
    assert!(!outcome.valid);
    assert_eq!(outcome.reason, Some(VerifyReason::CertificateDisabled));
}

#[tokio::test]
async fn unknown_certificate_is_a_rejection_not_an_error() {
    let vault = Arc::new(MemoryVault::new());
    let other_vault = Arc::new(MemoryVault::new());

    let signed = signer_for(&other_vault)
        .sign(&sample_invoice(), "invoice")
        .await
        .unwrap();

    let outcome = signer_for(&vault).verify(&signed).await.unwrap();
    assert!(!outcome.valid);
    assert_eq!(outcome.reason, Some(VerifyReason::CertificateNotFound));
}

#[tokio::test]
async fn rotation_keeps_previously_signed_documents_valid() {
    let vault = Arc::new(MemoryVault::new());
    let signer = signer_for(&vault);
    let key = KeyReference::new("invoice-signing").unwrap();

    let old_doc = signer.sign(&sample_invoice(), "invoice").await.unwrap();
    vault.rotate_key(&key).unwrap();
    let new_doc = signer.sign(&sample_invoice(), "invoice").await.unwrap();

    assert_ne!(old_doc.certificate_thumbprint, new_doc.certificate_thumbprint);
    assert!(signer.verify(&old_doc).await.unwrap().valid);
    assert!(signer.verify(&new_doc).await.unwrap().valid);
}

#[tokio::test]
async fn signed_document_survives_json_transport() {
    let vault = Arc::new(MemoryVault::new());
    let signer = signer_for(&vault);

    let signed = signer.sign(&sample_invoice(), "invoice").await.unwrap();
    let wire = serde_json::to_string(&signed).unwrap();
    let received: SignedDocument = serde_json::from_str(&wire).unwrap();

    assert_eq!(received, signed);
    assert!(signer.verify(&received).await.unwrap().valid);
}

#[tokio::test]
async fn signature_info_reports_problems_for_audit() {
    let vault = Arc::new(MemoryVault::new());
    let signer = signer_for(&vault);
    let key = KeyReference::new("invoice-signing").unwrap();

    let signed = signer.sign(&sample_invoice(), "invoice").await.unwrap();

    let clean = signer.signature_info(&signed).await.unwrap();
    assert!(clean.valid);
    assert!(clean.problems.is_empty());
    assert_eq!(clean.signer_identity, "billing-service");
    assert!(clean.certificate_expires_at.is_some());
    assert!(!clean.certificate_thumbprint.is_empty());

    vault.disable_certificate(&key);
    let flagged = signer.signature_info(&signed).await.unwrap();
    assert!(!flagged.valid);
    assert_eq!(
        flagged.problems,
        vec!["signing certificate is disabled".to_string()]
    );
}

#[tokio::test]
async fn sign_failure_produces_no_partial_artifact() {
    let vault = Arc::new(MemoryVault::new());
    let signer = signer_for(&vault);

    let err = signer.sign(&json!({"x": 1}), "   ").await.unwrap_err();
    assert!(matches!(err, Error::EmptyComponent { .. }));
}
