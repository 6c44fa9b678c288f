//! Shared test doubles: an instrumented store wrapper in front of
//! `MemoryVault` that counts remote fetches and injects failures.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vaultkit::{
    CertificateInfo, DeleteOperation, Error, KeyReference, MemoryVault, Result, SecretListing,
    SecretStore, SignatureAlgorithm,
};

#[derive(Clone, Default)]
pub struct InstrumentedStore {
    inner: Arc<MemoryVault>,
    fetches: Arc<AtomicUsize>,
    fail_fetch_for: Arc<Mutex<HashSet<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InstrumentedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vault(&self) -> Arc<MemoryVault> {
        Arc::clone(&self.inner)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn fail_fetches_for(&self, name: &str) {
        self.fail_fetch_for.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SecretStore for InstrumentedStore {
    async fn fetch_secret(&self, name: &str) -> Result<Option<String>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch_for.lock().unwrap().contains(name) {
            return Err(Error::Transient(format!("injected fetch failure for {name}")));
        }
        self.inner.fetch_secret(name).await
    }

    async fn write_secret(&self, name: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Transient("injected write failure".into()));
        }
        self.inner.write_secret(name, value).await
    }

    async fn begin_delete_secret(&self, name: &str) -> Result<DeleteOperation> {
        self.inner.begin_delete_secret(name).await
    }

    async fn await_deletion(&self, operation: DeleteOperation) -> Result<()> {
        self.inner.await_deletion(operation).await
    }

    async fn list_secrets(&self) -> Result<Vec<SecretListing>> {
        self.inner.list_secrets().await
    }

    async fn encrypt(&self, purpose: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.inner.encrypt(purpose, plaintext).await
    }

    async fn decrypt(&self, purpose: &str, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.inner.decrypt(purpose, ciphertext).await
    }

    async fn sign(&self, key: &KeyReference, digest: &[u8]) -> Result<Vec<u8>> {
        self.inner.sign(key, digest).await
    }

    async fn verify(&self, key: &KeyReference, digest: &[u8], signature: &[u8]) -> Result<bool> {
        self.inner.verify(key, digest, signature).await
    }

    async fn certificate_for_key(&self, key: &KeyReference) -> Result<Option<CertificateInfo>> {
        self.inner.certificate_for_key(key).await
    }

    async fn find_certificate(&self, thumbprint: &[u8]) -> Result<Option<CertificateInfo>> {
        self.inner.find_certificate(thumbprint).await
    }

    fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.inner.signature_algorithm()
    }
}
