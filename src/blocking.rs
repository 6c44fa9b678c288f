//! Synchronous adapters for persistence-layer value converters.
//!
//! ORM value converters run on synchronous call paths; naively calling
//! `block_on` from inside an async runtime deadlocks the scheduler. The
//! facade here routes through `block_in_place` when a runtime is already
//! current and through a dedicated lazily built runtime otherwise.

use crate::cipher::FieldCipher;
use crate::errors::Result;
use crate::store::SecretStore;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use tokio::runtime::{self, Handle};

static RUNTIME: Lazy<runtime::Runtime> = Lazy::new(|| {
    runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(1)
        .thread_name("vaultkit-blocking")
        .build()
        .expect("build vaultkit blocking runtime")
});

/// Run a future to completion from synchronous code without nesting
/// runtimes.
pub fn sync_await<F>(fut: F) -> F::Output
where
    F: std::future::Future,
{
    if let Ok(handle) = Handle::try_current() {
        tokio::task::block_in_place(|| handle.block_on(fut))
    } else {
        RUNTIME.block_on(fut)
    }
}

/// Synchronous view of a [`FieldCipher`] for value-converter call sites.
pub struct BlockingFieldCipher<S> {
    inner: FieldCipher<S>,
}

impl<S> BlockingFieldCipher<S>
where
    S: SecretStore,
{
    pub fn new(store: S) -> Self {
        Self {
            inner: FieldCipher::new(store),
        }
    }

    pub fn encrypt(&self, plaintext: &str, purpose: &str) -> Result<String> {
        sync_await(self.inner.encrypt(plaintext, purpose))
    }

    pub fn decrypt(&self, ciphertext: &str, purpose: &str) -> Result<String> {
        sync_await(self.inner.decrypt(ciphertext, purpose))
    }

    pub fn encrypt_decimal(&self, value: Decimal, purpose: &str) -> Result<String> {
        sync_await(self.inner.encrypt_decimal(value, purpose))
    }

    pub fn decrypt_decimal(&self, ciphertext: &str, purpose: &str) -> Result<Decimal> {
        sync_await(self.inner.decrypt_decimal(ciphertext, purpose))
    }
}
