//! Purpose-scoped encryption of single scalar values.
//!
//! A purpose string names the key material the store uses for the
//! transform, so one vault surface can serve many logically distinct
//! encrypted columns. Ciphertexts are opaque base64 strings safe for
//! persistence; plaintext is never cached here.

use crate::errors::{require_non_empty, CryptoError, Error, Result};
use crate::store::SecretStore;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rust_decimal::Decimal;

/// Encrypts and decrypts individual field values under a named purpose.
pub struct FieldCipher<S> {
    store: S,
}

impl<S> FieldCipher<S>
where
    S: SecretStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Encrypt a string value under `purpose`.
    pub async fn encrypt(&self, plaintext: &str, purpose: &str) -> Result<String> {
        require_non_empty(plaintext, "plaintext")?;
        require_non_empty(purpose, "purpose")?;

        let sealed = self.store.encrypt(purpose, plaintext.as_bytes()).await?;
        Ok(STANDARD.encode(sealed))
    }

    /// Decrypt a ciphertext produced by [`FieldCipher::encrypt`] under the
    /// same purpose. Fails closed: a ciphertext that is malformed or was
    /// produced under different key material is an error, never a
    /// best-guess value.
    pub async fn decrypt(&self, ciphertext: &str, purpose: &str) -> Result<String> {
        require_non_empty(ciphertext, "ciphertext")?;
        require_non_empty(purpose, "purpose")?;

        let sealed = STANDARD
            .decode(ciphertext)
            .map_err(|err| Error::from(CryptoError::Malformed(format!("base64: {err}"))))?;
        let opened = self.store.decrypt(purpose, &sealed).await?;
        String::from_utf8(opened)
            .map_err(|_| CryptoError::Decode("plaintext is not valid UTF-8".into()).into())
    }

    /// Encrypt a decimal through its fixed-precision textual encoding.
    pub async fn encrypt_decimal(&self, value: Decimal, purpose: &str) -> Result<String> {
        self.encrypt(&value.to_string(), purpose).await
    }

    /// Decrypt and parse a decimal. A decrypted value that does not parse
    /// is a [`CryptoError::Decode`], so persistence callers can report a
    /// bad row without aborting the surrounding query.
    pub async fn decrypt_decimal(&self, ciphertext: &str, purpose: &str) -> Result<Decimal> {
        let text = self.decrypt(ciphertext, purpose).await?;
        text.parse::<Decimal>()
            .map_err(|err| CryptoError::Decode(format!("not a decimal: {err}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryVault;

    fn rt() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
    }

    #[test]
    fn rejects_empty_inputs() {
        rt().block_on(async {
            let cipher = FieldCipher::new(MemoryVault::new());
            assert!(cipher.encrypt("", "card.v1").await.is_err());
            assert!(cipher.encrypt("value", "").await.is_err());
            assert!(cipher.decrypt("", "card.v1").await.is_err());
            assert!(cipher.decrypt("Zm9v", " ").await.is_err());
        });
    }

    #[test]
    fn garbage_ciphertext_fails_closed() {
        rt().block_on(async {
            let cipher = FieldCipher::new(MemoryVault::new());

            let err = cipher.decrypt("not!!base64", "card.v1").await.unwrap_err();
            assert!(matches!(err, Error::Crypto(CryptoError::Malformed(_))));

            // Valid base64, but not a ciphertext this purpose produced.
            let err = cipher.decrypt("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA", "card.v1")
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Crypto(_)));
        });
    }

    #[test]
    fn decimal_round_trip_preserves_scale() {
        rt().block_on(async {
            let cipher = FieldCipher::new(MemoryVault::new());
            let amount: Decimal = "1234.5600".parse().unwrap();

            let sealed = cipher.encrypt_decimal(amount, "ledger.amount").await.unwrap();
            let opened = cipher.decrypt_decimal(&sealed, "ledger.amount").await.unwrap();
            assert_eq!(opened, amount);
            assert_eq!(opened.to_string(), "1234.5600");
        });
    }

    #[test]
    fn legacy_non_decimal_row_reports_decode_failure() {
        rt().block_on(async {
            let cipher = FieldCipher::new(MemoryVault::new());
            let sealed = cipher.encrypt("not-a-number", "ledger.amount").await.unwrap();

            let err = cipher.decrypt_decimal(&sealed, "ledger.amount").await.unwrap_err();
            assert!(matches!(err, Error::Crypto(CryptoError::Decode(_))));
        });
    }
}
