//! In-process [`SecretStore`] with real cryptography.
//!
//! `MemoryVault` backs tests, examples, and local development. Purposes map
//! to AES-256-GCM keys derived from a random master key with HKDF-SHA256,
//! so two purposes never share material and a cross-purpose decrypt fails
//! authentication instead of yielding plausible garbage. Signing keys are
//! Ed25519 pairs created on first use; each generation of a key carries its
//! own certificate, and rotated-out generations stay resolvable by
//! thumbprint so old documents keep verifying.

use crate::errors::{CryptoError, Error, Result};
use crate::store::{DeleteOperation, SecretStore};
use crate::types::{CertificateInfo, KeyReference, SecretListing, SignatureAlgorithm};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use hkdf::Hkdf;
use rand::RngCore;
use ring::aead;
use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair, UnparsedPublicKey, ED25519};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const CERT_LIFETIME_DAYS: i64 = 365;

#[derive(Clone)]
struct SecretState {
    value: String,
    enabled: bool,
}

struct KeyGeneration {
    pkcs8: Vec<u8>,
    public: Vec<u8>,
    certificate: CertificateInfo,
}

#[derive(Default)]
struct VaultState {
    secrets: HashMap<String, SecretState>,
    pending_deletes: HashMap<u64, String>,
    keys: HashMap<String, Vec<KeyGeneration>>,
}

/// In-memory vault holding secrets, purpose-scoped encryption keys, and
/// versioned signing keys with certificates.
pub struct MemoryVault {
    master_key: [u8; 32],
    state: Mutex<VaultState>,
    delete_tokens: AtomicU64,
}

impl Default for MemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVault {
    /// Construct a vault with a fresh random master key.
    pub fn new() -> Self {
        let mut master_key = [0u8; 32];
        rand::rng().fill_bytes(&mut master_key);
        Self {
            master_key,
            state: Mutex::new(VaultState::default()),
            delete_tokens: AtomicU64::new(1),
        }
    }

    /// Construct a vault whose purpose keys derive deterministically from
    /// `material`. Two vaults built from the same material can decrypt each
    /// other's ciphertexts.
    pub fn from_material(material: &[u8]) -> Self {
        let digest = Sha256::digest(material);
        let mut master_key = [0u8; 32];
        master_key.copy_from_slice(&digest);
        Self {
            master_key,
            state: Mutex::new(VaultState::default()),
            delete_tokens: AtomicU64::new(1),
        }
    }

    /// Mark a stored secret as disabled; disabled secrets still resolve by
    /// name but are skipped by bulk enumeration.
    pub fn set_secret_enabled(&self, name: &str, enabled: bool) {
        let mut state = self.state.lock().unwrap();
        if let Some(secret) = state.secrets.get_mut(name) {
            secret.enabled = enabled;
        }
    }

    /// Disable the active certificate of a signing key.
    pub fn disable_certificate(&self, key: &KeyReference) {
        self.update_active_certificate(key, |cert| cert.enabled = false);
    }

    /// Push the active certificate of a signing key into the past.
    pub fn expire_certificate(&self, key: &KeyReference) {
        self.update_active_certificate(key, |cert| {
            cert.expires_at = Utc::now() - ChronoDuration::hours(1);
        });
    }

    /// Rotate a signing key: a new generation with a fresh pair and
    /// certificate becomes active, previous generations stay resolvable.
    pub fn rotate_key(&self, key: &KeyReference) -> Result<CertificateInfo> {
        let mut state = self.state.lock().unwrap();
        let generation = new_generation(key.name(), generation_count(&state, key.name()) + 1)?;
        let certificate = generation.certificate.clone();
        state
            .keys
            .entry(key.name().to_string())
            .or_default()
            .push(generation);
        Ok(certificate)
    }

    fn update_active_certificate(&self, key: &KeyReference, apply: impl FnOnce(&mut CertificateInfo)) {
        let mut state = self.state.lock().unwrap();
        if let Some(generations) = state.keys.get_mut(key.name()) {
            if let Some(active) = generations.last_mut() {
                apply(&mut active.certificate);
            }
        }
    }

    fn purpose_key(&self, purpose: &str) -> Result<aead::LessSafeKey> {
        let hkdf = Hkdf::<Sha256>::new(None, &self.master_key);
        let mut okm = [0u8; 32];
        hkdf.expand(purpose.as_bytes(), &mut okm)
            .map_err(|_| Error::Transient("purpose key derivation failed".into()))?;
        let key = aead::UnboundKey::new(&aead::AES_256_GCM, &okm)
            .map_err(|_| Error::Transient("invalid derived key".into()))?;
        Ok(aead::LessSafeKey::new(key))
    }
}

fn generation_count(state: &VaultState, name: &str) -> usize {
    state.keys.get(name).map(Vec::len).unwrap_or(0)
}

/// Create a signing key generation with its certificate. The certificate's
/// key reference is versioned (`name/{generation}`) so a signature stays
/// verifiable against the generation that produced it after rotation.
fn new_generation(name: &str, generation: usize) -> Result<KeyGeneration> {
    let rng = SystemRandom::new();
    let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng)
        .map_err(|_| Error::Transient("signing key generation failed".into()))?;
    let pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref())
        .map_err(|_| Error::Transient("generated signing key is unusable".into()))?;
    let public = pair.public_key().as_ref().to_vec();

    let mut hasher = Sha256::new();
    hasher.update(&public);
    hasher.update(generation.to_be_bytes());
    let thumbprint = hasher.finalize().to_vec();

    let certificate = CertificateInfo {
        thumbprint,
        expires_at: Utc::now() + ChronoDuration::days(CERT_LIFETIME_DAYS),
        enabled: true,
        key: KeyReference::new(format!("{name}/{generation}"))?,
    };

    Ok(KeyGeneration {
        pkcs8: pkcs8.as_ref().to_vec(),
        public,
        certificate,
    })
}

/// Split a possibly versioned key name into base name and generation.
fn split_versioned(name: &str) -> (&str, Option<usize>) {
    match name.rsplit_once('/') {
        Some((base, suffix)) => match suffix.parse::<usize>() {
            Ok(generation) => (base, Some(generation)),
            Err(_) => (name, None),
        },
        None => (name, None),
    }
}

fn resolve_generation<'a>(
    state: &'a mut VaultState,
    key: &KeyReference,
    create_missing: bool,
) -> Result<Option<&'a KeyGeneration>> {
    let (base, generation) = split_versioned(key.name());

    if !state.keys.contains_key(base) {
        if !create_missing {
            return Ok(None);
        }
        let first = new_generation(base, 1)?;
        state.keys.insert(base.to_string(), vec![first]);
    }

    let generations = match state.keys.get(base) {
        Some(generations) => generations,
        None => return Ok(None),
    };
    let picked = match generation {
        Some(index) if index >= 1 => generations.get(index - 1),
        Some(_) => None,
        None => generations.last(),
    };
    Ok(picked)
}

#[async_trait]
impl SecretStore for MemoryVault {
    async fn fetch_secret(&self, name: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state.secrets.get(name).map(|secret| secret.value.clone()))
    }

    async fn write_secret(&self, name: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.secrets.insert(
            name.to_string(),
            SecretState {
                value: value.to_string(),
                enabled: true,
            },
        );
        Ok(())
    }

    async fn begin_delete_secret(&self, name: &str) -> Result<DeleteOperation> {
        let mut state = self.state.lock().unwrap();
        if !state.secrets.contains_key(name) {
            return Err(Error::not_found(format!("secret `{name}`")));
        }
        let token = self.delete_tokens.fetch_add(1, Ordering::SeqCst);
        state.pending_deletes.insert(token, name.to_string());
        Ok(DeleteOperation {
            name: name.to_string(),
            token,
        })
    }

    async fn await_deletion(&self, operation: DeleteOperation) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let name = state
            .pending_deletes
            .remove(&operation.token)
            .ok_or_else(|| Error::not_found(format!("delete operation {}", operation.token)))?;
        state.secrets.remove(&name);
        Ok(())
    }

    async fn list_secrets(&self) -> Result<Vec<SecretListing>> {
        let state = self.state.lock().unwrap();
        let mut listings: Vec<SecretListing> = state
            .secrets
            .iter()
            .map(|(name, secret)| SecretListing {
                name: name.clone(),
                enabled: secret.enabled,
            })
            .collect();
        listings.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listings)
    }

    async fn encrypt(&self, purpose: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        let key = self.purpose_key(purpose)?;
        let rng = SystemRandom::new();
        let mut nonce = [0u8; NONCE_LEN];
        ring::rand::SecureRandom::fill(&rng, &mut nonce)
            .map_err(|_| Error::Transient("rng failure".into()))?;

        let mut in_out = plaintext.to_vec();
        in_out.reserve(TAG_LEN);
        key.seal_in_place_append_tag(
            aead::Nonce::assume_unique_for_key(nonce),
            aead::Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| Error::Transient("seal failed".into()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + in_out.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&in_out);
        Ok(out)
    }

    async fn decrypt(&self, purpose: &str, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Malformed("ciphertext too short".into()).into());
        }
        let key = self.purpose_key(purpose)?;
        let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
        let nonce = aead::Nonce::try_assume_unique_for_key(nonce)
            .map_err(|_| Error::from(CryptoError::Malformed("invalid nonce".into())))?;

        let mut buffer = sealed.to_vec();
        let plaintext = key
            .open_in_place(nonce, aead::Aad::empty(), &mut buffer)
            .map_err(|_| Error::from(CryptoError::MacMismatch))?;
        Ok(plaintext.to_vec())
    }

    async fn sign(&self, key: &KeyReference, digest: &[u8]) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        let generation = resolve_generation(&mut state, key, true)?
            .ok_or_else(|| Error::not_found(format!("signing key `{key}`")))?;
        let pair = Ed25519KeyPair::from_pkcs8(&generation.pkcs8)
            .map_err(|_| Error::Transient("stored signing key is unusable".into()))?;
        Ok(pair.sign(digest).as_ref().to_vec())
    }

    async fn verify(&self, key: &KeyReference, digest: &[u8], signature: &[u8]) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let generation = match resolve_generation(&mut state, key, false)? {
            Some(generation) => generation,
            None => return Err(Error::not_found(format!("signing key `{key}`"))),
        };
        let public = UnparsedPublicKey::new(&ED25519, &generation.public);
        Ok(public.verify(digest, signature).is_ok())
    }

    async fn certificate_for_key(&self, key: &KeyReference) -> Result<Option<CertificateInfo>> {
        let mut state = self.state.lock().unwrap();
        Ok(resolve_generation(&mut state, key, false)?
            .map(|generation| generation.certificate.clone()))
    }

    async fn find_certificate(&self, thumbprint: &[u8]) -> Result<Option<CertificateInfo>> {
        let state = self.state.lock().unwrap();
        for generations in state.keys.values() {
            for generation in generations {
                if generation.certificate.thumbprint == thumbprint {
                    return Ok(Some(generation.certificate.clone()));
                }
            }
        }
        Ok(None)
    }

    fn signature_algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Ed25519
    }
}
