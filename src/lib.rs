//! Secret-backed cryptographic operations against a remote vault.
//!
//! Three components, bottom-up:
//!
//! - [`SecretCache`] — TTL-bounded cache in front of the remote secret
//!   store; owns freshness policy and store-error translation.
//! - [`FieldCipher`] — purpose-scoped encrypt/decrypt of single scalar
//!   values before persistence, with a [`blocking`] facade for
//!   synchronous value-converter call sites.
//! - [`DocumentSigner`] — canonicalizes a document, hashes it, signs the
//!   digest with a store-held key, and verifies signatures including
//!   certificate lifecycle checks.
//!
//! The remote store is reached through the narrow [`SecretStore`] trait;
//! [`MemoryVault`] implements it in-process with real cryptography for
//! tests and local development.

pub mod blocking;
pub mod cache;
pub mod canonical;
pub mod cipher;
pub mod errors;
pub mod memory;
pub mod signer;
pub mod store;
pub mod types;

pub use blocking::BlockingFieldCipher;
pub use cache::SecretCache;
pub use canonical::to_canonical_json;
pub use cipher::FieldCipher;
pub use errors::{CryptoError, Error, Result};
pub use memory::MemoryVault;
pub use signer::DocumentSigner;
pub use store::{DeleteOperation, SecretStore};
pub use types::{
    CertificateInfo, HashAlgorithm, KeyReference, SecretListing, SignatureAlgorithm,
    SignatureReport, SignedDocument, VerifyOutcome, VerifyReason,
};
