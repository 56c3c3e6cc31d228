//! # Signing Key Handles
//!
//! Opaque handles for node operation-signing keys.
//!
//! A handle never exposes raw private-key bytes: callers borrow it for the
//! duration of one signing operation and get back a detached signature.
//! Three key families exist, matching the node signing modes:
//!
//! | handle | algorithm | produced by |
//! |--------|-----------|-------------|
//! | `RsaPss` | RSA-PSS, SHA-256, 32-byte salt | password unlock (recovered envelope) |
//! | `Secp256k1` | ECDSA/SHA-256, DER signature | master-seed derivation |
//! | `Delegated` | whatever the delegate runs | remote signer, no local key bytes |

use std::sync::Arc;

use async_trait::async_trait;
use k256::ecdsa;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use rsa::pss::Pss;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Modulus size for newly generated RSA operation signing keys
pub const RSA_KEY_BITS: usize = 4096;

/// PSS salt length used for operation signatures
pub const PSS_SALT_LEN: usize = 32;

/// Leading byte of a DER-encoded private-key stream (ASN.1 SEQUENCE)
const DER_SEQUENCE_TAG: u8 = 0x30;

/// External signer capability for the delegated signing mode
///
/// The delegate holds the key; this crate only forwards the exact bytes to
/// sign and returns the detached signature it gets back.
#[async_trait]
pub trait SignerDelegate: Send + Sync {
    /// Produce a detached signature over `message` with the node's key
    async fn sign(&self, node_id: &str, message: &[u8]) -> Result<Vec<u8>>;
}

/// An opaque, non-exportable signing key
///
/// Owned by the node key cache once inserted. No method returns private-key
/// bytes; replacing a node's handle invalidates the old one.
#[derive(Clone)]
pub enum SigningKeyHandle {
    /// RSA-PSS operation signing key
    RsaPss(RsaPrivateKey),
    /// secp256k1 ECDSA signing key (wallet signing mode)
    Secp256k1(ecdsa::SigningKey),
    /// Capability reference understood by an external signer
    Delegated(Arc<dyn SignerDelegate>),
}

impl std::fmt::Debug for SigningKeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material must never reach logs; only the family is printed.
        let kind = match self {
            SigningKeyHandle::RsaPss(_) => "RsaPss",
            SigningKeyHandle::Secp256k1(_) => "Secp256k1",
            SigningKeyHandle::Delegated(_) => "Delegated",
        };
        f.debug_tuple("SigningKeyHandle").field(&kind).finish()
    }
}

impl SigningKeyHandle {
    /// Wrap decrypted envelope plaintext into an RSA handle
    ///
    /// A DER private-key stream starts with the ASN.1 SEQUENCE tag;
    /// anything else is treated as textual (PEM) key material.
    pub fn from_decrypted_material(material: &[u8]) -> Result<Self> {
        if material.first() == Some(&DER_SEQUENCE_TAG) {
            let key = RsaPrivateKey::from_pkcs8_der(material)
                .map_err(|e| Error::InvalidKey(format!("unreadable DER private key: {e}")))?;
            return Ok(Self::RsaPss(key));
        }

        let pem = std::str::from_utf8(material)
            .map_err(|_| Error::InvalidKey("key material is neither DER nor text".into()))?;
        Self::from_pem(pem)
    }

    /// Parse a PEM private key (PKCS#8 or PKCS#1)
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| Error::InvalidKey(format!("unreadable PEM private key: {e}")))?;
        Ok(Self::RsaPss(key))
    }

    /// Wrap a raw 32-byte secp256k1 secret
    pub fn from_secp256k1_bytes(bytes: &[u8]) -> Result<Self> {
        let key = ecdsa::SigningKey::from_slice(bytes)
            .map_err(|e| Error::InvalidKey(format!("invalid secp256k1 secret: {e}")))?;
        Ok(Self::Secp256k1(key))
    }

    /// Wrap an external signer capability
    pub fn delegated(delegate: Arc<dyn SignerDelegate>) -> Self {
        Self::Delegated(delegate)
    }

    /// Produce a detached signature over `message`
    ///
    /// Local asymmetric signing runs on the blocking pool. The signature
    /// scheme follows the handle family; callers never branch on it.
    pub async fn sign(&self, node_id: &str, message: &[u8]) -> Result<Vec<u8>> {
        match self {
            SigningKeyHandle::RsaPss(key) => {
                let key = key.clone();
                let message = message.to_vec();
                tokio::task::spawn_blocking(move || sign_rsa_pss(&key, &message))
                    .await
                    .map_err(|e| Error::Internal(format!("signing task failed: {e}")))?
            }
            SigningKeyHandle::Secp256k1(key) => {
                let key = key.clone();
                let message = message.to_vec();
                tokio::task::spawn_blocking(move || sign_secp256k1(&key, &message))
                    .await
                    .map_err(|e| Error::Internal(format!("signing task failed: {e}")))?
            }
            SigningKeyHandle::Delegated(delegate) => delegate.sign(node_id, message).await,
        }
    }
}

fn sign_rsa_pss(key: &RsaPrivateKey, message: &[u8]) -> Result<Vec<u8>> {
    let digest = Sha256::digest(message);
    key.sign_with_rng(
        &mut rand::rngs::OsRng,
        Pss::new_with_salt::<Sha256>(PSS_SALT_LEN),
        &digest,
    )
    .map_err(|e| Error::SigningFailed(format!("RSA-PSS signing failed: {e}")))
}

fn sign_secp256k1(key: &ecdsa::SigningKey, message: &[u8]) -> Result<Vec<u8>> {
    use k256::ecdsa::signature::Signer;

    let signature: ecdsa::Signature = key.sign(message);
    Ok(signature.to_der().as_bytes().to_vec())
}

// ============================================================================
// KEY PAIR GENERATION
// ============================================================================

/// A freshly generated operation signing key pair
///
/// The serialized private key exists only so the caller can escrow it
/// (encrypted) with the key-recovery service; it is zeroized on drop.
pub struct GeneratedSigningKeyPair {
    /// Handle ready for the node key cache
    pub handle: SigningKeyHandle,
    /// PKCS#8 DER encoding of the private key
    pub private_key_pkcs8_der: Zeroizing<Vec<u8>>,
    /// SPKI DER encoding of the public key
    pub public_key_spki_der: Vec<u8>,
}

/// Generate a new RSA-PSS operation signing key pair
///
/// Key generation is slow (minutes-scale worst case for 4096-bit keys on
/// debug builds); it always runs on the blocking pool.
pub async fn generate_signing_key_pair() -> Result<GeneratedSigningKeyPair> {
    generate_signing_key_pair_with_bits(RSA_KEY_BITS).await
}

pub(crate) async fn generate_signing_key_pair_with_bits(
    bits: usize,
) -> Result<GeneratedSigningKeyPair> {
    tokio::task::spawn_blocking(move || {
        let key = RsaPrivateKey::new(&mut rand::rngs::OsRng, bits)
            .map_err(|e| Error::SigningFailed(format!("RSA key generation failed: {e}")))?;

        let private_key_pkcs8_der = Zeroizing::new(
            key.to_pkcs8_der()
                .map_err(|e| Error::InvalidKey(format!("PKCS#8 serialization failed: {e}")))?
                .as_bytes()
                .to_vec(),
        );
        let public_key_spki_der = RsaPublicKey::from(&key)
            .to_public_key_der()
            .map_err(|e| Error::InvalidKey(format!("SPKI serialization failed: {e}")))?
            .as_bytes()
            .to_vec();

        Ok(GeneratedSigningKeyPair {
            handle: SigningKeyHandle::RsaPss(key),
            private_key_pkcs8_der,
            public_key_spki_der,
        })
    })
    .await
    .map_err(|e| Error::Internal(format!("key generation task failed: {e}")))?
}

// ============================================================================
// TESTS
// ============================================================================
