//! # Signing Key Loaders
//!
//! Unlock strategies that produce a [`SigningKeyHandle`] for a node.
//!
//! ## Loader Strategies
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      KEY LOADER STRATEGIES                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  NodeIdAndPassword                                                     │
//! │  ──────────────────                                                     │
//! │  key-recovery service ──► EncryptedSecret ──► EnvelopeCipher.decrypt   │
//! │  ──► DER/PEM sniff ──► RSA-PSS handle                                  │
//! │                                                                         │
//! │  MasterSeed                                                            │
//! │  ──────────                                                             │
//! │  caller-supplied seed ──► BIP32 derive at m/5 ──► secp256k1 handle     │
//! │  (never touches the envelope cipher)                                   │
//! │                                                                         │
//! │  Delegated                                                             │
//! │  ─────────                                                              │
//! │  external signer capability ──► handle with no local key bytes         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The three strategies are one tagged enum dispatched explicitly; all of
//! them satisfy the same cache contract once loaded.

use std::sync::Arc;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::crypto::{EncryptedSecret, EnvelopeCipher, SignerDelegate, SigningKeyHandle};
use crate::error::{Error, Result};
use crate::keys::derivation;

/// Fixed hierarchical path of node operation signing keys
pub const SIGNING_KEY_PATH: &str = "m/5";

/// Bitcoin network a master-seed key is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitcoinNetwork {
    /// Production network
    Mainnet,
    /// Public test network
    Testnet,
    /// Local regression-test network
    Regtest,
}

impl std::fmt::Display for BitcoinNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BitcoinNetwork::Mainnet => "MAINNET",
            BitcoinNetwork::Testnet => "TESTNET",
            BitcoinNetwork::Regtest => "REGTEST",
        };
        f.write_str(name)
    }
}

/// External source of encrypted signing keys
///
/// The key-recovery collaborator; typically backed by the API client. Only
/// its output contract matters here.
#[async_trait]
pub trait EncryptedKeySource: Send + Sync {
    /// Fetch the encrypted signing key for a node, if one exists
    async fn recover_signing_key(&self, node_id: &str) -> Result<Option<EncryptedSecret>>;
}

/// A strategy for producing a node's signing key handle
pub enum KeyLoader {
    /// Recover the RSA envelope from the key-recovery service and unlock it
    /// with the node password
    NodeIdAndPassword {
        /// Node whose key is recovered
        node_id: String,
        /// Unlock password
        password: Zeroizing<String>,
        /// Key-recovery collaborator
        source: Arc<dyn EncryptedKeySource>,
        /// Cipher used for the unlock
        cipher: EnvelopeCipher,
    },
    /// Derive a secp256k1 key from a caller-supplied master seed
    MasterSeed {
        /// Master seed bytes (128-512 bits)
        seed: Zeroizing<Vec<u8>>,
        /// Network the derived key is scoped to
        network: BitcoinNetwork,
    },
    /// Forward all signing to an external capability
    Delegated {
        /// The external signer
        delegate: Arc<dyn SignerDelegate>,
    },
}

impl KeyLoader {
    /// Build a password loader
    pub fn node_id_and_password(
        node_id: impl Into<String>,
        password: impl Into<String>,
        source: Arc<dyn EncryptedKeySource>,
        cipher: EnvelopeCipher,
    ) -> Self {
        Self::NodeIdAndPassword {
            node_id: node_id.into(),
            password: Zeroizing::new(password.into()),
            source,
            cipher,
        }
    }

    /// Build a master-seed loader from raw seed bytes
    pub fn master_seed(seed: Vec<u8>, network: BitcoinNetwork) -> Self {
        Self::MasterSeed {
            seed: Zeroizing::new(seed),
            network,
        }
    }

    /// Build a master-seed loader from a BIP39 recovery phrase
    pub fn master_seed_from_phrase(
        phrase: &str,
        passphrase: &str,
        network: BitcoinNetwork,
    ) -> Result<Self> {
        let mnemonic = bip39::Mnemonic::parse(phrase)
            .map_err(|e| Error::InvalidKey(format!("invalid recovery phrase: {e}")))?;
        let seed = Zeroizing::new(mnemonic.to_seed(passphrase).to_vec());
        Ok(Self::MasterSeed {
            seed,
            network,
        })
    }

    /// Build a delegated loader
    pub fn delegated(delegate: Arc<dyn SignerDelegate>) -> Self {
        Self::Delegated { delegate }
    }

    /// Load the signing key this strategy describes
    ///
    /// Returns `Ok(None)` when the recovery service has no key for the node
    /// (nothing to unlock); all other failures are errors.
    pub async fn load(&self) -> Result<Option<SigningKeyHandle>> {
        match self {
            KeyLoader::NodeIdAndPassword {
                node_id,
                password,
                source,
                cipher,
            } => {
                let Some(secret) = source.recover_signing_key(node_id).await? else {
                    tracing::warn!("No encrypted signing key found for node {}", node_id);
                    return Ok(None);
                };

                let material = cipher.decrypt_secret(&secret, password).await?;
                let handle = SigningKeyHandle::from_decrypted_material(&material)?;
                tracing::debug!("Unlocked signing key for node {}", node_id);
                Ok(Some(handle))
            }
            KeyLoader::MasterSeed { seed, network } => {
                let secret = derivation::derive_private_key(seed, SIGNING_KEY_PATH)?;
                let handle = SigningKeyHandle::from_secp256k1_bytes(&secret.to_bytes())?;
                tracing::debug!("Derived {} signing key at {}", network, SIGNING_KEY_PATH);
                Ok(Some(handle))
            }
            KeyLoader::Delegated { delegate } => {
                Ok(Some(SigningKeyHandle::delegated(delegate.clone())))
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
