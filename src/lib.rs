//! # Lightspark Core
//!
//! Client-side cryptographic core for Lightspark Lightning-node SDKs:
//! protects node signing keys at rest, unlocks them on demand, signs
//! outgoing API operations, and authenticates inbound webhook events.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SIGNING CORE MODULES                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────┐   ┌──────────────┐   ┌───────────────────────────┐   │
//! │  │   Crypto     │   │     Keys     │   │         Signer            │   │
//! │  │              │   │              │   │                           │   │
//! │  │ - PBKDF2     │   │ - NodeKey    │   │ - SignedPayload           │   │
//! │  │ - Envelope   │──►│   Cache      │──►│ - nonce + expiry          │   │
//! │  │   cipher     │   │ - Loaders    │   │ - detached signature      │   │
//! │  │ - Key handles│   │   (password/ │   │   header                  │   │
//! │  │ - Provider   │   │    seed/     │   │                           │   │
//! │  │              │   │    delegate) │   │                           │   │
//! │  └──────────────┘   └──────────────┘   └───────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                        Webhooks                                 │   │
//! │  │                                                                 │   │
//! │  │  HMAC-SHA256 over raw bytes ──► typed event ──► remote-signing  │   │
//! │  │  (verify before parse)          handshake (validator+responder) │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Envelope cipher, key derivation, signing-key handles
//! - [`keys`] - Node key cache and unlock strategies
//! - [`signer`] - Request signing for node-scoped operations
//! - [`webhooks`] - Webhook verification and the remote-signing handshake
//!
//! ## Security Model
//!
//! Signing keys exist in memory only, behind opaque handles owned by the
//! key cache. Envelopes written by every historical client generation stay
//! decryptable; decryption failures are deliberately opaque so the error
//! channel cannot be used as a padding or format oracle. Passwords, derived
//! keys, and plaintext key material are never logged.
//!
//! The transport layer, GraphQL document builders, and UI sit outside this
//! crate and consume it only through [`signer::SignedRequest`],
//! [`webhooks::WebhookEvent`], and the loader/capability traits.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod crypto;
pub mod error;
pub mod keys;
pub mod signer;
pub mod webhooks;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use crypto::{
    generate_signing_key_pair, CryptoProvider, EncryptedSecret, EnvelopeCipher, OsCryptoProvider,
    SignerDelegate, SigningKeyHandle,
};
pub use error::{Error, Result};
pub use keys::{BitcoinNetwork, EncryptedKeySource, KeyLoader, KeyLoaderCache, NodeKeyCache};
pub use signer::{RequestSigner, SignatureHeader, SignedRequest, REQUEST_SIGNATURE_HEADER};
pub use webhooks::{verify_and_parse, WebhookEvent, WEBHOOKS_SIGNATURE_HEADER};

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    /// End-to-end: generate a key, escrow it in an envelope, unlock through
    /// the loader, sign a mutation, verify the signature with the public
    /// half.
    #[tokio::test]
    async fn test_unlock_then_sign_flow() {
        use async_trait::async_trait;
        use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
        use rsa::pkcs8::DecodePublicKey;
        use sha2::{Digest, Sha256};

        let provider: Arc<dyn CryptoProvider> = Arc::new(OsCryptoProvider);
        let cipher = EnvelopeCipher::new(provider.clone());

        // Server side: escrow a freshly generated key under the password.
        let pair = crypto::generate_signing_key_pair_with_bits(2048)
            .await
            .unwrap();
        let secret = cipher
            .encrypt(&pair.private_key_pkcs8_der, "1234!@#$", None)
            .await
            .unwrap();

        struct OneKeySource(EncryptedSecret);

        #[async_trait]
        impl EncryptedKeySource for OneKeySource {
            async fn recover_signing_key(
                &self,
                _node_id: &str,
            ) -> Result<Option<EncryptedSecret>> {
                Ok(Some(self.0.clone()))
            }
        }

        // Client side: unlock, then sign.
        let cache = Arc::new(NodeKeyCache::new());
        let loaders = KeyLoaderCache::new(cache.clone());
        loaders.set_loader(
            "node-1",
            KeyLoader::node_id_and_password(
                "node-1",
                "1234!@#$",
                Arc::new(OneKeySource(secret)),
                cipher,
            ),
        );
        loaders.unlock("node-1").await.unwrap().unwrap();

        let signer = RequestSigner::new(cache, provider);
        let signed = signer
            .sign(
                "node-1",
                "mutation PayInvoice($invoice: String!) { pay }",
                serde_json::Map::new(),
            )
            .await
            .unwrap();

        let public_key =
            rsa::RsaPublicKey::from_public_key_der(&pair.public_key_spki_der).unwrap();
        let signature = BASE64.decode(&signed.header.signature).unwrap();
        public_key
            .verify(
                rsa::pss::Pss::new_with_salt::<Sha256>(crypto::PSS_SALT_LEN),
                &Sha256::digest(&signed.body),
                &signature,
            )
            .expect("request signature must verify");
    }

    /// Signing without unlocking first reports the miss; nothing unlocks
    /// implicitly.
    #[tokio::test]
    async fn test_sign_before_unlock_fails() {
        let cache = Arc::new(NodeKeyCache::new());
        let signer = RequestSigner::new(cache, Arc::new(OsCryptoProvider));

        let err = signer
            .sign("node-1", "query GetNode { node }", serde_json::Map::new())
            .await
            .unwrap_err();
        assert!(err.requires_unlock());
    }
}
