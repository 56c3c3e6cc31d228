//! # Cryptography Module
//!
//! Cryptographic primitives for the signing core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 ENVELOPE PROTECTION                             │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  Node password                                                  │   │
//! │  │        │                                                        │   │
//! │  │        ▼                                                        │   │
//! │  │  PBKDF2-HMAC-SHA256 (500 000 rounds, per-envelope salt)        │   │
//! │  │        │                                                        │   │
//! │  │        ▼                                                        │   │
//! │  │  AES-256-GCM envelope  ──► decrypted signing key (in memory    │   │
//! │  │  (4 older generations       only, zeroized on drop)            │   │
//! │  │   stay decryptable)                                            │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 OPERATION SIGNING                               │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  RSA-PSS (SHA-256, 32-byte salt)  - password-recovered keys    │   │
//! │  │  secp256k1 ECDSA (SHA-256, DER)   - master-seed derived keys   │   │
//! │  │  delegated capability             - remote signer, no local    │   │
//! │  │                                     key bytes                  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices & Rationale
//!
//! | Algorithm | Purpose | Why Chosen |
//! |-----------|---------|------------|
//! | PBKDF2-HMAC-SHA256 | Password stretching | Matches every envelope generation on the wire |
//! | AES-256-GCM | Envelope encryption | AEAD, integrity comes with the ciphertext |
//! | AES-256-CBC | Legacy envelopes | Read-only compatibility with old clients |
//! | RSA-PSS | Operation signatures | Server-side verification contract |
//! | secp256k1 ECDSA | Wallet signing mode | Lightning-native curve |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: derived material and plaintext keys are zeroized on drop
//! 2. **Opaque failures**: decryption faults collapse into one error kind
//! 3. **Secure Random**: salts and nonces come from `rand::rngs::OsRng`
//! 4. **Injected provider**: randomness/clock are constructor dependencies, not globals

mod envelope;
mod kdf;
mod provider;
mod signing_key;

pub use envelope::{
    EncryptedSecret, EnvelopeCipher, EnvelopeHeader, CURRENT_SALT_LEN, CURRENT_VERSION,
    LEGACY_CIPHER_SENTINEL,
};
pub use kdf::{derive, DerivedKeyMaterial, CURRENT_ITERATIONS, LEGACY_ITERATIONS};
pub use provider::{CryptoProvider, OsCryptoProvider};
pub use signing_key::{
    generate_signing_key_pair, GeneratedSigningKeyPair, SignerDelegate, SigningKeyHandle,
    PSS_SALT_LEN, RSA_KEY_BITS,
};

#[cfg(test)]
pub(crate) use signing_key::generate_signing_key_pair_with_bits;
