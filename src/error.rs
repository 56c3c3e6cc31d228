//! # Error Handling
//!
//! This module provides the error types for the signing core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Envelope Errors                                                   │
//! │  │   ├── DecryptionFailed        - Wrong password or corrupt envelope  │
//! │  │   ├── UnsupportedFormatVersion- Header version outside known table  │
//! │  │   ├── EncryptionFailed        - Encrypt-side cipher fault           │
//! │  │   └── KeyDerivationFailed     - PBKDF2 / hierarchical derivation    │
//! │  │                                                                      │
//! │  ├── Key Errors                                                        │
//! │  │   ├── InvalidKey              - Unparseable key material            │
//! │  │   ├── SigningKeyUnavailable   - Cache miss at sign time             │
//! │  │   ├── SigningKeyLoaderMissing - No loader registered for the node   │
//! │  │   └── SigningFailed           - Signature primitive fault           │
//! │  │                                                                      │
//! │  ├── Request Errors                                                    │
//! │  │   └── InvalidOperation        - Malformed / unsignable operation    │
//! │  │                                                                      │
//! │  ├── Webhook Errors                                                    │
//! │  │   ├── SignatureVerificationFailed - HMAC digest mismatch            │
//! │  │   ├── WebhookParseFailed      - Event body is not valid JSON        │
//! │  │   └── RemoteSigningFailed     - Remote-signing handshake fault      │
//! │  │                                                                      │
//! │  └── Internal Errors                                                   │
//! │      ├── Serialization           - JSON encode/decode fault            │
//! │      └── Internal                - Should not happen in normal use     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decryption faults are deliberately collapsed into the single
//! [`Error::DecryptionFailed`] variant: bad padding, authentication-tag
//! mismatch, and wrong password are indistinguishable to the caller, so the
//! error cannot be used as a padding or format oracle. No variant ever
//! carries password, derived-key, or plaintext material.

use thiserror::Error;

/// Result type alias for signing-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the signing core
///
/// All errors are categorized by module/domain to make error handling
/// clearer and to provide meaningful error messages to users.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Envelope Errors
    // ========================================================================

    /// Decryption failed. Wrong password, corrupt ciphertext, and tag
    /// mismatch all map here with no further detail.
    #[error("Unable to decrypt signing key: incorrect password or corrupted key.")]
    DecryptionFailed,

    /// Header version outside the known format table
    #[error("Unsupported encrypted key format version {0}.")]
    UnsupportedFormatVersion(i64),

    /// Encryption operation failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Key derivation failed
    #[error("Failed to derive keys: {0}")]
    KeyDerivationFailed(String),

    // ========================================================================
    // Key Errors
    // ========================================================================

    /// Invalid key format or length
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// No signing key is loaded for the node
    #[error("No signing key loaded for node {0}. Unlock the node before signing.")]
    SigningKeyUnavailable(String),

    /// No signing key loader has been registered for the node
    #[error("No signing key loader found for node {0}.")]
    SigningKeyLoaderMissing(String),

    /// Signing failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    // ========================================================================
    // Request Errors
    // ========================================================================

    /// Malformed or unsignable GraphQL operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    // ========================================================================
    // Webhook Errors
    // ========================================================================

    /// Webhook HMAC digest does not match the raw body
    #[error("Webhook message hash does not match signature")]
    SignatureVerificationFailed,

    /// Webhook body failed to parse after a successful verification
    #[error("Failed to parse webhook event: {0}")]
    WebhookParseFailed(String),

    /// Remote-signing handshake fault
    #[error("Remote signing failed: {0}")]
    RemoteSigningFailed(String),

    // ========================================================================
    // Internal Errors
    // ========================================================================

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if this error is resolved by unlocking the node's signing key
    ///
    /// Callers should re-prompt for a password (or re-run their key loader)
    /// and retry; nothing is retried internally.
    pub fn requires_unlock(&self) -> bool {
        matches!(
            self,
            Error::SigningKeyUnavailable(_) | Error::SigningKeyLoaderMissing(_)
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_unlock() {
        assert!(Error::SigningKeyUnavailable("node-1".into()).requires_unlock());
        assert!(Error::SigningKeyLoaderMissing("node-1".into()).requires_unlock());
        assert!(!Error::DecryptionFailed.requires_unlock());
        assert!(!Error::SignatureVerificationFailed.requires_unlock());
    }

    #[test]
    fn test_decryption_failure_carries_no_detail() {
        // The user-visible message never says which cipher stage failed.
        let msg = Error::DecryptionFailed.to_string();
        assert!(msg.contains("incorrect password or corrupted key"));
        assert!(!msg.contains("tag"));
        assert!(!msg.contains("padding"));
    }

    #[test]
    fn test_unsupported_version_names_the_version() {
        let msg = Error::UnsupportedFormatVersion(7).to_string();
        assert!(msg.contains('7'));
    }
}
