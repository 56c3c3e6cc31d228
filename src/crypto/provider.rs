//! # Crypto Provider
//!
//! Injected source of randomness and time for the cipher and signer.
//!
//! The envelope cipher and request signer take a provider at construction
//! instead of reaching for a process-global crypto engine. Production code
//! uses [`OsCryptoProvider`]; tests substitute a deterministic provider so
//! nonces, salts, and expiry timestamps are reproducible.

use chrono::{DateTime, Utc};
use rand::RngCore;

/// Source of cryptographic randomness and wall-clock time
///
/// Implementations must be safe to share across tasks.
pub trait CryptoProvider: Send + Sync {
    /// Fill `buf` with cryptographically secure random bytes
    fn fill_bytes(&self, buf: &mut [u8]);

    /// Generate a fresh random 32-bit request nonce
    fn next_nonce(&self) -> u32;

    /// Current time in UTC
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Default provider backed by the operating system CSPRNG and system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct OsCryptoProvider;

impl CryptoProvider for OsCryptoProvider {
    fn fill_bytes(&self, buf: &mut [u8]) {
        rand::rngs::OsRng.fill_bytes(buf);
    }

    fn next_nonce(&self) -> u32 {
        rand::rngs::OsRng.next_u32()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ============================================================================
// TESTS
// ============================================================================
