//! # Key Derivation
//!
//! Password-based key stretching for the envelope cipher.
//!
//! ## Derivation Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    PBKDF2 OUTPUT LAYOUT                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  PBKDF2-HMAC-SHA256(password, salt, iterations) → bit_len bits         │
//! │                                                                         │
//! │  384-bit derivation (CBC generations, GCM generation 2):               │
//! │  ┌──────────────────────────────┬──────────────────────┐               │
//! │  │  AES-256 key (32 bytes)      │  IV (16 bytes)       │               │
//! │  └──────────────────────────────┴──────────────────────┘               │
//! │                                                                         │
//! │  352-bit derivation (current generation):                              │
//! │  ┌──────────────────────────────┬──────────────────┐                   │
//! │  │  AES-256 key (32 bytes)      │  nonce (12 bytes)│                   │
//! │  └──────────────────────────────┴──────────────────┘                   │
//! │                                                                         │
//! │  256-bit derivation (trailing-salt legacy sub-variant):                │
//! │  ┌──────────────────────────────┐                                      │
//! │  │  AES-256 key (32 bytes)      │   (nonce travels in the envelope)    │
//! │  └──────────────────────────────┘                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Newly created envelopes always stretch with [`CURRENT_ITERATIONS`];
//! decryption honors whatever iteration count the envelope header recorded,
//! which is how ciphertexts written by earlier client generations stay
//! readable.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Iteration count used when creating new envelopes
pub const CURRENT_ITERATIONS: u32 = 500_000;

/// Iteration count fixed by the oldest envelope format
pub const LEGACY_ITERATIONS: u32 = 5_000;

/// Size of the AES key sliced off the front of the derived stream
pub const KEY_SIZE: usize = 32;

/// Key material derived for a single encrypt or decrypt call
///
/// Owned exclusively by the cipher call that produced it; both halves are
/// zeroized on drop. Never persisted.
pub struct DerivedKeyMaterial {
    key: Zeroizing<Vec<u8>>,
    iv: Zeroizing<Vec<u8>>,
}

impl DerivedKeyMaterial {
    /// The AES-256 key (first 32 derived bytes)
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The IV/nonce slice (derived bytes past the key, possibly empty)
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }
}

/// Stretch a password into cipher key material
///
/// PBKDF2-HMAC-SHA256. `bit_len` is the total number of derived bits; the
/// first 32 bytes become the AES key and the remainder (if any) becomes the
/// IV/nonce for the envelope generations that derive it.
///
/// Deterministic: identical inputs always yield identical output. There is
/// no randomness in this component — salts come from the envelope.
pub fn derive(
    password: &str,
    salt: &[u8],
    iterations: u32,
    bit_len: usize,
) -> Result<DerivedKeyMaterial> {
    if iterations == 0 {
        return Err(Error::KeyDerivationFailed(
            "iteration count must be non-zero".into(),
        ));
    }
    if bit_len % 8 != 0 || bit_len / 8 < KEY_SIZE {
        return Err(Error::KeyDerivationFailed(format!(
            "derived length must be at least {} bytes of whole bytes, got {} bits",
            KEY_SIZE, bit_len
        )));
    }

    let mut derived = Zeroizing::new(vec![0u8; bit_len / 8]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut derived);

    let key = Zeroizing::new(derived[..KEY_SIZE].to_vec());
    let iv = Zeroizing::new(derived[KEY_SIZE..].to_vec());

    Ok(DerivedKeyMaterial { key, iv })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive("password", b"salt1234", 1_000, 384).unwrap();
        let b = derive("password", b"salt1234", 1_000, 384).unwrap();

        assert_eq!(a.key(), b.key());
        assert_eq!(a.iv(), b.iv());
    }

    #[test]
    fn test_split_sizes() {
        let m = derive("password", b"salt1234", 10, 384).unwrap();
        assert_eq!(m.key().len(), 32);
        assert_eq!(m.iv().len(), 16);

        let m = derive("password", b"salt1234", 10, 352).unwrap();
        assert_eq!(m.key().len(), 32);
        assert_eq!(m.iv().len(), 12);

        let m = derive("password", b"salt1234", 10, 256).unwrap();
        assert_eq!(m.key().len(), 32);
        assert!(m.iv().is_empty());
    }

    #[test]
    fn test_different_inputs_differ() {
        let base = derive("password", b"salt1234", 10, 384).unwrap();

        let other_password = derive("passwore", b"salt1234", 10, 384).unwrap();
        assert_ne!(base.key(), other_password.key());

        let other_salt = derive("password", b"salt1235", 10, 384).unwrap();
        assert_ne!(base.key(), other_salt.key());

        let other_iterations = derive("password", b"salt1234", 11, 384).unwrap();
        assert_ne!(base.key(), other_iterations.key());
    }

    #[test]
    fn test_known_vector() {
        // RFC 6070-style PBKDF2-HMAC-SHA256 vector (password/salt/1 iteration).
        let m = derive("password", b"salt", 1, 256).unwrap();
        assert_eq!(
            hex::encode(m.key()),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
        );
    }

    #[test]
    fn test_rejects_zero_iterations() {
        assert!(derive("password", b"salt", 0, 384).is_err());
    }

    #[test]
    fn test_rejects_short_output() {
        assert!(derive("password", b"salt", 10, 128).is_err());
        assert!(derive("password", b"salt", 10, 385).is_err());
    }
}
