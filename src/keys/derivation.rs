//! # Hierarchical Key Derivation
//!
//! BIP32-style secp256k1 derivation for the master-seed signing mode.
//!
//! Node operation keys live at the fixed path `m/5`; remote-signing
//! sub-events reference deeper paths (e.g. `m/3/19328`), so the full
//! child-derivation scheme is implemented: HMAC-SHA512 master key from the
//! seed, then normal or hardened child steps.

use hmac::{Hmac, Mac};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, NonZeroScalar, Scalar, SecretKey};
use sha2::Sha512;

use crate::error::{Error, Result};

type HmacSha512 = Hmac<Sha512>;

/// HMAC key fixed by the derivation standard
const MASTER_KEY_HMAC_KEY: &[u8] = b"Bitcoin seed";

/// Child indexes at or above this offset are hardened
const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Minimum seed length in bytes (128 bits)
const MIN_SEED_LEN: usize = 16;

/// Maximum seed length in bytes (512 bits)
const MAX_SEED_LEN: usize = 64;

/// Derive the private key at `path` from a master seed
///
/// `path` is of the form `m`, `m/5`, `m/3/19328`, with `'` or `h` marking
/// hardened steps.
pub fn derive_private_key(seed: &[u8], path: &str) -> Result<SecretKey> {
    if seed.len() < MIN_SEED_LEN || seed.len() > MAX_SEED_LEN {
        return Err(Error::InvalidKey(format!(
            "master seed must be {MIN_SEED_LEN}-{MAX_SEED_LEN} bytes, got {}",
            seed.len()
        )));
    }

    let mut mac = HmacSha512::new_from_slice(MASTER_KEY_HMAC_KEY)
        .map_err(|_| Error::KeyDerivationFailed("HMAC initialization failed".into()))?;
    mac.update(seed);
    let output = mac.finalize().into_bytes();

    let mut secret = SecretKey::from_slice(&output[..32])
        .map_err(|_| Error::KeyDerivationFailed("seed produced an invalid master key".into()))?;
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&output[32..]);

    for index in parse_path(path)? {
        let (child, child_chain) = derive_child(&secret, &chain_code, index)?;
        secret = child;
        chain_code = child_chain;
    }

    Ok(secret)
}

fn derive_child(
    parent: &SecretKey,
    chain_code: &[u8; 32],
    index: u32,
) -> Result<(SecretKey, [u8; 32])> {
    let mut mac = HmacSha512::new_from_slice(chain_code)
        .map_err(|_| Error::KeyDerivationFailed("HMAC initialization failed".into()))?;

    if index >= HARDENED_OFFSET {
        mac.update(&[0u8]);
        mac.update(&parent.to_bytes());
    } else {
        let parent_point = parent.public_key().to_encoded_point(true);
        mac.update(parent_point.as_bytes());
    }
    mac.update(&index.to_be_bytes());
    let output = mac.finalize().into_bytes();

    let tweak: Scalar =
        Option::from(Scalar::from_repr(FieldBytes::clone_from_slice(&output[..32]))).ok_or_else(
            || Error::KeyDerivationFailed("derived child scalar out of range".into()),
        )?;
    let child = tweak + parent.to_nonzero_scalar().as_ref();
    let child: NonZeroScalar = Option::from(NonZeroScalar::new(child))
        .ok_or_else(|| Error::KeyDerivationFailed("derived child key is zero".into()))?;

    let mut child_chain = [0u8; 32];
    child_chain.copy_from_slice(&output[32..]);

    Ok((SecretKey::from(child), child_chain))
}

fn parse_path(path: &str) -> Result<Vec<u32>> {
    let mut parts = path.split('/');
    if parts.next() != Some("m") {
        return Err(Error::KeyDerivationFailed(format!(
            "derivation path must start with 'm': {path}"
        )));
    }

    let mut indexes = Vec::new();
    for part in parts {
        let (digits, hardened) = match part.strip_suffix('\'').or_else(|| part.strip_suffix('h')) {
            Some(rest) => (rest, true),
            None => (part, false),
        };
        let index: u32 = digits.parse().map_err(|_| {
            Error::KeyDerivationFailed(format!("invalid derivation path segment: {part}"))
        })?;
        if index >= HARDENED_OFFSET {
            return Err(Error::KeyDerivationFailed(format!(
                "derivation index out of range: {part}"
            )));
        }
        indexes.push(if hardened { index + HARDENED_OFFSET } else { index });
    }
    Ok(indexes)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: [u8; 32] = [7u8; 32];

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive_private_key(&SEED, "m/5").unwrap();
        let b = derive_private_key(&SEED, "m/5").unwrap();
        assert_eq!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_paths_produce_distinct_keys() {
        let master = derive_private_key(&SEED, "m").unwrap();
        let child = derive_private_key(&SEED, "m/5").unwrap();
        let deep = derive_private_key(&SEED, "m/3/19328").unwrap();
        let hardened = derive_private_key(&SEED, "m/5'").unwrap();

        assert_ne!(master.to_bytes(), child.to_bytes());
        assert_ne!(child.to_bytes(), deep.to_bytes());
        assert_ne!(child.to_bytes(), hardened.to_bytes());
    }

    #[test]
    fn test_bip32_test_vector_1() {
        // Standard test vector 1: seed 000102030405060708090a0b0c0d0e0f,
        // chain m/0' private key.
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let key = derive_private_key(&seed, "m/0'").unwrap();
        assert_eq!(
            hex::encode(key.to_bytes()),
            "edb2e14f9ee77d26dd93b4ecede8d16ed408ce149b6cd80b0715a2d911a0afea"
        );
    }

    #[test]
    fn test_bip32_master_key_vector() {
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let key = derive_private_key(&seed, "m").unwrap();
        assert_eq!(
            hex::encode(key.to_bytes()),
            "e8f32e723decf4051aefac8e2c93c9c5b214313817cdb01a1494b917c8436b35"
        );
    }

    #[test]
    fn test_rejects_bad_seed_and_path() {
        assert!(derive_private_key(&[0u8; 8], "m/5").is_err());
        assert!(derive_private_key(&[0u8; 128], "m/5").is_err());
        assert!(derive_private_key(&SEED, "5").is_err());
        assert!(derive_private_key(&SEED, "m/x").is_err());
        assert!(derive_private_key(&SEED, "m/4294967295").is_err());
    }
}
