//! # Node Key Management
//!
//! In-process cache of unlocked signing keys, plus the loader registry that
//! populates it.
//!
//! ## Unlock Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          UNLOCK FLOW                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  caller                                                                │
//! │    │ set_loader(node_id, strategy)                                     │
//! │    ▼                                                                   │
//! │  KeyLoaderCache ──── unlock(node_id) ───► KeyLoader.load()             │
//! │    │                                          │                        │
//! │    │                 ┌────────────────────────┘                        │
//! │    ▼                 ▼                                                 │
//! │  NodeKeyCache ◄── insert(node_id, handle)                              │
//! │    │                                                                   │
//! │    └── get(node_id) ───► RequestSigner (borrow for one signature)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cache lives for the process: created empty, mutated only by explicit
//! unlock/insert and lock/remove, never garbage-collected. Handles are
//! never serialized to persistent storage.

mod derivation;
mod loader;

pub use loader::{BitcoinNetwork, EncryptedKeySource, KeyLoader, SIGNING_KEY_PATH};

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::crypto::SigningKeyHandle;
use crate::error::{Error, Result};

/// Process-lifetime map from node ID to unlocked signing key
///
/// Reads for different nodes never interfere; insert/remove for the same
/// node are serialized by the lock, so a reader never observes a
/// half-updated mapping. At most one handle per node: inserting again
/// replaces (and thereby invalidates) the previous handle.
#[derive(Default)]
pub struct NodeKeyCache {
    keys: RwLock<HashMap<String, Arc<SigningKeyHandle>>>,
}

impl NodeKeyCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the signing key handle for a node, if unlocked
    pub fn get(&self, node_id: &str) -> Option<Arc<SigningKeyHandle>> {
        self.keys.read().get(node_id).cloned()
    }

    /// Check whether a node has an unlocked key
    pub fn has(&self, node_id: &str) -> bool {
        self.keys.read().contains_key(node_id)
    }

    /// Insert (or replace) the handle for a node
    pub fn insert(&self, node_id: impl Into<String>, handle: SigningKeyHandle) -> Arc<SigningKeyHandle> {
        let node_id = node_id.into();
        let handle = Arc::new(handle);
        self.keys.write().insert(node_id, handle.clone());
        handle
    }

    /// Remove a node's handle (lock/logout); returns whether one existed
    pub fn remove(&self, node_id: &str) -> bool {
        self.keys.write().remove(node_id).is_some()
    }
}

/// Registry of unlock strategies per node, feeding the key cache
///
/// Loaders are registered up front; `unlock` runs the node's strategy once
/// and caches the result. Subsequent calls hit the cache.
pub struct KeyLoaderCache {
    cache: Arc<NodeKeyCache>,
    loaders: RwLock<HashMap<String, Arc<KeyLoader>>>,
}

impl KeyLoaderCache {
    /// Create a registry feeding the given cache
    pub fn new(cache: Arc<NodeKeyCache>) -> Self {
        Self {
            cache,
            loaders: RwLock::new(HashMap::new()),
        }
    }

    /// Register the unlock strategy for a node
    pub fn set_loader(&self, node_id: impl Into<String>, loader: KeyLoader) {
        self.loaders.write().insert(node_id.into(), Arc::new(loader));
    }

    /// Unlock a node's signing key, using the cache when already unlocked
    ///
    /// Returns `Ok(None)` when the loader found no key to unlock. Fails
    /// with [`Error::SigningKeyLoaderMissing`] when no strategy was
    /// registered for the node.
    pub async fn unlock(&self, node_id: &str) -> Result<Option<Arc<SigningKeyHandle>>> {
        if let Some(handle) = self.cache.get(node_id) {
            return Ok(Some(handle));
        }

        let loader = self
            .loaders
            .read()
            .get(node_id)
            .cloned()
            .ok_or_else(|| Error::SigningKeyLoaderMissing(node_id.to_string()))?;

        match loader.load().await? {
            Some(handle) => Ok(Some(self.cache.insert(node_id, handle))),
            None => Ok(None),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn secp_handle(byte: u8) -> SigningKeyHandle {
        SigningKeyHandle::from_secp256k1_bytes(&[byte; 32]).unwrap()
    }

    #[test]
    fn test_empty_cache() {
        let cache = NodeKeyCache::new();
        assert!(!cache.has("node-a"));
        assert!(cache.get("node-a").is_none());
        assert!(!cache.remove("node-a"));
    }

    #[test]
    fn test_insert_get_remove() {
        let cache = NodeKeyCache::new();
        cache.insert("node-a", secp_handle(1));

        assert!(cache.has("node-a"));
        assert!(cache.get("node-a").is_some());

        assert!(cache.remove("node-a"));
        assert!(!cache.has("node-a"));
    }

    #[test]
    fn test_cache_isolation_between_nodes() {
        let cache = NodeKeyCache::new();
        cache.insert("node-a", secp_handle(1));

        assert!(!cache.has("node-b"));
        assert!(cache.get("node-b").is_none());

        assert!(!cache.remove("node-b"));
        assert!(cache.has("node-a"));
    }

    #[test]
    fn test_insert_replaces_previous_handle() {
        let cache = NodeKeyCache::new();
        let first = cache.insert("node-a", secp_handle(1));
        let second = cache.insert("node-a", secp_handle(2));

        let current = cache.get("node-a").unwrap();
        assert!(Arc::ptr_eq(&current, &second));
        assert!(!Arc::ptr_eq(&current, &first));
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let cache = Arc::new(NodeKeyCache::new());

        let writers: Vec<_> = (0..8u8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    let node_id = format!("node-{}", i % 2);
                    for _ in 0..50 {
                        cache.insert(node_id.clone(), secp_handle(i + 1));
                        // A reader must always see a complete mapping.
                        assert!(cache.get(&node_id).is_some());
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        assert!(cache.has("node-0"));
        assert!(cache.has("node-1"));
    }

    #[test]
    fn test_unlock_requires_registered_loader() {
        let cache = Arc::new(NodeKeyCache::new());
        let loaders = KeyLoaderCache::new(cache);

        let err = tokio_test::block_on(loaders.unlock("node-a")).unwrap_err();
        assert!(matches!(err, Error::SigningKeyLoaderMissing(_)));
        assert!(err.requires_unlock());
    }

    #[tokio::test]
    async fn test_unlock_populates_and_reuses_cache() {
        let cache = Arc::new(NodeKeyCache::new());
        let loaders = KeyLoaderCache::new(cache.clone());
        loaders.set_loader(
            "node-a",
            KeyLoader::master_seed(vec![3u8; 32], BitcoinNetwork::Regtest),
        );

        let first = loaders.unlock("node-a").await.unwrap().unwrap();
        assert!(cache.has("node-a"));

        // Second unlock must come from the cache, not a re-derivation.
        let second = loaders.unlock("node-a").await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
