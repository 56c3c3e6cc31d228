//! # Unlock and Sign Demo
//!
//! Demonstrates the full client flow: escrow a signing key in a password
//! envelope, unlock it through a key loader, and sign an operation.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example unlock_and_sign
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use lightspark_core::crypto::generate_signing_key_pair;
use lightspark_core::{
    CryptoProvider, EncryptedKeySource, EncryptedSecret, EnvelopeCipher, KeyLoader, NodeKeyCache,
    OsCryptoProvider, RequestSigner, Result, REQUEST_SIGNATURE_HEADER,
};

/// Stand-in for the key-recovery service: hands back one fixed envelope.
struct DemoKeySource(EncryptedSecret);

#[async_trait]
impl EncryptedKeySource for DemoKeySource {
    async fn recover_signing_key(&self, _node_id: &str) -> Result<Option<EncryptedSecret>> {
        Ok(Some(self.0.clone()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Lightspark Core: Unlock and Sign Demo ===\n");

    let provider: Arc<dyn CryptoProvider> = Arc::new(OsCryptoProvider);
    let cipher = EnvelopeCipher::new(provider.clone());
    let password = "1234!@#$";

    // Step 1: Generate and escrow a signing key (normally done server-side)
    println!("Step 1: Generating an RSA operation signing key (be patient)...");
    let pair = generate_signing_key_pair().await?;
    let secret = cipher
        .encrypt(&pair.private_key_pkcs8_der, password, None)
        .await?;
    println!("  Envelope header: {}", secret.cipher);
    println!();

    // Step 2: Unlock through the password loader
    println!("Step 2: Unlocking the node key with the password...");
    let cache = Arc::new(NodeKeyCache::new());
    let loader = KeyLoader::node_id_and_password(
        "node-demo",
        password,
        Arc::new(DemoKeySource(secret)),
        cipher,
    );
    let handle = loader.load().await?.expect("demo key must load");
    cache.insert("node-demo", handle);
    println!("  Cache now holds a key for node-demo: {}", cache.has("node-demo"));
    println!();

    // Step 3: Sign a node-scoped mutation
    println!("Step 3: Signing a mutation...");
    let signer = RequestSigner::new(cache, provider);
    let signed = signer
        .sign(
            "node-demo",
            "mutation PayInvoice($invoice: String!) { pay }",
            serde_json::Map::new(),
        )
        .await?;

    println!("  Body bytes ready for transport: {}", signed.body.len());
    println!(
        "  {}: {}",
        REQUEST_SIGNATURE_HEADER,
        signed.header.to_header_value()?
    );
    println!();
    println!("The transport layer sends the body unmodified with that header.");

    Ok(())
}
