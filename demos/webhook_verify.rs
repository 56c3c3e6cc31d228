//! # Webhook Verification Demo
//!
//! Demonstrates HMAC verification of an inbound webhook body.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example webhook_verify
//! ```

use hmac::{Hmac, Mac};
use lightspark_core::{verify_and_parse, WEBHOOKS_SIGNATURE_HEADER};
use sha2::Sha256;

fn main() {
    println!("=== Lightspark Core: Webhook Verification Demo ===\n");

    let secret = "demo-webhook-secret";
    let body = "{\"event_type\": \"NODE_STATUS\", \"event_id\": \"demo-1\", \"timestamp\": \"2024-06-05T04:20:16+00:00\", \"entity_id\": \"lightning_node:demo\"}";

    // The sender computes the digest over the exact raw bytes.
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    let digest = hex::encode(mac.finalize().into_bytes());
    println!("Inbound request:");
    println!("  {}: {}", WEBHOOKS_SIGNATURE_HEADER, digest);
    println!("  body: {body}");
    println!();

    // Verify-then-parse: unauthenticated bytes never reach the parser.
    let event = verify_and_parse(body.as_bytes(), &digest, secret).unwrap();
    println!("Verified event {:?} for {}", event.event_type, event.entity_id);
    println!();

    // A single flipped byte is rejected before parsing.
    let mut tampered = body.as_bytes().to_vec();
    tampered[0] ^= 0x01;
    match verify_and_parse(&tampered, &digest, secret) {
        Err(err) => println!("Tampered body rejected: {err}"),
        Ok(_) => unreachable!("tampered body must not verify"),
    }
}
