//! # Webhook Verification
//!
//! Authenticates inbound webhook events before any handler runs.
//!
//! The signature is an HMAC-SHA256 digest of the **exact raw body bytes**
//! (never a re-serialization), hex-encoded in the `lightspark-signature`
//! header and keyed by the per-integration webhook secret. Parsing happens
//! only after the digest checks out, so unauthenticated bytes never reach
//! a JSON parser. The same primitive underlies the remote-signing
//! handshake ([`remote_signing`]).

pub mod remote_signing;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex-encoded HMAC digest of the raw request body
pub const WEBHOOKS_SIGNATURE_HEADER: &str = "lightspark-signature";

/// Kind of webhook event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookEventType {
    /// A node changed status
    NodeStatus,
    /// An outgoing payment settled or failed
    PaymentFinished,
    /// A withdrawal completed
    WithdrawalFinished,
    /// Funds arrived on a node
    FundsReceived,
    /// A remote-signing sub-event needs handling
    RemoteSigning,
    /// A node's balance dropped below the configured threshold
    LowBalance,
    /// A node's balance rose above the configured threshold
    HighBalance,
    /// An event type this client version does not know yet
    #[serde(other)]
    FutureValue,
}

/// A verified webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Kind of event
    pub event_type: WebhookEventType,
    /// Unique event identifier
    pub event_id: String,
    /// When the event was emitted
    pub timestamp: DateTime<Utc>,
    /// Entity the event concerns
    pub entity_id: String,
    /// Wallet the event concerns, when applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<String>,
    /// Sub-event payload (remote signing)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Check the HMAC digest of a raw webhook body
///
/// `hex_digest` must decode to exactly the HMAC-SHA256 output length;
/// comparison is constant-time. Odd-length or non-hex header values fail
/// verification rather than being partially decoded.
pub fn verify_signature(data: &[u8], hex_digest: &str, webhook_secret: &str) -> Result<()> {
    let digest = hex::decode(hex_digest).map_err(|_| Error::SignatureVerificationFailed)?;

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| Error::SignatureVerificationFailed)?;
    mac.update(data);
    mac.verify_slice(&digest)
        .map_err(|_| Error::SignatureVerificationFailed)
}

/// Verify a webhook body and parse it into a typed event
///
/// Verification failures return before any parsing; a body that verifies
/// but is not a well-formed event is a distinct parse failure.
pub fn verify_and_parse(
    data: &[u8],
    hex_digest: &str,
    webhook_secret: &str,
) -> Result<WebhookEvent> {
    verify_signature(data, hex_digest, webhook_secret)?;

    let event: WebhookEvent =
        serde_json::from_slice(data).map_err(|e| Error::WebhookParseFailed(e.to_string()))?;
    tracing::debug!(
        "Verified webhook event {} ({:?})",
        event.event_id,
        event.event_type
    );
    Ok(event)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // Known-good triple: this body signed with this secret produces this
    // digest. Everything else in the suite perturbs it.
    const BODY: &str = "{\"event_type\": \"NODE_STATUS\", \"event_id\": \"1615c8be5aa44e429eba700db2ed8ca5\", \"timestamp\": \"2023-05-17T23:56:47.874449+00:00\", \"entity_id\": \"lightning_node:01882c25-157a-f96b-0000-362d42b64397\"}";
    const DIGEST: &str = "62a8829aeb48b4142533520b1f7f86cdb1ee7d718bf3ea15bc1c662d4c453b74";
    const SECRET: &str = "3gZ5oQQUASYmqQNuEk0KambNMVkOADDItIJjzUlAWjX";

    #[test]
    fn test_golden_vector_verifies_and_parses() {
        let event = verify_and_parse(BODY.as_bytes(), DIGEST, SECRET).unwrap();

        assert_eq!(event.event_type, WebhookEventType::NodeStatus);
        assert_eq!(event.event_id, "1615c8be5aa44e429eba700db2ed8ca5");
        assert_eq!(
            event.entity_id,
            "lightning_node:01882c25-157a-f96b-0000-362d42b64397"
        );
        assert_eq!(
            event.timestamp,
            "2023-05-17T23:56:47.874449+00:00"
                .parse::<DateTime<Utc>>()
                .unwrap()
        );
        assert!(event.wallet_id.is_none());
        assert!(event.data.is_none());
    }

    #[test]
    fn test_flipping_any_body_byte_fails() {
        let mut body = BODY.as_bytes().to_vec();
        for i in [0, body.len() / 2, body.len() - 1] {
            body[i] ^= 0x01;
            let err = verify_and_parse(&body, DIGEST, SECRET).unwrap_err();
            assert!(matches!(err, Error::SignatureVerificationFailed));
            body[i] ^= 0x01;
        }
    }

    #[test]
    fn test_bad_digests_fail_before_parsing() {
        let digests: [String; 7] = [
            "deadbeef".into(),             // wrong length
            "a".repeat(64),                // wrong value
            "NotAHexValue".into(),         // not hex
            format!("{DIGEST}qq"),         // trailing garbage
            format!("{DIGEST}00"),         // extra byte
            DIGEST[..63].into(),           // odd length
            DIGEST.replacen('6', "7", 1),  // single nibble flipped
        ];
        for digest in &digests {
            let err = verify_and_parse(BODY.as_bytes(), digest, SECRET).unwrap_err();
            assert!(
                matches!(err, Error::SignatureVerificationFailed),
                "digest {digest:?}"
            );
        }
    }

    #[test]
    fn test_wrong_secret_fails() {
        let err = verify_and_parse(BODY.as_bytes(), DIGEST, "other-secret").unwrap_err();
        assert!(matches!(err, Error::SignatureVerificationFailed));
    }

    #[test]
    fn test_verified_garbage_is_a_parse_failure() {
        // A correctly signed body that is not an event must fail parsing,
        // not verification.
        let body = b"not json at all";
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body);
        let digest = hex::encode(mac.finalize().into_bytes());

        let err = verify_and_parse(body, &digest, SECRET).unwrap_err();
        assert!(matches!(err, Error::WebhookParseFailed(_)));
    }

    #[test]
    fn test_unknown_event_type_maps_to_future_value() {
        let body = "{\"event_type\": \"SOMETHING_NEW\", \"event_id\": \"e1\", \"timestamp\": \"2024-01-01T00:00:00+00:00\", \"entity_id\": \"node:1\", \"wallet_id\": \"wallet:2\"}";
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body.as_bytes());
        let digest = hex::encode(mac.finalize().into_bytes());

        let event = verify_and_parse(body.as_bytes(), &digest, SECRET).unwrap();
        assert_eq!(event.event_type, WebhookEventType::FutureValue);
        assert_eq!(event.wallet_id.as_deref(), Some("wallet:2"));
    }
}
