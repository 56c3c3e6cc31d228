//! # Remote-Signing Handshake
//!
//! Handles `REMOTE_SIGNING` webhook events: verify the body, ask the
//! validator whether signing is allowed, then hand the event to the signer
//! capability.
//!
//! ## Handshake Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    REMOTE-SIGNING HANDSHAKE                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  raw body + signature header                                           │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  verify_and_parse (HMAC over exact bytes)                              │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  Validator.should_sign(event) ──► decision                             │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  RemoteSigningResponder.handle_event(event, decision)                  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  Option<RemoteSigningResponse { query, variables }>                    │
//! │  (executed by the caller's transport; possibly signed again through    │
//! │   the request signer)                                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The responder is the capability seam for the actual signer (master-seed
//! backed or otherwise); it is resolved once at startup and injected here,
//! so callers never branch on which signer is active. GraphQL text lives
//! entirely behind that seam.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::webhooks::{verify_and_parse, WebhookEvent, WebhookEventType};

/// Remote-signing sub-event kinds carried in the event `data`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteSigningSubEventType {
    /// Derive a shared secret with a peer
    Ecdh,
    /// Publish a per-commitment point
    GetPerCommitmentPoint,
    /// Release a spent per-commitment secret
    ReleasePerCommitmentSecret,
    /// Sign a batch of signing jobs
    DeriveKeyAndSign,
    /// Produce an invoice payment hash
    RequestInvoicePaymentHash,
    /// Release a payment preimage
    ReleasePaymentPreimage,
    /// Counterparty revealed a per-commitment secret
    RevealCounterpartyPerCommitmentSecret,
    /// A sub-event this client version does not know yet
    #[serde(other)]
    FutureValue,
}

/// Typed view of a remote-signing event's `data` payload
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSigningData {
    /// Which sub-event this is
    pub sub_event_type: RemoteSigningSubEventType,
    /// Network the node operates on
    #[serde(default)]
    pub bitcoin_network: Option<String>,
}

impl RemoteSigningData {
    /// Extract the typed sub-event payload from a verified event
    pub fn from_event(event: &WebhookEvent) -> Result<Self> {
        let data = event
            .data
            .as_ref()
            .ok_or_else(|| Error::RemoteSigningFailed("event carries no data payload".into()))?;
        serde_json::from_value(data.clone())
            .map_err(|e| Error::RemoteSigningFailed(format!("malformed sub-event: {e}")))
    }
}

/// Decides whether a remote-signing event should be signed
#[async_trait]
pub trait SigningRequestValidator: Send + Sync {
    /// Return `true` to allow signing for this event
    async fn should_sign(&self, event: &WebhookEvent) -> bool;
}

/// Validator that approves every request
///
/// Reasonable only when the webhook endpoint is otherwise locked down.
pub struct PositiveValidator;

#[async_trait]
impl SigningRequestValidator for PositiveValidator {
    async fn should_sign(&self, _event: &WebhookEvent) -> bool {
        true
    }
}

/// A signing response for the caller's transport to execute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSigningResponse {
    /// GraphQL document answering the sub-event
    pub query: String,
    /// Operation variables
    pub variables: Map<String, Value>,
}

/// The signer capability behind the handshake
///
/// Receives the verified event together with the validator's decision.
/// Acknowledge-only sub-events produce `None`.
#[async_trait]
pub trait RemoteSigningResponder: Send + Sync {
    /// Answer a verified remote-signing event
    async fn handle_event(
        &self,
        event: &WebhookEvent,
        should_sign: bool,
    ) -> Result<Option<RemoteSigningResponse>>;
}

/// Verifies and dispatches remote-signing webhooks
pub struct RemoteSigningHandler {
    responder: Arc<dyn RemoteSigningResponder>,
    validator: Arc<dyn SigningRequestValidator>,
}

impl RemoteSigningHandler {
    /// Create a handler over the given responder and validator
    pub fn new(
        responder: Arc<dyn RemoteSigningResponder>,
        validator: Arc<dyn SigningRequestValidator>,
    ) -> Self {
        Self { responder, validator }
    }

    /// Handle one webhook request
    ///
    /// Authenticates the raw body first; nothing reaches the validator or
    /// responder unless the HMAC digest checks out.
    pub async fn handle_webhook_request(
        &self,
        data: &[u8],
        webhook_signature: &str,
        webhook_secret: &str,
    ) -> Result<Option<RemoteSigningResponse>> {
        let event = verify_and_parse(data, webhook_signature, webhook_secret)?;
        if event.event_type != WebhookEventType::RemoteSigning {
            return Err(Error::RemoteSigningFailed(format!(
                "webhook event {} is not a remote-signing event",
                event.event_id
            )));
        }

        let should_sign = self.validator.should_sign(&event).await;
        tracing::debug!(
            "Remote-signing event {} validator decision: {}",
            event.event_id,
            should_sign
        );

        self.responder.handle_event(&event, should_sign).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
