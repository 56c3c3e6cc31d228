//! # Request Signer
//!
//! Detached signatures for node-scoped GraphQL operations.
//!
//! ## Signing Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      REQUEST SIGNING FLOW                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. Parse the operation ──► reject malformed text and subscriptions    │
//! │                                                                         │
//! │  2. Assemble the signable payload                                      │
//! │     ┌─────────────────────────────────────────────────────────┐        │
//! │     │ { query, variables, operationName,                      │        │
//! │     │   nonce: <fresh CSPRNG u32>,                            │        │
//! │     │   expires_at: <now + 1h, RFC3339 UTC> }                 │        │
//! │     └─────────────────────────────────────────────────────────┘        │
//! │                                                                         │
//! │  3. Serialize once ──► these exact bytes are the request body          │
//! │                                                                         │
//! │  4. NodeKeyCache.get(node_id) ──► absent? fail, never auto-unlock      │
//! │                                                                         │
//! │  5. Detached signature over the bytes ──► base64                       │
//! │                                                                         │
//! │  6. Header {"v":"1","signature":...} for the transport layer           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The signer never performs the HTTP call; the transport layer attaches
//! the header and sends the unmodified payload bytes as the body.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crypto::CryptoProvider;
use crate::error::{Error, Result};
use crate::keys::NodeKeyCache;

/// Transport header carrying the request signature
pub const REQUEST_SIGNATURE_HEADER: &str = "X-Lightspark-Signing";

/// Signature header format version
pub const SIGNATURE_FORMAT_VERSION: &str = "1";

/// Signed requests expire this many seconds after signing
pub const SIGNED_REQUEST_VALIDITY_SECS: i64 = 3600;

/// The canonical payload a request signature covers
///
/// Field order is the wire order; serialization is deterministic because
/// struct fields serialize in declaration order and `variables` is an
/// ordered map.
#[derive(Debug, Clone, Serialize)]
pub struct SignedPayload {
    /// GraphQL document text
    pub query: String,
    /// Operation variables
    pub variables: Map<String, Value>,
    /// Operation name extracted from the document
    #[serde(rename = "operationName")]
    pub operation_name: String,
    /// Fresh random nonce; verifiers reject reuse
    pub nonce: u32,
    /// RFC3339 UTC expiry, always now + 1 hour
    pub expires_at: String,
}

/// Detached signature attached to the transport envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureHeader {
    /// Signature format version, always `"1"`
    pub v: String,
    /// Base64-encoded detached signature
    pub signature: String,
}

impl SignatureHeader {
    /// Serialize to the JSON header value the transport sends
    pub fn to_header_value(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A signed request ready for the transport layer
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// Exact body bytes the signature covers; send unmodified
    pub body: Vec<u8>,
    /// Signature header to attach
    pub header: SignatureHeader,
}

/// Kind of GraphQL operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

/// Extract the operation kind and name from a GraphQL document
///
/// Accepts `query Name ...`, `mutation Name ...`, `subscription Name ...`
/// with leading whitespace, mirroring what the API expects in the
/// `operationName` field.
fn parse_operation(query: &str) -> Result<(OperationKind, &str)> {
    let trimmed = query.trim_start();
    let mut words = trimmed.split_whitespace();

    let kind = match words.next() {
        Some(word) => match word.to_ascii_lowercase().as_str() {
            "query" => OperationKind::Query,
            "mutation" => OperationKind::Mutation,
            "subscription" => OperationKind::Subscription,
            _ => return Err(Error::InvalidOperation("invalid query payload".into())),
        },
        None => return Err(Error::InvalidOperation("invalid query payload".into())),
    };

    // The name is the leading word-character run of the next token; the
    // token may continue straight into "(" or "{".
    let token = words
        .next()
        .ok_or_else(|| Error::InvalidOperation("invalid query payload".into()))?;
    let name_end = token
        .char_indices()
        .find(|(_, c)| !c.is_alphanumeric() && *c != '_')
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    let name = &token[..name_end];
    if name.is_empty() {
        return Err(Error::InvalidOperation("invalid query payload".into()));
    }

    Ok((kind, name))
}

/// Signs node-scoped operations with keys borrowed from the cache
///
/// Never unlocks a key implicitly: a cache miss is reported to the caller,
/// who decides whether to run an unlock flow first.
pub struct RequestSigner {
    cache: Arc<NodeKeyCache>,
    provider: Arc<dyn CryptoProvider>,
}

impl RequestSigner {
    /// Create a signer over the given cache and provider
    pub fn new(cache: Arc<NodeKeyCache>, provider: Arc<dyn CryptoProvider>) -> Self {
        Self { cache, provider }
    }

    /// Sign a node-scoped operation
    ///
    /// Produces the canonical payload bytes and the detached signature
    /// header. Subscriptions cannot be signed.
    pub async fn sign(
        &self,
        node_id: &str,
        query: &str,
        variables: Map<String, Value>,
    ) -> Result<SignedRequest> {
        let (kind, operation_name) = parse_operation(query)?;
        if kind == OperationKind::Subscription {
            return Err(Error::InvalidOperation(
                "subscriptions cannot be signed".into(),
            ));
        }

        let nonce = self.provider.next_nonce();
        let expires_at = (self.provider.now_utc()
            + chrono::Duration::seconds(SIGNED_REQUEST_VALIDITY_SECS))
        .to_rfc3339_opts(SecondsFormat::Secs, false);

        let payload = SignedPayload {
            query: query.to_string(),
            variables,
            operation_name: operation_name.to_string(),
            nonce,
            expires_at,
        };
        let body = serde_json::to_vec(&payload)?;

        let handle = self
            .cache
            .get(node_id)
            .ok_or_else(|| Error::SigningKeyUnavailable(node_id.to_string()))?;

        let signature = handle.sign(node_id, &body).await?;
        tracing::debug!(
            "Signed operation {} for node {} (nonce {})",
            operation_name,
            node_id,
            nonce
        );

        Ok(SignedRequest {
            body,
            header: SignatureHeader {
                v: SIGNATURE_FORMAT_VERSION.to_string(),
                signature: BASE64.encode(signature),
            },
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
