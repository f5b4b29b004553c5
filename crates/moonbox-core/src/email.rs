// SPDX-License-Identifier: MIT OR Apache-2.0
//! Email payloads and the email client contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A send failure, surfaced to scripts as an in-band error string.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EmailError(pub String);

/// An outbound email assembled from script-supplied options.
///
/// The `email` capability validates required fields before this record is
/// built; the client only sees well-formed requests from the sandbox, but
/// re-validation is cheap for direct users.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailRequest {
    /// Sender address.
    pub from: String,
    /// Recipient addresses; at least one.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// HTML body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Reply-To address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    /// Carbon-copy addresses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    /// Blind-carbon-copy addresses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<String>,
    /// Extra message headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Provider-side tags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// ISO 8601 delivery time; the capability converts epoch numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<String>,
}

/// Outbound email transport.
#[async_trait]
pub trait EmailClient: Send + Sync {
    /// Send `req` in the identity of `function_id`; returns the provider's
    /// message id.
    async fn send(&self, function_id: &str, req: EmailRequest) -> Result<String, EmailError>;
}
