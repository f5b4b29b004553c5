// SPDX-License-Identifier: MIT OR Apache-2.0
//! moonbox-mail
//!
//! The Resend-backed implementation of the runtime's [`EmailClient`]
//! contract. The API key is read from the calling function's env namespace
//! under `RESEND_API_KEY`; `RESEND_ENDPOINT` overrides the API host the same
//! way the AI provider endpoint overrides do.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use moonbox_core::{EmailClient, EmailError, EmailRequest, EnvStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://api.resend.com";

fn slice_is_empty(values: &&[String]) -> bool {
    values.is_empty()
}

#[derive(Serialize)]
struct WireRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    #[serde(skip_serializing_if = "slice_is_empty")]
    cc: &'a [String],
    #[serde(skip_serializing_if = "slice_is_empty")]
    bcc: &'a [String],
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<WireTag<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheduled_at: Option<&'a str>,
}

#[derive(Serialize)]
struct WireTag<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    message: String,
}

/// Email transport speaking the Resend REST protocol.
pub struct ResendEmailClient {
    http: reqwest::Client,
    env: Arc<dyn EnvStore>,
}

impl ResendEmailClient {
    /// Client reading the API key and endpoint override from `env`.
    pub fn new(env: Arc<dyn EnvStore>) -> Self {
        Self { http: reqwest::Client::new(), env }
    }

    /// Client over a caller-configured [`reqwest::Client`].
    pub fn with_client(http: reqwest::Client, env: Arc<dyn EnvStore>) -> Self {
        Self { http, env }
    }
}

#[async_trait]
impl EmailClient for ResendEmailClient {
    async fn send(&self, function_id: &str, req: EmailRequest) -> Result<String, EmailError> {
        let api_key = self
            .env
            .get(function_id, "RESEND_API_KEY")
            .await
            .map_err(|_| EmailError("RESEND_API_KEY not set in function environment".into()))?;

        let endpoint = match self.env.get(function_id, "RESEND_ENDPOINT").await {
            Ok(endpoint) if !endpoint.is_empty() => endpoint.trim_end_matches('/').to_string(),
            _ => DEFAULT_ENDPOINT.to_string(),
        };
        let url = format!("{endpoint}/emails");

        let wire = WireRequest {
            from: &req.from,
            to: &req.to,
            subject: &req.subject,
            text: req.text.as_deref(),
            html: req.html.as_deref(),
            reply_to: req.reply_to.as_deref(),
            cc: &req.cc,
            bcc: &req.bcc,
            headers: &req.headers,
            tags: req
                .tags
                .iter()
                .map(|(name, value)| WireTag { name, value })
                .collect(),
            scheduled_at: req.scheduled_at.as_deref(),
        };

        debug!(url = %url, to = req.to.len(), "sending email");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&api_key)
            .json(&wire)
            .send()
            .await
            .map_err(|e| EmailError(format!("resend request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EmailError(format!("failed to read resend response: {e}")))?;
        let parsed: WireResponse = serde_json::from_str(&body)
            .map_err(|e| EmailError(format!("failed to decode resend response: {e}")))?;

        if !status.is_success() {
            let detail = if parsed.message.is_empty() { body } else { parsed.message };
            return Err(EmailError(format!("resend API error: {detail}")));
        }
        Ok(parsed.id)
    }
}
