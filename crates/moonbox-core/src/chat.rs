// SPDX-License-Identifier: MIT OR Apache-2.0
//! Chat payloads and the AI client/tracker contracts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// `"system"`, `"user"`, or `"assistant"`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl Message {
    /// Build a message from role and content.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self { role: role.into(), content: content.into() }
    }
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt.
    pub input_tokens: u32,
    /// Tokens produced in the completion.
    pub output_tokens: u32,
}

/// A chat request as assembled by the `ai` capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// `"openai"` or `"anthropic"`.
    pub provider: String,
    /// Provider-specific model id.
    pub model: String,
    /// Conversation, oldest first. Must be non-empty.
    pub messages: Vec<Message>,
    /// Completion budget; the capability defaults this to 1024.
    pub max_tokens: u32,
    /// Sampling temperature; the capability defaults this to 0.
    pub temperature: f64,
    /// Explicit endpoint override; takes precedence over the function-env
    /// `<PROVIDER>_ENDPOINT` override and the provider default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// A chat response plus the raw wire artifacts kept for tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Assistant text.
    pub content: String,
    /// Model the provider reports having used.
    pub model: String,
    /// Token accounting.
    pub usage: Usage,
    /// Resolved endpoint the request was sent to.
    pub endpoint: String,
    /// Serialized request body as sent.
    pub request_json: String,
    /// Raw response body, when one was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_json: Option<String>,
}

/// A chat failure.
///
/// Wire artifacts recorded before the failure are preserved so the tracking
/// decorator can emit them with the error record.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AiError {
    /// Human-readable failure description.
    pub message: String,
    /// Endpoint the request was (or would have been) sent to.
    pub endpoint: Option<String>,
    /// Serialized request body, when it was assembled before the failure.
    pub request_json: Option<String>,
    /// Raw response body, when one was received before the failure.
    pub response_json: Option<String>,
}

impl AiError {
    /// A failure with no recorded wire artifacts.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), endpoint: None, request_json: None, response_json: None }
    }

    /// Attach the resolved endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Attach the serialized request body.
    #[must_use]
    pub fn with_request_json(mut self, json: impl Into<String>) -> Self {
        self.request_json = Some(json.into());
        self
    }

    /// Attach the raw response body.
    #[must_use]
    pub fn with_response_json(mut self, json: impl Into<String>) -> Self {
        self.response_json = Some(json.into());
        self
    }
}

/// Outcome recorded for one chat call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    /// The provider returned a usable response.
    Success,
    /// The call failed.
    Error,
}

/// One tracked chat call, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Provider name as requested.
    pub provider: String,
    /// Model as requested.
    pub model: String,
    /// Resolved endpoint, when known.
    pub endpoint: String,
    /// Serialized request body, when assembled.
    pub request_json: String,
    /// Raw response body, when received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_json: Option<String>,
    /// Wall-clock duration of the call in milliseconds.
    pub duration_ms: u64,
    /// Success or error.
    pub status: TrackStatus,
    /// Failure description for error records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Prompt tokens for success records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u32>,
    /// Completion tokens for success records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u32>,
}

/// Provider-facing chat client.
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Perform one chat call in the identity of `function_id`.
    async fn chat(&self, function_id: &str, req: ChatRequest) -> Result<ChatResponse, AiError>;
}

/// Sink for per-execution chat records.
///
/// Failures inside implementations are swallowed; tracking never affects the
/// chat result.
#[async_trait]
pub trait AiTracker: Send + Sync {
    /// Record one chat call under `execution_id`.
    async fn track(&self, execution_id: &str, record: TrackRecord);
}
