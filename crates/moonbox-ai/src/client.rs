// SPDX-License-Identifier: MIT OR Apache-2.0
//! Provider dispatch and shared request plumbing.

use crate::anthropic::chat as anthropic_chat;
use crate::openai::chat as openai_chat;
use async_trait::async_trait;
use moonbox_core::{AiClient, AiError, ChatRequest, ChatResponse, EnvStore};
use std::sync::Arc;
use tracing::debug;

/// Chat client that speaks the supported provider protocols directly.
pub struct ProviderAiClient {
    http: reqwest::Client,
    env: Arc<dyn EnvStore>,
}

impl ProviderAiClient {
    /// Client reading API keys and endpoint overrides from `env`.
    pub fn new(env: Arc<dyn EnvStore>) -> Self {
        Self { http: reqwest::Client::new(), env }
    }

    /// Client over a caller-configured [`reqwest::Client`].
    pub fn with_client(http: reqwest::Client, env: Arc<dyn EnvStore>) -> Self {
        Self { http, env }
    }
}

fn validate(req: &ChatRequest) -> Result<(), AiError> {
    if req.provider.is_empty() {
        return Err(AiError::new("provider is required"));
    }
    if req.model.is_empty() {
        return Err(AiError::new("model is required"));
    }
    if req.messages.is_empty() {
        return Err(AiError::new("messages cannot be empty"));
    }
    Ok(())
}

#[async_trait]
impl AiClient for ProviderAiClient {
    async fn chat(&self, function_id: &str, req: ChatRequest) -> Result<ChatResponse, AiError> {
        validate(&req)?;
        debug!(provider = %req.provider, model = %req.model, "dispatching chat request");
        match req.provider.as_str() {
            "openai" => openai_chat(&self.http, self.env.as_ref(), function_id, &req).await,
            "anthropic" => anthropic_chat(&self.http, self.env.as_ref(), function_id, &req).await,
            other => Err(AiError::new(format!("unsupported provider: {other}"))),
        }
    }
}

/// Resolve the endpoint for a provider: explicit request override, then the
/// function-env `<PROVIDER>_ENDPOINT` variable, then the default. Trailing
/// slashes are trimmed so path joining stays predictable.
pub(crate) async fn resolve_endpoint(
    env: &dyn EnvStore,
    function_id: &str,
    explicit: Option<&str>,
    env_key: &str,
    default: &str,
) -> String {
    if let Some(endpoint) = explicit {
        if !endpoint.is_empty() {
            return endpoint.trim_end_matches('/').to_string();
        }
    }
    if let Ok(endpoint) = env.get(function_id, env_key).await {
        if !endpoint.is_empty() {
            return endpoint.trim_end_matches('/').to_string();
        }
    }
    default.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use moonbox_core::memory::MemoryEnvStore;
    use moonbox_core::Message;

    fn request(provider: &str, model: &str, messages: Vec<Message>) -> ChatRequest {
        ChatRequest {
            provider: provider.into(),
            model: model.into(),
            messages,
            max_tokens: 1024,
            temperature: 0.0,
            endpoint: None,
        }
    }

    #[tokio::test]
    async fn missing_provider_is_rejected() {
        let client = ProviderAiClient::new(Arc::new(MemoryEnvStore::new()));
        let err = client
            .chat("f1", request("", "m", vec![Message::new("user", "hi")]))
            .await
            .unwrap_err();
        assert_eq!(err.message, "provider is required");
    }

    #[tokio::test]
    async fn missing_model_is_rejected() {
        let client = ProviderAiClient::new(Arc::new(MemoryEnvStore::new()));
        let err = client
            .chat("f1", request("openai", "", vec![Message::new("user", "hi")]))
            .await
            .unwrap_err();
        assert_eq!(err.message, "model is required");
    }

    #[tokio::test]
    async fn empty_messages_are_rejected() {
        let client = ProviderAiClient::new(Arc::new(MemoryEnvStore::new()));
        let err = client.chat("f1", request("openai", "m", vec![])).await.unwrap_err();
        assert_eq!(err.message, "messages cannot be empty");
    }

    #[tokio::test]
    async fn unknown_provider_is_rejected() {
        let client = ProviderAiClient::new(Arc::new(MemoryEnvStore::new()));
        let err = client
            .chat("f1", request("cohere", "m", vec![Message::new("user", "hi")]))
            .await
            .unwrap_err();
        assert!(err.message.contains("unsupported provider"));
    }

    #[tokio::test]
    async fn endpoint_resolution_order() {
        let env = MemoryEnvStore::new();
        env.seed("f1", "OPENAI_ENDPOINT", "https://proxy.example.com/").await;

        // Explicit override wins.
        let endpoint = resolve_endpoint(
            &env,
            "f1",
            Some("https://direct.example.com/"),
            "OPENAI_ENDPOINT",
            "https://api.openai.com/v1",
        )
        .await;
        assert_eq!(endpoint, "https://direct.example.com");

        // Env override next.
        let endpoint =
            resolve_endpoint(&env, "f1", None, "OPENAI_ENDPOINT", "https://api.openai.com/v1").await;
        assert_eq!(endpoint, "https://proxy.example.com");

        // Default last, and function-scoped: another function sees none.
        let endpoint =
            resolve_endpoint(&env, "f2", None, "OPENAI_ENDPOINT", "https://api.openai.com/v1").await;
        assert_eq!(endpoint, "https://api.openai.com/v1");
    }
}
