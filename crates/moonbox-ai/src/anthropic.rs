// SPDX-License-Identifier: MIT OR Apache-2.0
//! Anthropic messages protocol.

use crate::client::resolve_endpoint;
use moonbox_core::{AiError, ChatRequest, ChatResponse, EnvStore, Usage};
use serde::{Deserialize, Serialize};

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    content: Vec<WireContentBlock>,
    #[serde(default)]
    model: String,
    usage: Option<WireUsage>,
    error: Option<WireError>,
}

#[derive(Deserialize)]
struct WireContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
}

pub(crate) async fn chat(
    http: &reqwest::Client,
    env: &dyn EnvStore,
    function_id: &str,
    req: &ChatRequest,
) -> Result<ChatResponse, AiError> {
    let api_key = env
        .get(function_id, "ANTHROPIC_API_KEY")
        .await
        .map_err(|_| AiError::new("ANTHROPIC_API_KEY not set in function environment"))?;

    let endpoint = resolve_endpoint(
        env,
        function_id,
        req.endpoint.as_deref(),
        "ANTHROPIC_ENDPOINT",
        DEFAULT_ENDPOINT,
    )
    .await;
    let url = format!("{endpoint}/v1/messages");

    // Anthropic takes system prompts in a dedicated top-level field.
    let mut system_parts = Vec::new();
    let mut messages = Vec::new();
    for message in &req.messages {
        if message.role == "system" {
            system_parts.push(message.content.as_str());
        } else {
            messages.push(WireMessage { role: &message.role, content: &message.content });
        }
    }

    let wire = WireRequest {
        model: &req.model,
        max_tokens: if req.max_tokens > 0 { req.max_tokens } else { 1024 },
        messages,
        system: system_parts.join("\n\n"),
        temperature: (req.temperature != 0.0).then_some(req.temperature),
    };
    let request_json = serde_json::to_string(&wire)
        .map_err(|e| AiError::new(format!("failed to encode anthropic request: {e}")))?;

    let response = http
        .post(&url)
        .header("Content-Type", "application/json")
        .header("x-api-key", &api_key)
        .header("anthropic-version", API_VERSION)
        .body(request_json.clone())
        .send()
        .await
        .map_err(|e| {
            AiError::new(format!("anthropic request failed: {e}"))
                .with_endpoint(url.clone())
                .with_request_json(request_json.clone())
        })?;

    let body = response.text().await.map_err(|e| {
        AiError::new(format!("failed to read anthropic response: {e}"))
            .with_endpoint(url.clone())
            .with_request_json(request_json.clone())
    })?;

    let parsed: WireResponse = serde_json::from_str(&body).map_err(|e| {
        AiError::new(format!("failed to decode anthropic response: {e}"))
            .with_endpoint(url.clone())
            .with_request_json(request_json.clone())
            .with_response_json(body.clone())
    })?;

    if let Some(error) = parsed.error {
        return Err(AiError::new(format!("anthropic API error: {}", error.message))
            .with_endpoint(url)
            .with_request_json(request_json)
            .with_response_json(body));
    }

    let content: String = parsed
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .map(|block| block.text.as_str())
        .collect();

    let usage = parsed
        .usage
        .map(|u| Usage { input_tokens: u.input_tokens, output_tokens: u.output_tokens })
        .unwrap_or_default();

    Ok(ChatResponse {
        content,
        model: if parsed.model.is_empty() { req.model.clone() } else { parsed.model },
        usage,
        endpoint: url,
        request_json,
        response_json: Some(body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_field_omitted_when_empty() {
        let wire = WireRequest {
            model: "claude-3-5-haiku-latest",
            max_tokens: 1024,
            messages: vec![WireMessage { role: "user", content: "hi" }],
            system: String::new(),
            temperature: None,
        };
        let json = serde_json::to_string(&wire).unwrap();
        assert!(!json.contains("system"));
        assert!(json.contains("max_tokens"));
    }

    #[test]
    fn text_blocks_concatenate() {
        let body = r#"{"content":[{"type":"text","text":"Hel"},{"type":"tool_use","id":"x"},{"type":"text","text":"lo!"}],"model":"claude-3-5-haiku-latest","usage":{"input_tokens":4,"output_tokens":2}}"#;
        let parsed: WireResponse = serde_json::from_str(body).unwrap();
        let content: String = parsed
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .map(|b| b.text.as_str())
            .collect();
        assert_eq!(content, "Hello!");
    }

    #[test]
    fn error_shape_parses() {
        let body = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        let parsed: WireResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.unwrap().message, "invalid x-api-key");
    }
}
