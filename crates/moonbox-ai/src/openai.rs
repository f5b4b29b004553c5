// SPDX-License-Identifier: MIT OR Apache-2.0
//! OpenAI chat-completions protocol.

use crate::client::resolve_endpoint;
use moonbox_core::{AiError, ChatRequest, ChatResponse, EnvStore, Usage};
use serde::{Deserialize, Serialize};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
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
    choices: Vec<WireChoice>,
    #[serde(default)]
    model: String,
    usage: Option<WireUsage>,
    error: Option<WireError>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Deserialize)]
struct WireChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
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
        .get(function_id, "OPENAI_API_KEY")
        .await
        .map_err(|_| AiError::new("OPENAI_API_KEY not set in function environment"))?;

    let endpoint = resolve_endpoint(
        env,
        function_id,
        req.endpoint.as_deref(),
        "OPENAI_ENDPOINT",
        DEFAULT_ENDPOINT,
    )
    .await;
    let url = format!("{endpoint}/chat/completions");

    let wire = WireRequest {
        model: &req.model,
        messages: req
            .messages
            .iter()
            .map(|m| WireMessage { role: &m.role, content: &m.content })
            .collect(),
        max_tokens: (req.max_tokens > 0).then_some(req.max_tokens),
        temperature: (req.temperature != 0.0).then_some(req.temperature),
    };
    let request_json = serde_json::to_string(&wire)
        .map_err(|e| AiError::new(format!("failed to encode OpenAI request: {e}")))?;

    let response = http
        .post(&url)
        .header("Content-Type", "application/json")
        .bearer_auth(&api_key)
        .body(request_json.clone())
        .send()
        .await
        .map_err(|e| {
            AiError::new(format!("OpenAI request failed: {e}"))
                .with_endpoint(url.clone())
                .with_request_json(request_json.clone())
        })?;

    let body = response.text().await.map_err(|e| {
        AiError::new(format!("failed to read OpenAI response: {e}"))
            .with_endpoint(url.clone())
            .with_request_json(request_json.clone())
    })?;

    let parsed: WireResponse = serde_json::from_str(&body).map_err(|e| {
        AiError::new(format!("failed to decode OpenAI response: {e}"))
            .with_endpoint(url.clone())
            .with_request_json(request_json.clone())
            .with_response_json(body.clone())
    })?;

    if let Some(error) = parsed.error {
        return Err(AiError::new(format!("OpenAI API error: {}", error.message))
            .with_endpoint(url)
            .with_request_json(request_json)
            .with_response_json(body));
    }

    let Some(first) = parsed.choices.first() else {
        return Err(AiError::new("no response from OpenAI")
            .with_endpoint(url)
            .with_request_json(request_json)
            .with_response_json(body));
    };

    let usage = parsed
        .usage
        .map(|u| Usage { input_tokens: u.prompt_tokens, output_tokens: u.completion_tokens })
        .unwrap_or_default();

    Ok(ChatResponse {
        content: first.message.content.clone(),
        model: if parsed.model.is_empty() { req.model.clone() } else { parsed.model },
        usage,
        endpoint: url,
        request_json,
        response_json: Some(body),
    })
}
