// SPDX-License-Identifier: MIT OR Apache-2.0
//! Call tracking as a decorator over any [`AiClient`].

use async_trait::async_trait;
use moonbox_core::{AiClient, AiError, AiTracker, ChatRequest, ChatResponse, TrackRecord, TrackStatus};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Decorator that emits one [`TrackRecord`] per completed chat call.
///
/// Bound to a single execution id at construction; the orchestrator builds a
/// fresh decorator per invocation. With no tracker attached the decorator is
/// transparent. The inner result is always returned unchanged.
pub struct TrackingAiClient {
    inner: Arc<dyn AiClient>,
    tracker: Option<Arc<dyn AiTracker>>,
    execution_id: String,
}

impl TrackingAiClient {
    /// Wrap `inner`, recording under `execution_id`.
    pub fn new(
        inner: Arc<dyn AiClient>,
        tracker: Option<Arc<dyn AiTracker>>,
        execution_id: impl Into<String>,
    ) -> Self {
        Self { inner, tracker, execution_id: execution_id.into() }
    }
}

#[async_trait]
impl AiClient for TrackingAiClient {
    async fn chat(&self, function_id: &str, req: ChatRequest) -> Result<ChatResponse, AiError> {
        let provider = req.provider.clone();
        let model = req.model.clone();

        let started = Instant::now();
        let result = self.inner.chat(function_id, req).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        if let Some(tracker) = &self.tracker {
            let record = match &result {
                Ok(resp) => TrackRecord {
                    provider,
                    model,
                    endpoint: resp.endpoint.clone(),
                    request_json: resp.request_json.clone(),
                    response_json: resp.response_json.clone(),
                    duration_ms,
                    status: TrackStatus::Success,
                    error_message: None,
                    input_tokens: Some(resp.usage.input_tokens),
                    output_tokens: Some(resp.usage.output_tokens),
                },
                Err(err) => TrackRecord {
                    provider,
                    model,
                    endpoint: err.endpoint.clone().unwrap_or_default(),
                    request_json: err.request_json.clone().unwrap_or_default(),
                    response_json: err.response_json.clone(),
                    duration_ms,
                    status: TrackStatus::Error,
                    error_message: Some(err.message.clone()),
                    input_tokens: None,
                    output_tokens: None,
                },
            };
            debug!(execution_id = %self.execution_id, status = ?record.status, "tracking chat call");
            tracker.track(&self.execution_id, record).await;
        }

        result
    }
}
