// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-invocation identity and the HTTP event/response records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Identity of a single function invocation.
///
/// Created by the caller before [`run`](https://docs.rs/moonbox-runtime),
/// immutable for the lifetime of the invocation, discarded afterwards.
/// `function_id` is the tenancy key for every isolated store; `execution_id`
/// groups log entries and tracked side-effects of one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Globally unique id for this invocation.
    pub execution_id: String,

    /// Tenancy key partitioning KV, env, and log state.
    pub function_id: String,

    /// Invocation start, seconds since the Unix epoch.
    pub started_at: i64,

    /// Id of the inbound HTTP request, when the front door assigned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Human-readable function name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,

    /// Version label of the deployed script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// External base URL of the platform, used by `router.url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl ExecutionContext {
    /// Create a context with a fresh random execution id and the current
    /// wall-clock start time.
    pub fn new(function_id: impl Into<String>) -> Self {
        Self {
            execution_id: Uuid::new_v4().to_string(),
            function_id: function_id.into(),
            started_at: chrono::Utc::now().timestamp(),
            request_id: None,
            function_name: None,
            version: None,
            base_url: None,
        }
    }

    /// Set the platform base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the function name.
    #[must_use]
    pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    /// Set the deployed version label.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the inbound request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Inbound HTTP event delivered to a handler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpEvent {
    /// HTTP method, upper-case.
    pub method: String,
    /// Full request path as received by the front door.
    pub path: String,
    /// Path relative to the function mount point.
    pub relative_path: String,
    /// Raw request body.
    pub body: String,
    /// Request headers. Keys are unique; insertion order is irrelevant.
    pub headers: BTreeMap<String, String>,
    /// Query-string parameters, single-valued.
    pub query: BTreeMap<String, String>,
}

/// Handler output converted back into the host type system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code; defaults to 200.
    pub status_code: u16,
    /// Response headers; may be empty.
    pub headers: BTreeMap<String, String>,
    /// Response body; defaults to empty.
    pub body: String,
    /// Whether `body` is base64-encoded binary.
    pub is_base64_encoded: bool,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status_code: 200,
            headers: BTreeMap::new(),
            body: String::new(),
            is_base64_encoded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_new_populates_identity() {
        let ctx = ExecutionContext::new("fn-1");
        assert_eq!(ctx.function_id, "fn-1");
        assert!(!ctx.execution_id.is_empty());
        assert!(ctx.started_at > 0);
        assert!(ctx.base_url.is_none());
    }

    #[test]
    fn context_ids_are_unique() {
        let a = ExecutionContext::new("fn-1");
        let b = ExecutionContext::new("fn-1");
        assert_ne!(a.execution_id, b.execution_id);
    }

    #[test]
    fn context_builder_chaining() {
        let ctx = ExecutionContext::new("fn-1")
            .with_base_url("https://example.com")
            .with_function_name("hello")
            .with_version("v3")
            .with_request_id("req-9");
        assert_eq!(ctx.base_url.as_deref(), Some("https://example.com"));
        assert_eq!(ctx.function_name.as_deref(), Some("hello"));
        assert_eq!(ctx.version.as_deref(), Some("v3"));
        assert_eq!(ctx.request_id.as_deref(), Some("req-9"));
    }

    #[test]
    fn response_defaults() {
        let resp = HttpResponse::default();
        assert_eq!(resp.status_code, 200);
        assert!(resp.headers.is_empty());
        assert!(resp.body.is_empty());
        assert!(!resp.is_base64_encoded);
    }

    #[test]
    fn context_serde_skips_absent_optionals() {
        let ctx = ExecutionContext::new("fn-1");
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(!json.contains("request_id"));
        assert!(!json.contains("base_url"));
    }
}
