// SPDX-License-Identifier: MIT OR Apache-2.0
//! Outbound HTTP request/response records and the client contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Transport-level failure of an outbound request.
///
/// Scripts observe this as an in-band error string, never as a host error.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HttpError(pub String);

/// HTTP methods the `http` capability exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Upper-case wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound request assembled from script-supplied options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutboundRequest {
    /// Absolute request URL.
    pub url: String,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// Query parameters appended to the URL.
    pub query: BTreeMap<String, String>,
    /// Request body; empty means no body.
    pub body: String,
}

impl OutboundRequest {
    /// Request for `url` with no headers, query, or body.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }
}

/// Response of an outbound request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers, flattened to single values.
    pub headers: BTreeMap<String, String>,
    /// Response body decoded as text.
    pub body: String,
}

impl OutboundResponse {
    /// `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// `true` for 4xx and 5xx statuses.
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }
}

/// Outbound HTTP transport.
///
/// Implementations are shared across invocations and must be safe for
/// concurrent use.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform `method` against `req`.
    async fn execute(
        &self,
        method: HttpMethod,
        req: OutboundRequest,
    ) -> Result<OutboundResponse, HttpError>;

    /// GET convenience wrapper.
    async fn get(&self, req: OutboundRequest) -> Result<OutboundResponse, HttpError> {
        self.execute(HttpMethod::Get, req).await
    }

    /// POST convenience wrapper.
    async fn post(&self, req: OutboundRequest) -> Result<OutboundResponse, HttpError> {
        self.execute(HttpMethod::Post, req).await
    }

    /// PUT convenience wrapper.
    async fn put(&self, req: OutboundRequest) -> Result<OutboundResponse, HttpError> {
        self.execute(HttpMethod::Put, req).await
    }

    /// PATCH convenience wrapper.
    async fn patch(&self, req: OutboundRequest) -> Result<OutboundResponse, HttpError> {
        self.execute(HttpMethod::Patch, req).await
    }

    /// DELETE convenience wrapper.
    async fn delete(&self, req: OutboundRequest) -> Result<OutboundResponse, HttpError> {
        self.execute(HttpMethod::Delete, req).await
    }
}
