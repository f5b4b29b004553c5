// SPDX-License-Identifier: MIT OR Apache-2.0
//! moonbox-http
//!
//! The [`reqwest`]-backed implementation of the runtime's outbound
//! [`HttpClient`] contract. One shared connection pool serves every
//! invocation; per-request state (headers, query, body) comes entirely from
//! the request record.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use moonbox_core::{HttpClient, HttpError, HttpMethod, OutboundRequest, OutboundResponse};
use std::collections::BTreeMap;
use tracing::debug;

/// Outbound HTTP transport over a shared [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    inner: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Client with reqwest's default pool settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Client over a caller-configured [`reqwest::Client`] (custom timeouts,
    /// proxies, TLS roots).
    pub fn with_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(
        &self,
        method: HttpMethod,
        req: OutboundRequest,
    ) -> Result<OutboundResponse, HttpError> {
        debug!(method = %method, url = %req.url, "outbound request");

        let mut builder = self.inner.request(to_reqwest_method(method), &req.url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        for (name, value) in &req.headers {
            builder = builder.header(name, value);
        }
        if !req.body.is_empty() {
            builder = builder.body(req.body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HttpError(format!("request failed: {e}")))?;

        let status_code = response.status().as_u16();
        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }
        let body = response
            .text()
            .await
            .map_err(|e| HttpError(format!("failed to read response body: {e}")))?;

        Ok(OutboundResponse { status_code, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_returns_status_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hello"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-test", "yes")
                    .set_body_string("hi"),
            )
            .mount(&server)
            .await;

        let client = ReqwestHttpClient::new();
        let resp = client
            .get(OutboundRequest::new(format!("{}/hello", server.uri())))
            .await
            .unwrap();
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.body, "hi");
        assert_eq!(resp.headers.get("x-test").map(String::as_str), Some("yes"));
        assert!(resp.is_success());
    }

    #[tokio::test]
    async fn post_sends_headers_query_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .and(query_param("page", "2"))
            .and(header("x-api-key", "secret"))
            .and(body_string("payload"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let client = ReqwestHttpClient::new();
        let mut req = OutboundRequest::new(format!("{}/submit", server.uri()));
        req.headers.insert("x-api-key".into(), "secret".into());
        req.query.insert("page".into(), "2".into());
        req.body = "payload".into();

        let resp = client.post(req).await.unwrap();
        assert_eq!(resp.status_code, 201);
    }

    #[tokio::test]
    async fn error_statuses_are_responses_not_errors() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let client = ReqwestHttpClient::new();
        let resp = client
            .delete(OutboundRequest::new(format!("{}/gone", server.uri())))
            .await
            .unwrap();
        assert_eq!(resp.status_code, 404);
        assert!(resp.is_error());
        assert_eq!(resp.body, "missing");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let client = ReqwestHttpClient::new();
        let err = client
            .get(OutboundRequest::new("http://127.0.0.1:1/nothing"))
            .await
            .unwrap_err();
        assert!(err.0.starts_with("request failed:"));
    }
}
