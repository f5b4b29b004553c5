// SPDX-License-Identifier: MIT OR Apache-2.0
//! moonbox-core
//!
//! The stable contract for the Moonbox function runtime: the data model
//! shared between the sandbox and its collaborators, the service traits the
//! orchestrator consumes, and in-memory reference implementations of the
//! per-function stores.
//!
//! If you only take one dependency, take this one.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Chat payloads, AI client/tracker contracts.
pub mod chat;
/// Per-invocation identity and HTTP event/response records.
pub mod context;
/// Email payloads and the email client contract.
pub mod email;
/// Outbound HTTP request/response records and the client contract.
pub mod http;
/// Log levels, entries, and the logger contract.
pub mod log;
/// In-memory reference implementations of the service contracts.
pub mod memory;
/// Key-value and environment store contracts.
pub mod store;

pub use chat::{AiClient, AiError, AiTracker, ChatRequest, ChatResponse, Message, TrackRecord, TrackStatus, Usage};
pub use context::{ExecutionContext, HttpEvent, HttpResponse};
pub use email::{EmailClient, EmailError, EmailRequest};
pub use http::{HttpClient, HttpError, HttpMethod, OutboundRequest, OutboundResponse};
pub use log::{LogEntry, LogLevel, Logger};
pub use store::{EnvStore, KvStore, StoreError};
