// SPDX-License-Identifier: MIT OR Apache-2.0
//! moonbox-ai
//!
//! Chat providers for the `ai` capability and the tracking decorator that
//! records every call.
//!
//! Two providers are spoken natively: OpenAI (`/chat/completions`) and
//! Anthropic (`/v1/messages`). API keys are read from the calling function's
//! env namespace, never from the process environment; endpoints resolve as
//! request override > `<PROVIDER>_ENDPOINT` env var > provider default.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod anthropic;
mod client;
mod openai;
mod track;

pub use client::ProviderAiClient;
pub use track::TrackingAiClient;
