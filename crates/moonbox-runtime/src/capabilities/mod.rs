// SPDX-License-Identifier: MIT OR Apache-2.0
//! Capability modules installed on every fresh interpreter.
//!
//! Each module installs a named global table whose functions close over the
//! invocation identity and the backing service handles captured at install
//! time — identity is never read from mutable ambient state. Capability
//! failures are returned in-band as `(nil, err)` and never become host
//! errors; blocking operations are raced against the invocation signal.

use crate::cancel::InvocationSignal;
use moonbox_core::{AiClient, EmailClient, EnvStore, HttpClient, KvStore, Logger};
use mlua::Lua;
use std::future::Future;
use std::sync::Arc;

mod ai;
mod base64;
mod crypto;
mod email;
mod env;
mod http;
mod json;
mod kv;
mod log;
mod random;
mod router;
mod strings;
mod time;
mod url;

/// In-band error for operations cut short by cancellation or timeout.
pub(crate) const CANCELLED_MSG: &str = "request cancelled: deadline exceeded";

/// Everything a capability closure may capture, cloned per module at install
/// time.
#[derive(Clone)]
pub(crate) struct CapabilityEnv {
    pub function_id: String,
    pub execution_id: String,
    /// Platform base URL for `router.url`; empty when unknown.
    pub base_url: String,
    pub logger: Arc<dyn Logger>,
    pub kv: Arc<dyn KvStore>,
    pub env: Arc<dyn EnvStore>,
    pub http: Arc<dyn HttpClient>,
    pub ai: Arc<dyn AiClient>,
    pub email: Arc<dyn EmailClient>,
    pub signal: InvocationSignal,
}

/// Install every capability module on `lua`.
pub(crate) fn install_all(lua: &Lua, env: &CapabilityEnv) -> mlua::Result<()> {
    log::register(lua, env)?;
    kv::register(lua, env)?;
    env::register(lua, env)?;
    http::register(lua, env)?;
    ai::register(lua, env)?;
    email::register(lua, env)?;
    json::register(lua, env)?;
    base64::register(lua, env)?;
    crypto::register(lua, env)?;
    time::register(lua, env)?;
    url::register(lua, env)?;
    strings::register(lua, env)?;
    random::register(lua, env)?;
    router::register(lua, env)?;
    Ok(())
}

/// Race a blocking capability operation against the invocation signal.
///
/// Returns `None` when the signal trips first, or when it already tripped —
/// a tripped signal means no further work starts.
pub(crate) async fn race<T>(signal: &InvocationSignal, work: impl Future<Output = T>) -> Option<T> {
    if signal.is_expired() {
        return None;
    }
    tokio::select! {
        out = work => Some(out),
        _ = signal.expired() => None,
    }
}
