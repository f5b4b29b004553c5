// SPDX-License-Identifier: MIT OR Apache-2.0
//! moonbox-runtime
//!
//! The sandboxed execution core. [`run`] takes a Lua source string, an HTTP
//! event, and a per-function identity; it creates a fresh interpreter,
//! installs the capability modules bound to that identity, dispatches the
//! event to the script's `handler(ctx, event)` under a bounded time budget,
//! and converts the returned table into an [`HttpResponse`]. Every failure
//! comes back as a single source-annotated [`ExecutionError`].
//!
//! Interpreters are never reused across invocations; globals cannot leak
//! between calls. Cancellation reaches both blocking capability calls and
//! tight script loops (through an instruction hook).

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Cancellation tokens and the per-invocation signal.
pub mod cancel;
/// Failure taxonomy of an invocation.
pub mod error;
/// Path pattern matching and URL building.
pub mod router;
/// Host ↔ Lua value bridge.
pub mod value;

mod capabilities;
mod event;

use crate::cancel::{CancellationToken, InvocationSignal};
use crate::capabilities::CapabilityEnv;
pub use crate::error::{ErrorKind, ExecutionError};
use moonbox_ai::TrackingAiClient;
use moonbox_core::{
    AiClient, AiTracker, EmailClient, EnvStore, ExecutionContext, HttpClient, HttpEvent,
    HttpResponse, KvStore, Logger,
};
use moonbox_error::enrich;
use mlua::{HookTriggers, Lua, Value as LuaValue, VmState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-invocation wall-clock budget when the caller does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// How many VM instructions run between cancellation checks. Small enough
/// that a tight loop is interrupted within a fraction of a second of the
/// deadline.
const INSTRUCTION_CHECK_INTERVAL: u32 = 4096;

/// The service handles one invocation runs against.
///
/// Shared across invocations; every handle must be safe for concurrent use.
#[derive(Clone)]
pub struct Dependencies {
    /// Sink for script log output.
    pub logger: Arc<dyn Logger>,
    /// Per-function key-value store.
    pub kv: Arc<dyn KvStore>,
    /// Per-function environment store (API keys live here).
    pub env: Arc<dyn EnvStore>,
    /// Outbound HTTP transport.
    pub http: Arc<dyn HttpClient>,
    /// Chat provider client.
    pub ai: Arc<dyn AiClient>,
    /// Outbound email transport.
    pub email: Arc<dyn EmailClient>,
    /// Optional sink for per-execution chat records.
    pub tracker: Option<Arc<dyn AiTracker>>,
    /// Per-invocation wall-clock budget; [`DEFAULT_TIMEOUT`] when absent.
    pub timeout: Option<Duration>,
}

/// The event that triggered an invocation.
#[derive(Debug, Clone)]
pub enum Event {
    /// An inbound HTTP request.
    Http(HttpEvent),
}

/// One invocation: identity, trigger, and resolved source.
#[derive(Debug, Clone)]
pub struct Request {
    /// Per-invocation identity.
    pub ctx: ExecutionContext,
    /// Triggering event.
    pub event: Event,
    /// Resolved Lua source of the deployed function version.
    pub code: String,
}

/// Execute one invocation.
///
/// The effective deadline is the minimum of the caller token's deadline and
/// `deps.timeout` (default five minutes). The token, the derived signal, and
/// the interpreter all die with this call regardless of outcome.
pub async fn run(
    cancel: CancellationToken,
    deps: &Dependencies,
    req: Request,
) -> Result<HttpResponse, ExecutionError> {
    let timeout = deps.timeout.unwrap_or(DEFAULT_TIMEOUT);
    let signal = InvocationSignal::derive(&cancel, timeout);

    debug!(
        execution_id = %req.ctx.execution_id,
        function_id = %req.ctx.function_id,
        timeout_ms = timeout.as_millis() as u64,
        "starting invocation"
    );

    let lua = Lua::new();
    {
        let hook_signal = signal.clone();
        lua.set_hook(
            HookTriggers::new().every_nth_instruction(INSTRUCTION_CHECK_INTERVAL),
            move |_lua, _debug| {
                if hook_signal.is_expired() {
                    return Err(mlua::Error::RuntimeError("execution deadline exceeded".into()));
                }
                Ok(VmState::Continue)
            },
        );
    }

    // The tracking decorator is bound to this execution id; with no tracker
    // attached it is transparent.
    let ai: Arc<dyn AiClient> = Arc::new(TrackingAiClient::new(
        deps.ai.clone(),
        deps.tracker.clone(),
        req.ctx.execution_id.clone(),
    ));
    let capability_env = CapabilityEnv {
        function_id: req.ctx.function_id.clone(),
        execution_id: req.ctx.execution_id.clone(),
        base_url: req.ctx.base_url.clone().unwrap_or_default(),
        logger: deps.logger.clone(),
        kv: deps.kv.clone(),
        env: deps.env.clone(),
        http: deps.http.clone(),
        ai,
        email: deps.email.clone(),
        signal: signal.clone(),
    };
    capabilities::install_all(&lua, &capability_env)
        .map_err(|e| ExecutionError::Runtime(enrich(&e.to_string(), &req.code)))?;

    if let Err(e) = lua.load(&req.code).set_name("handler").exec_async().await {
        let raw = format!("failed to load Lua code: {e}");
        warn!(execution_id = %req.ctx.execution_id, "load failed");
        return Err(ExecutionError::Load(enrich(&raw, &req.code)));
    }

    let handler = match lua.globals().get::<LuaValue>("handler") {
        Ok(LuaValue::Function(handler)) => handler,
        _ => {
            return Err(ExecutionError::MissingHandler(enrich(
                "handler function not found in Lua code",
                &req.code,
            )));
        }
    };

    let Event::Http(http_event) = &req.event;
    let ctx_table = event::context_table(&lua, &req.ctx)
        .map_err(|e| ExecutionError::Runtime(enrich(&e.to_string(), &req.code)))?;
    let event_table = event::event_table(&lua, http_event)
        .map_err(|e| ExecutionError::Runtime(enrich(&e.to_string(), &req.code)))?;

    let returned: LuaValue = match handler.call_async((ctx_table, event_table)).await {
        Ok(value) => value,
        Err(e) => {
            let raw = format!("failed to execute handler: {e}");
            warn!(execution_id = %req.ctx.execution_id, "handler failed");
            return Err(ExecutionError::Runtime(enrich(&raw, &req.code)));
        }
    };

    match returned {
        LuaValue::Table(table) => {
            let response = event::response_from_table(&table);
            debug!(
                execution_id = %req.ctx.execution_id,
                status = response.status_code,
                "invocation finished"
            );
            Ok(response)
        }
        _ => Err(ExecutionError::BadReturn(enrich("handler did not return a table", &req.code))),
    }
}
