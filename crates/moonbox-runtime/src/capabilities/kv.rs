// SPDX-License-Identifier: MIT OR Apache-2.0
//! `kv` capability: per-function key-value storage.

use super::CapabilityEnv;
use crate::cancel::InvocationSignal;
use moonbox_core::KvStore;
use mlua::Lua;
use std::sync::Arc;

/// Install the `kv` global: `get(k) → string|nil`, `set(k, v) → bool`,
/// `delete(k) → bool`.
///
/// Returns are the only error channel: nil / false signal failure.
pub(crate) fn register(lua: &Lua, env: &CapabilityEnv) -> mlua::Result<()> {
    register_store(lua, "kv", env.kv.clone(), env.function_id.clone(), env.signal.clone())
}

/// Shared installer for kv-shaped stores; the `env` capability reuses it.
pub(crate) fn register_store<S>(
    lua: &Lua,
    name: &str,
    store: Arc<S>,
    function_id: String,
    signal: InvocationSignal,
) -> mlua::Result<()>
where
    S: KvStore + ?Sized + 'static,
{
    let table = lua.create_table()?;

    {
        let store = store.clone();
        let function_id = function_id.clone();
        let signal = signal.clone();
        let get = lua.create_async_function(move |_lua, key: String| {
            let store = store.clone();
            let function_id = function_id.clone();
            let signal = signal.clone();
            async move {
                if signal.is_expired() {
                    return Ok(None);
                }
                Ok(store.get(&function_id, &key).await.ok())
            }
        })?;
        table.set("get", get)?;
    }

    {
        let store = store.clone();
        let function_id = function_id.clone();
        let signal = signal.clone();
        let set = lua.create_async_function(move |_lua, (key, value): (String, String)| {
            let store = store.clone();
            let function_id = function_id.clone();
            let signal = signal.clone();
            async move {
                if signal.is_expired() {
                    return Ok(false);
                }
                Ok(store.set(&function_id, &key, &value).await.is_ok())
            }
        })?;
        table.set("set", set)?;
    }

    {
        let delete = lua.create_async_function(move |_lua, key: String| {
            let store = store.clone();
            let function_id = function_id.clone();
            let signal = signal.clone();
            async move {
                if signal.is_expired() {
                    return Ok(false);
                }
                Ok(store.delete(&function_id, &key).await.is_ok())
            }
        })?;
        table.set("delete", delete)?;
    }

    lua.globals().set(name, table)
}
