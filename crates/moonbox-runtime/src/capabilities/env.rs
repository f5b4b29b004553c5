// SPDX-License-Identifier: MIT OR Apache-2.0
//! `env` capability: per-function environment variables.

use super::kv::register_store;
use super::CapabilityEnv;
use mlua::Lua;

/// Install the `env` global. Same surface as `kv`, backed by the env store
/// where API keys live.
pub(crate) fn register(lua: &Lua, env: &CapabilityEnv) -> mlua::Result<()> {
    register_store(lua, "env", env.env.clone(), env.function_id.clone(), env.signal.clone())
}
