// SPDX-License-Identifier: MIT OR Apache-2.0
//! `log` capability: leveled logging into the invocation's namespace.

use super::CapabilityEnv;
use moonbox_core::LogLevel;
use mlua::Lua;

/// Install the `log` global: `log.info|debug|warn|error(message)`.
///
/// Entries are appended under the execution id so one invocation's output
/// groups together. Logging never fails observably and returns nothing.
pub(crate) fn register(lua: &Lua, env: &CapabilityEnv) -> mlua::Result<()> {
    let table = lua.create_table()?;
    for level in [LogLevel::Info, LogLevel::Debug, LogLevel::Warn, LogLevel::Error] {
        let logger = env.logger.clone();
        let namespace = env.execution_id.clone();
        let signal = env.signal.clone();
        let entry = lua.create_async_function(move |_lua, message: String| {
            let logger = logger.clone();
            let namespace = namespace.clone();
            let signal = signal.clone();
            async move {
                if !signal.is_expired() {
                    logger.log(&namespace, level, &message).await;
                }
                Ok(())
            }
        })?;
        table.set(level.as_str(), entry)?;
    }
    lua.globals().set("log", table)
}
