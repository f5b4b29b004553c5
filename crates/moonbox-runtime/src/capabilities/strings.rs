// SPDX-License-Identifier: MIT OR Apache-2.0
//! `strings` capability: text helpers beyond the Lua standard library.

use super::CapabilityEnv;
use mlua::Lua;

/// Install the `strings` global.
pub(crate) fn register(lua: &Lua, _env: &CapabilityEnv) -> mlua::Result<()> {
    let table = lua.create_table()?;

    table.set("trim", lua.create_function(|_lua, s: String| Ok(s.trim().to_string()))?)?;
    table.set(
        "trimLeft",
        lua.create_function(|_lua, s: String| Ok(s.trim_start().to_string()))?,
    )?;
    table.set(
        "trimRight",
        lua.create_function(|_lua, s: String| Ok(s.trim_end().to_string()))?,
    )?;
    table.set("toLower", lua.create_function(|_lua, s: String| Ok(s.to_lowercase()))?)?;
    table.set("toUpper", lua.create_function(|_lua, s: String| Ok(s.to_uppercase()))?)?;

    table.set(
        "hasPrefix",
        lua.create_function(|_lua, (s, prefix): (String, String)| Ok(s.starts_with(&prefix)))?,
    )?;
    table.set(
        "hasSuffix",
        lua.create_function(|_lua, (s, suffix): (String, String)| Ok(s.ends_with(&suffix)))?,
    )?;
    table.set(
        "contains",
        lua.create_function(|_lua, (s, needle): (String, String)| Ok(s.contains(&needle)))?,
    )?;

    table.set(
        "repeat",
        lua.create_function(|_lua, (s, count): (String, i64)| {
            Ok(s.repeat(count.max(0) as usize))
        })?,
    )?;

    table.set(
        "replace",
        lua.create_function(|_lua, (s, old, new, count): (String, String, String, Option<i64>)| {
            Ok(match count {
                Some(n) if n >= 0 => s.replacen(&old, &new, n as usize),
                _ => s.replace(&old, &new),
            })
        })?,
    )?;

    table.set(
        "split",
        lua.create_function(|_lua, (s, separator): (String, String)| {
            if separator.is_empty() {
                return Ok(s.chars().map(String::from).collect::<Vec<_>>());
            }
            Ok(s.split(&separator).map(String::from).collect::<Vec<_>>())
        })?,
    )?;
    table.set(
        "join",
        lua.create_function(|_lua, (parts, separator): (Vec<String>, String)| {
            Ok(parts.join(&separator))
        })?,
    )?;

    lua.globals().set("strings", table)
}
