// SPDX-License-Identifier: MIT OR Apache-2.0
//! Two-way bridge between host dynamic values and Lua values.
//!
//! The host side is [`serde_json::Value`]. Tables are polymorphic: a table
//! whose keys are exactly the integers `1..=N` is an array; anything else is
//! a string-keyed object and non-string keys are dropped. Numbers always
//! materialize as floating-point on the host side, whichever internal
//! representation Lua picked. The round trip [`json_to_lua`] →
//! [`lua_to_json`] is identity for trees of representable values — arrays
//! stay arrays, objects stay objects.

use mlua::{Lua, Table, Value as LuaValue};
use serde_json::{Map, Number, Value as JsonValue};
use thiserror::Error;

/// Conversion failures from the Lua side.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// The table graph contains a cycle and cannot become JSON.
    #[error("cannot encode recursive table")]
    RecursiveTable,
}

/// Convert a host value into a Lua value.
pub fn json_to_lua(lua: &Lua, value: &JsonValue) -> mlua::Result<LuaValue> {
    match value {
        JsonValue::Null => Ok(LuaValue::Nil),
        JsonValue::Bool(b) => Ok(LuaValue::Boolean(*b)),
        JsonValue::Number(n) => Ok(LuaValue::Number(n.as_f64().unwrap_or(0.0))),
        JsonValue::String(s) => Ok(LuaValue::String(lua.create_string(s)?)),
        JsonValue::Array(items) => {
            let table = lua.create_table()?;
            for (index, item) in items.iter().enumerate() {
                table.raw_set(index + 1, json_to_lua(lua, item)?)?;
            }
            Ok(LuaValue::Table(table))
        }
        JsonValue::Object(map) => {
            let table = lua.create_table()?;
            for (key, item) in map {
                table.raw_set(key.as_str(), json_to_lua(lua, item)?)?;
            }
            Ok(LuaValue::Table(table))
        }
    }
}

/// Convert a Lua value into a host value.
///
/// Numbers always come back as floats, Lua's integer subtype included;
/// non-finite floats, functions, userdata, and threads map to null. Cycles
/// are detected along the ancestor chain and rejected.
pub fn lua_to_json(value: &LuaValue) -> Result<JsonValue, BridgeError> {
    let mut ancestors = Vec::new();
    convert(value, &mut ancestors)
}

fn convert(
    value: &LuaValue,
    ancestors: &mut Vec<*const std::ffi::c_void>,
) -> Result<JsonValue, BridgeError> {
    match value {
        LuaValue::Nil => Ok(JsonValue::Null),
        LuaValue::Boolean(b) => Ok(JsonValue::Bool(*b)),
        LuaValue::Integer(i) => {
            Ok(Number::from_f64(*i as f64).map_or(JsonValue::Null, JsonValue::Number))
        }
        LuaValue::Number(n) => Ok(Number::from_f64(*n).map_or(JsonValue::Null, JsonValue::Number)),
        LuaValue::String(s) => Ok(JsonValue::String(lua_string_lossy(s))),
        LuaValue::Table(table) => {
            let pointer = table.to_pointer();
            if ancestors.contains(&pointer) {
                return Err(BridgeError::RecursiveTable);
            }
            ancestors.push(pointer);
            let result = convert_table(table, ancestors);
            ancestors.pop();
            result
        }
        _ => Ok(JsonValue::Null),
    }
}

fn convert_table(
    table: &Table,
    ancestors: &mut Vec<*const std::ffi::c_void>,
) -> Result<JsonValue, BridgeError> {
    let mut entries = Vec::new();
    let mut array_shaped = true;
    let mut max_index = 0i64;
    for pair in table.pairs::<LuaValue, LuaValue>() {
        let Ok((key, value)) = pair else { continue };
        match &key {
            LuaValue::Integer(i) if *i >= 1 => max_index = max_index.max(*i),
            _ => array_shaped = false,
        }
        entries.push((key, value));
    }

    // Empty tables decode as objects; header maps and params dominate here.
    if entries.is_empty() {
        return Ok(JsonValue::Object(Map::new()));
    }

    if array_shaped && max_index == entries.len() as i64 {
        entries.sort_by_key(|(key, _)| match key {
            LuaValue::Integer(i) => *i,
            _ => i64::MAX,
        });
        let mut items = Vec::with_capacity(entries.len());
        for (_, value) in &entries {
            items.push(convert(value, ancestors)?);
        }
        return Ok(JsonValue::Array(items));
    }

    let mut map = Map::new();
    for (key, value) in &entries {
        if let LuaValue::String(key) = key {
            map.insert(lua_string_lossy(key), convert(value, ancestors)?);
        }
        // Non-string keys in object-shaped tables are dropped.
    }
    Ok(JsonValue::Object(map))
}

/// Decode a Lua string, replacing invalid UTF-8.
pub(crate) fn lua_string_lossy(s: &mlua::String) -> String {
    String::from_utf8_lossy(&s.as_bytes()).into_owned()
}
