// SPDX-License-Identifier: MIT OR Apache-2.0
//! `json` capability: encode/decode through the value bridge.

use super::CapabilityEnv;
use crate::value::{json_to_lua, lua_to_json};
use mlua::{Lua, Value as LuaValue};

/// Install the `json` global: `encode(value) → (string, err?)`,
/// `decode(string) → (value, err?)`.
pub(crate) fn register(lua: &Lua, _env: &CapabilityEnv) -> mlua::Result<()> {
    let table = lua.create_table()?;

    let encode = lua.create_function(|_lua, value: LuaValue| {
        match lua_to_json(&value) {
            Ok(json) => match serde_json::to_string(&json) {
                Ok(text) => Ok((Some(text), None)),
                Err(err) => Ok((None, Some(format!("failed to encode JSON: {err}")))),
            },
            Err(err) => Ok((None, Some(err.to_string()))),
        }
    })?;
    table.set("encode", encode)?;

    let decode = lua.create_function(|lua, text: String| {
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => Ok((Some(json_to_lua(lua, &value)?), None)),
            Err(err) => Ok((None, Some(format!("invalid JSON: {err}")))),
        }
    })?;
    table.set("decode", decode)?;

    lua.globals().set("json", table)
}

#[cfg(test)]
mod tests {
    use crate::capabilities::testutil::world;

    #[tokio::test]
    async fn encode_decode_roundtrip() {
        let w = world();
        w.lua
            .load(
                r#"
                local text, err = json.encode({name = "moon", tags = {"a", "b"}, depth = 2})
                assert(err == nil)
                local back, err = json.decode(text)
                assert(err == nil)
                assert(back.name == "moon")
                assert(back.tags[1] == "a")
                assert(back.tags[2] == "b")
                assert(back.depth == 2)
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn decode_failure_is_in_band() {
        let w = world();
        w.lua
            .load(
                r#"
                local value, err = json.decode("{not json")
                assert(value == nil)
                assert(string.find(err, "invalid JSON", 1, true) ~= nil)
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn encode_rejects_cycles() {
        let w = world();
        w.lua
            .load(
                r#"
                local t = {}
                t.me = t
                local text, err = json.encode(t)
                assert(text == nil)
                assert(string.find(err, "recursive", 1, true) ~= nil)
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn numbers_encode_as_floats() {
        // Script numbers always materialize as floats on the host side, so
        // an integral count renders with a decimal point.
        let w = world();
        w.lua
            .load(
                r#"
                local text = json.encode({count = 200})
                assert(text == '{"count":200.0}')
                local back = json.decode(text)
                assert(back.count == 200)
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }
}
