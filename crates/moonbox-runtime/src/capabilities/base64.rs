// SPDX-License-Identifier: MIT OR Apache-2.0
//! `base64` capability: standard padded alphabet.

use super::CapabilityEnv;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use mlua::Lua;

/// Install the `base64` global: `encode(s) → string`,
/// `decode(s) → (string, err?)`.
pub(crate) fn register(lua: &Lua, _env: &CapabilityEnv) -> mlua::Result<()> {
    let table = lua.create_table()?;

    let encode = lua.create_function(|_lua, input: mlua::String| {
        let data = input.as_bytes();
        Ok(STANDARD.encode(&*data))
    })?;
    table.set("encode", encode)?;

    let decode = lua.create_function(|lua, input: String| match STANDARD.decode(&input) {
        Ok(bytes) => Ok((Some(lua.create_string(&bytes)?), None)),
        Err(err) => Ok((None, Some(format!("invalid base64: {err}")))),
    })?;
    table.set("decode", decode)?;

    lua.globals().set("base64", table)
}
