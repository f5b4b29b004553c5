// SPDX-License-Identifier: MIT OR Apache-2.0
//! Marshalling between typed host records and script tables.

use crate::value::lua_string_lossy;
use moonbox_core::{ExecutionContext, HttpEvent, HttpResponse};
use mlua::{Lua, Table, Value as LuaValue};
use std::collections::BTreeMap;

/// Build the `ctx` argument table: identity fields, optionals absent when
/// empty.
pub(crate) fn context_table(lua: &Lua, ctx: &ExecutionContext) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    table.set("executionId", ctx.execution_id.as_str())?;
    table.set("functionId", ctx.function_id.as_str())?;
    table.set("startedAt", ctx.started_at)?;
    for (key, value) in [
        ("requestId", &ctx.request_id),
        ("functionName", &ctx.function_name),
        ("version", &ctx.version),
        ("baseUrl", &ctx.base_url),
    ] {
        if let Some(value) = value {
            if !value.is_empty() {
                table.set(key, value.as_str())?;
            }
        }
    }
    Ok(table)
}

/// Build the `event` argument table from an HTTP event.
pub(crate) fn event_table(lua: &Lua, event: &HttpEvent) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    table.set("method", event.method.as_str())?;
    table.set("path", event.path.as_str())?;
    table.set("relativePath", event.relative_path.as_str())?;
    table.set("body", event.body.as_str())?;
    table.set("headers", string_map_table(lua, &event.headers)?)?;
    table.set("query", string_map_table(lua, &event.query)?)?;
    Ok(table)
}

fn string_map_table(lua: &Lua, map: &BTreeMap<String, String>) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    for (key, value) in map {
        table.set(key.as_str(), value.as_str())?;
    }
    Ok(table)
}

/// Convert a handler's returned table into an [`HttpResponse`].
///
/// Defaulting is permissive by contract: a missing or non-numeric
/// `statusCode` (or one outside `100..=599`) becomes 200, a missing `body`
/// becomes empty, a missing `headers` table becomes an empty map, and
/// `isBase64Encoded` defaults to false.
pub(crate) fn response_from_table(table: &Table) -> HttpResponse {
    let mut response = HttpResponse::default();

    match table.raw_get::<LuaValue>("statusCode").unwrap_or(LuaValue::Nil) {
        LuaValue::Integer(code) if (100..=599).contains(&code) => {
            response.status_code = code as u16;
        }
        LuaValue::Number(code) => {
            let code = code as i64;
            if (100..=599).contains(&code) {
                response.status_code = code as u16;
            }
        }
        _ => {}
    }

    if let LuaValue::String(body) = table.raw_get::<LuaValue>("body").unwrap_or(LuaValue::Nil) {
        response.body = lua_string_lossy(&body);
    }

    if let LuaValue::Table(headers) = table.raw_get::<LuaValue>("headers").unwrap_or(LuaValue::Nil) {
        for pair in headers.pairs::<LuaValue, LuaValue>() {
            let Ok((key, value)) = pair else { continue };
            let LuaValue::String(key) = key else { continue };
            let value = match value {
                LuaValue::String(s) => lua_string_lossy(&s),
                LuaValue::Integer(i) => i.to_string(),
                LuaValue::Number(n) => n.to_string(),
                LuaValue::Boolean(b) => b.to_string(),
                _ => continue,
            };
            response.headers.insert(lua_string_lossy(&key), value);
        }
    }

    if let LuaValue::Boolean(flag) =
        table.raw_get::<LuaValue>("isBase64Encoded").unwrap_or(LuaValue::Nil)
    {
        response.is_base64_encoded = flag;
    }

    response
}
