// SPDX-License-Identifier: MIT OR Apache-2.0
//! `url` capability: parsing and query escaping.

use super::CapabilityEnv;
use mlua::{Lua, Table};
use percent_encoding::percent_decode_str;
use std::collections::BTreeMap;
use url::form_urlencoded;

/// Install the `url` global: `parse(s) → (table, err?)`, `encode(s)`,
/// `decode(s) → (string, err?)`.
///
/// `encode` is a query escape (space becomes `+`); `decode` inverts it.
/// Parsed query values are strings for single-valued keys and arrays for
/// repeated keys.
pub(crate) fn register(lua: &Lua, _env: &CapabilityEnv) -> mlua::Result<()> {
    let table = lua.create_table()?;

    let parse = lua.create_function(|lua, text: String| match url::Url::parse(&text) {
        Ok(parsed) => Ok((Some(url_table(lua, &parsed)?), None)),
        Err(err) => Ok((None, Some(format!("invalid URL: {err}")))),
    })?;
    table.set("parse", parse)?;

    let encode = lua.create_function(|_lua, text: String| {
        Ok(form_urlencoded::byte_serialize(text.as_bytes()).collect::<String>())
    })?;
    table.set("encode", encode)?;

    let decode = lua.create_function(|_lua, text: String| {
        let unplussed = text.replace('+', " ");
        match percent_decode_str(&unplussed).decode_utf8() {
            Ok(decoded) => Ok((Some(decoded.into_owned()), None)),
            Err(err) => Ok((None, Some(format!("invalid URL escape: {err}")))),
        }
    })?;
    table.set("decode", decode)?;

    lua.globals().set("url", table)
}

fn url_table(lua: &Lua, parsed: &url::Url) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    table.set("scheme", parsed.scheme())?;

    let host = match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };
    table.set("host", host)?;
    table.set("path", parsed.path())?;

    if let Some(fragment) = parsed.fragment() {
        table.set("fragment", fragment)?;
    }
    if !parsed.username().is_empty() {
        table.set("username", parsed.username())?;
    }
    if let Some(password) = parsed.password() {
        table.set("password", password)?;
    }

    let mut query: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in parsed.query_pairs() {
        query.entry(key.into_owned()).or_default().push(value.into_owned());
    }
    let query_table = lua.create_table()?;
    for (key, values) in query {
        if values.len() == 1 {
            query_table.set(key, values.into_iter().next().unwrap_or_default())?;
        } else {
            query_table.set(key, values)?;
        }
    }
    table.set("query", query_table)?;

    Ok(table)
}
