// SPDX-License-Identifier: MIT OR Apache-2.0
//! `router` capability: pattern matching scoped to the current function.

use super::CapabilityEnv;
use crate::router;
use mlua::{Lua, Table};
use std::collections::BTreeMap;

fn params_map(params: Option<&Table>) -> BTreeMap<String, String> {
    let Some(params) = params else { return BTreeMap::new() };
    params.pairs::<String, String>().filter_map(|pair| pair.ok()).collect()
}

/// Install the `router` global: `match(path, pattern)`, `params(path,
/// pattern)`, `path(pattern, params?)`, `url(pattern, params?)`.
///
/// Built paths are mounted under `/fn/<functionId>`; `url` prefixes the
/// platform base URL.
pub(crate) fn register(lua: &Lua, env: &CapabilityEnv) -> mlua::Result<()> {
    let table = lua.create_table()?;

    table.set(
        "match",
        lua.create_function(|_lua, (path, pattern): (String, String)| {
            Ok(router::matches(&path, &pattern))
        })?,
    )?;

    table.set(
        "params",
        lua.create_function(|lua, (path, pattern): (String, String)| {
            let params = router::params(&path, &pattern);
            let out = lua.create_table()?;
            for (name, value) in params {
                out.set(name, value)?;
            }
            Ok(out)
        })?,
    )?;

    {
        let function_id = env.function_id.clone();
        table.set(
            "path",
            lua.create_function(move |_lua, (pattern, params): (String, Option<Table>)| {
                Ok(router::build_path(&function_id, &pattern, &params_map(params.as_ref())))
            })?,
        )?;
    }

    {
        let function_id = env.function_id.clone();
        let base_url = env.base_url.clone();
        table.set(
            "url",
            lua.create_function(move |_lua, (pattern, params): (String, Option<Table>)| {
                Ok(router::build_url(
                    &base_url,
                    &function_id,
                    &pattern,
                    &params_map(params.as_ref()),
                ))
            })?,
        )?;
    }

    lua.globals().set("router", table)
}
