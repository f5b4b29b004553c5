// SPDX-License-Identifier: MIT OR Apache-2.0
//! `time` capability: clock, formatting, parsing, and cancellable sleep.
//!
//! Layouts use chrono's strftime grammar, e.g. `%Y-%m-%d %H:%M:%S`.

use super::{race, CapabilityEnv};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use mlua::Lua;
use std::fmt::Write as _;
use std::time::Duration;

/// Install the `time` global: `now() → seconds`, `format(ts, layout)`,
/// `parse(s, layout) → (ts, err?)`, `sleep(ms) → bool`.
pub(crate) fn register(lua: &Lua, env: &CapabilityEnv) -> mlua::Result<()> {
    let table = lua.create_table()?;

    table.set(
        "now",
        lua.create_function(|_lua, ()| Ok(Utc::now().timestamp_millis() as f64 / 1000.0))?,
    )?;

    table.set(
        "format",
        lua.create_function(|_lua, (timestamp, layout): (f64, String)| {
            let seconds = timestamp.floor() as i64;
            let nanos = ((timestamp - timestamp.floor()) * 1e9) as u32;
            let moment = DateTime::from_timestamp(seconds, nanos).unwrap_or(DateTime::UNIX_EPOCH);
            let mut out = String::new();
            if write!(out, "{}", moment.format(&layout)).is_err() {
                // An invalid layout renders as itself rather than failing.
                out = layout;
            }
            Ok(out)
        })?,
    )?;

    table.set(
        "parse",
        lua.create_function(|_lua, (text, layout): (String, String)| {
            Ok(match parse_timestamp(&text, &layout) {
                Some(seconds) => (Some(seconds), None),
                None => (None, Some(format!("cannot parse {text:?} with layout {layout:?}"))),
            })
        })?,
    )?;

    {
        let signal = env.signal.clone();
        let sleep = lua.create_async_function(move |_lua, millis: f64| {
            let signal = signal.clone();
            async move {
                let duration = Duration::from_millis(millis.max(0.0) as u64);
                Ok(race(&signal, tokio::time::sleep(duration)).await.is_some())
            }
        })?;
        table.set("sleep", sleep)?;
    }

    lua.globals().set("time", table)
}

fn parse_timestamp(text: &str, layout: &str) -> Option<f64> {
    if let Ok(moment) = DateTime::parse_from_str(text, layout) {
        return Some(moment.timestamp() as f64);
    }
    if let Ok(moment) = NaiveDateTime::parse_from_str(text, layout) {
        return Some(moment.and_utc().timestamp() as f64);
    }
    if let Ok(day) = NaiveDate::parse_from_str(text, layout) {
        return Some(day.and_hms_opt(0, 0, 0)?.and_utc().timestamp() as f64);
    }
    None
}
