// SPDX-License-Identifier: MIT OR Apache-2.0
//! `email` capability: outbound mail.

use super::{race, CapabilityEnv, CANCELLED_MSG};
use crate::value::lua_string_lossy;
use chrono::{DateTime, SecondsFormat};
use moonbox_core::EmailRequest;
use mlua::{Lua, Table, Value as LuaValue};

/// Install the `email` global: `email.send(options) → ({id}, nil) | (nil, err)`.
///
/// Required: `from`, `to` (string or table of strings), `subject`, and at
/// least one of `text`/`html`. Optional: `reply_to`, `cc`, `bcc`, `headers`,
/// `tags`, `scheduled_at` (epoch number converted to ISO 8601, or an
/// ISO 8601 string passed through).
pub(crate) fn register(lua: &Lua, env: &CapabilityEnv) -> mlua::Result<()> {
    let table = lua.create_table()?;
    let client = env.email.clone();
    let function_id = env.function_id.clone();
    let signal = env.signal.clone();
    let send = lua.create_async_function(move |lua, options: Table| {
        let client = client.clone();
        let function_id = function_id.clone();
        let signal = signal.clone();
        async move {
            let request = match parse_email_options(&options) {
                Ok(request) => request,
                Err(message) => return Ok((None, Some(message))),
            };
            match race(&signal, client.send(&function_id, request)).await {
                None => Ok((None, Some(CANCELLED_MSG.to_string()))),
                Some(Err(err)) => Ok((None, Some(err.to_string()))),
                Some(Ok(id)) => {
                    let result = lua.create_table()?;
                    result.set("id", id)?;
                    Ok((Some(result), None))
                }
            }
        }
    })?;
    table.set("send", send)?;
    lua.globals().set("email", table)
}

fn get_string(options: &Table, key: &str) -> Option<String> {
    match options.raw_get::<LuaValue>(key).unwrap_or(LuaValue::Nil) {
        LuaValue::String(s) => {
            let s = lua_string_lossy(&s);
            (!s.is_empty()).then_some(s)
        }
        _ => None,
    }
}

fn string_list(table: &Table) -> Vec<String> {
    table
        .sequence_values::<String>()
        .filter_map(|value| value.ok())
        .collect()
}

fn string_map(table: &Table) -> std::collections::BTreeMap<String, String> {
    table
        .pairs::<String, String>()
        .filter_map(|pair| pair.ok())
        .collect()
}

fn parse_email_options(options: &Table) -> Result<EmailRequest, String> {
    let from = get_string(options, "from").ok_or("from is required")?;

    let to = match options.raw_get::<LuaValue>("to").unwrap_or(LuaValue::Nil) {
        LuaValue::Nil => return Err("to is required".into()),
        LuaValue::String(s) => {
            let s = lua_string_lossy(&s);
            if s.is_empty() {
                return Err("to is required".into());
            }
            vec![s]
        }
        LuaValue::Table(list) => {
            let recipients = string_list(&list);
            if recipients.is_empty() {
                return Err("to cannot be empty".into());
            }
            recipients
        }
        _ => return Err("to must be a string or table".into()),
    };

    let subject = get_string(options, "subject").ok_or("subject is required")?;

    let text = get_string(options, "text");
    let html = get_string(options, "html");
    if text.is_none() && html.is_none() {
        return Err("either text or html content is required".into());
    }

    let scheduled_at = match options.raw_get::<LuaValue>("scheduled_at").unwrap_or(LuaValue::Nil) {
        LuaValue::Integer(epoch) => Some(epoch_to_iso(epoch)?),
        LuaValue::Number(epoch) => Some(epoch_to_iso(epoch as i64)?),
        LuaValue::String(s) => Some(lua_string_lossy(&s)),
        _ => None,
    };

    let mut request = EmailRequest {
        from,
        to,
        subject,
        text,
        html,
        reply_to: get_string(options, "reply_to"),
        scheduled_at,
        ..EmailRequest::default()
    };
    if let LuaValue::Table(cc) = options.raw_get::<LuaValue>("cc").unwrap_or(LuaValue::Nil) {
        request.cc = string_list(&cc);
    }
    if let LuaValue::Table(bcc) = options.raw_get::<LuaValue>("bcc").unwrap_or(LuaValue::Nil) {
        request.bcc = string_list(&bcc);
    }
    if let LuaValue::Table(headers) = options.raw_get::<LuaValue>("headers").unwrap_or(LuaValue::Nil)
    {
        request.headers = string_map(&headers);
    }
    if let LuaValue::Table(tags) = options.raw_get::<LuaValue>("tags").unwrap_or(LuaValue::Nil) {
        request.tags = string_map(&tags);
    }
    Ok(request)
}

fn epoch_to_iso(epoch: i64) -> Result<String, String> {
    DateTime::from_timestamp(epoch, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .ok_or_else(|| "scheduled_at is out of range".into())
}
