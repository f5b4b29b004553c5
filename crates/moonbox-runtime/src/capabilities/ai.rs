// SPDX-License-Identifier: MIT OR Apache-2.0
//! `ai` capability: provider-backed chat.

use super::{race, CapabilityEnv, CANCELLED_MSG};
use crate::value::lua_string_lossy;
use moonbox_core::{ChatRequest, ChatResponse, Message};
use mlua::{Lua, Table, Value as LuaValue};

const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Install the `ai` global: `ai.chat(options) → (response, err)`.
///
/// Required options: `provider`, `model`, `messages` (non-empty table of
/// `{role, content}`). Optional: `max_tokens` (default 1024), `temperature`
/// (default 0), `endpoint` override. Validation and provider errors are
/// returned in-band.
pub(crate) fn register(lua: &Lua, env: &CapabilityEnv) -> mlua::Result<()> {
    let table = lua.create_table()?;
    let client = env.ai.clone();
    let function_id = env.function_id.clone();
    let signal = env.signal.clone();
    let chat = lua.create_async_function(move |lua, options: Table| {
        let client = client.clone();
        let function_id = function_id.clone();
        let signal = signal.clone();
        async move {
            let request = match parse_chat_options(&options) {
                Ok(request) => request,
                Err(message) => return Ok((None, Some(message))),
            };
            match race(&signal, client.chat(&function_id, request)).await {
                None => Ok((None, Some(CANCELLED_MSG.to_string()))),
                Some(Err(err)) => Ok((None, Some(err.message))),
                Some(Ok(response)) => Ok((Some(response_table(&lua, &response)?), None)),
            }
        }
    })?;
    table.set("chat", chat)?;
    lua.globals().set("ai", table)
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

fn parse_chat_options(options: &Table) -> Result<ChatRequest, String> {
    let provider = get_string(options, "provider").ok_or("provider is required")?;
    let model = get_string(options, "model").ok_or("model is required")?;

    let messages_table = match options.raw_get::<LuaValue>("messages").unwrap_or(LuaValue::Nil) {
        LuaValue::Table(table) => table,
        _ => return Err("messages is required".into()),
    };
    let mut messages = Vec::new();
    for value in messages_table.sequence_values::<Table>() {
        let Ok(entry) = value else { continue };
        messages.push(Message {
            role: get_string(&entry, "role").unwrap_or_default(),
            content: get_string(&entry, "content").unwrap_or_default(),
        });
    }
    if messages.is_empty() {
        return Err("messages cannot be empty".into());
    }

    let max_tokens = match options.raw_get::<LuaValue>("max_tokens").unwrap_or(LuaValue::Nil) {
        LuaValue::Integer(n) if n > 0 => n as u32,
        LuaValue::Number(n) if n > 0.0 => n as u32,
        _ => DEFAULT_MAX_TOKENS,
    };
    let temperature = match options.raw_get::<LuaValue>("temperature").unwrap_or(LuaValue::Nil) {
        LuaValue::Integer(n) => n as f64,
        LuaValue::Number(n) => n,
        _ => 0.0,
    };

    Ok(ChatRequest {
        provider,
        model,
        messages,
        max_tokens,
        temperature,
        endpoint: get_string(options, "endpoint"),
    })
}

fn response_table(lua: &Lua, response: &ChatResponse) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    table.set("content", response.content.as_str())?;
    table.set("model", response.model.as_str())?;
    let usage = lua.create_table()?;
    usage.set("input_tokens", response.usage.input_tokens)?;
    usage.set("output_tokens", response.usage.output_tokens)?;
    table.set("usage", usage)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use crate::capabilities::testutil::world;

    #[tokio::test]
    async fn chat_returns_content_and_usage() {
        let w = world();
        w.lua
            .load(
                r#"
                local resp, err = ai.chat({
                    provider = "openai",
                    model = "gpt-4o-mini",
                    messages = {{role = "user", content = "Hi"}},
                })
                assert(err == nil)
                assert(resp.content == "echo: Hi")
                assert(resp.model == "gpt-4o-mini")
                assert(resp.usage.input_tokens == 3)
                assert(resp.usage.output_tokens == 5)
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn validation_errors_are_in_band() {
        let w = world();
        w.lua
            .load(
                r#"
                local _, err = ai.chat({model = "m", messages = {{role = "user", content = "x"}}})
                assert(err == "provider is required")

                local _, err = ai.chat({provider = "openai", messages = {{role = "user", content = "x"}}})
                assert(err == "model is required")

                local _, err = ai.chat({provider = "openai", model = "m"})
                assert(err == "messages is required")

                local _, err = ai.chat({provider = "openai", model = "m", messages = {}})
                assert(err == "messages cannot be empty")
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }
}
