// SPDX-License-Identifier: MIT OR Apache-2.0
//! `http` capability: outbound requests.

use super::{race, CapabilityEnv, CANCELLED_MSG};
use crate::value::lua_string_lossy;
use moonbox_core::{HttpMethod, OutboundRequest, OutboundResponse};
use mlua::{Lua, Table, Value as LuaValue};

/// Install the `http` global: `get|post|put|patch|delete(url, options?)`.
///
/// `options` recognizes `headers` (map), `query` (map), and `body` (string).
/// Returns `(response, nil)` with `response = {statusCode, body, headers}`,
/// or `(nil, err)` on transport failure or cancellation.
pub(crate) fn register(lua: &Lua, env: &CapabilityEnv) -> mlua::Result<()> {
    let table = lua.create_table()?;
    for method in [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ] {
        let client = env.http.clone();
        let signal = env.signal.clone();
        let entry = lua.create_async_function(
            move |lua, (url, options): (String, Option<Table>)| {
                let client = client.clone();
                let signal = signal.clone();
                async move {
                    let request = build_request(url, options.as_ref());
                    match race(&signal, client.execute(method, request)).await {
                        None => Ok((None, Some(CANCELLED_MSG.to_string()))),
                        Some(Err(err)) => Ok((None, Some(err.to_string()))),
                        Some(Ok(response)) => {
                            Ok((Some(response_table(&lua, &response)?), None))
                        }
                    }
                }
            },
        )?;
        table.set(method.as_str().to_lowercase(), entry)?;
    }
    lua.globals().set("http", table)
}

fn build_request(url: String, options: Option<&Table>) -> OutboundRequest {
    let mut request = OutboundRequest::new(url);
    let Some(options) = options else { return request };

    if let LuaValue::Table(headers) = options.raw_get::<LuaValue>("headers").unwrap_or(LuaValue::Nil)
    {
        for pair in headers.pairs::<String, String>() {
            if let Ok((key, value)) = pair {
                request.headers.insert(key, value);
            }
        }
    }
    if let LuaValue::Table(query) = options.raw_get::<LuaValue>("query").unwrap_or(LuaValue::Nil) {
        for pair in query.pairs::<String, String>() {
            if let Ok((key, value)) = pair {
                request.query.insert(key, value);
            }
        }
    }
    if let LuaValue::String(body) = options.raw_get::<LuaValue>("body").unwrap_or(LuaValue::Nil) {
        request.body = lua_string_lossy(&body);
    }
    request
}

fn response_table(lua: &Lua, response: &OutboundResponse) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    table.set("statusCode", response.status_code)?;
    table.set("body", response.body.as_str())?;
    let headers = lua.create_table()?;
    for (key, value) in &response.headers {
        headers.set(key.as_str(), value.as_str())?;
    }
    table.set("headers", headers)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use crate::capabilities::testutil::world;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_exposes_status_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-source", "fake")
                    .set_body_string("payload"),
            )
            .mount(&server)
            .await;

        let w = world();
        w.lua
            .load(format!(
                r#"
                local resp, err = http.get("{}/data")
                assert(err == nil)
                assert(resp.statusCode == 200)
                assert(resp.body == "payload")
                assert(resp.headers["x-source"] == "fake")
                "#,
                server.uri()
            ))
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn post_forwards_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .and(header("x-token", "t0"))
            .and(query_param("page", "3"))
            .and(body_string(r#"{"a":1}"#))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let w = world();
        w.lua
            .load(format!(
                r#"
                local resp, err = http.post("{}/submit", {{
                    headers = {{["x-token"] = "t0"}},
                    query = {{page = "3"}},
                    body = '{{"a":1}}',
                }})
                assert(err == nil)
                assert(resp.statusCode == 201)
                "#,
                server.uri()
            ))
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn transport_failure_is_in_band() {
        let w = world();
        w.lua
            .load(
                r#"
                local resp, err = http.get("http://127.0.0.1:1/unreachable")
                assert(resp == nil)
                assert(type(err) == "string")
                assert(string.find(err, "request failed", 1, true) ~= nil)
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn error_statuses_are_responses() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let w = world();
        w.lua
            .load(format!(
                r#"
                local resp, err = http.delete("{}/gone")
                assert(err == nil)
                assert(resp.statusCode == 404)
                "#,
                server.uri()
            ))
            .exec_async()
            .await
            .unwrap();
    }
}
