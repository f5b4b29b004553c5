// SPDX-License-Identifier: MIT OR Apache-2.0
//! `random` capability: cryptographic randomness with a silent fallback.

use super::CapabilityEnv;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use mlua::Lua;
use rand::rngs::OsRng;
use rand::RngCore;

const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Fill from the OS source, falling back to the thread generator if the OS
/// source fails. The degradation is not surfaced; the call never fails.
fn fill_secure(buf: &mut [u8]) {
    if OsRng.try_fill_bytes(buf).is_err() {
        rand::thread_rng().fill_bytes(buf);
    }
}

fn secure_u64() -> u64 {
    let mut buf = [0u8; 8];
    fill_secure(&mut buf);
    u64::from_be_bytes(buf)
}

fn secure_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    fill_secure(&mut buf);
    buf
}

fn positive_len(n: i64, what: &str) -> mlua::Result<usize> {
    if n <= 0 {
        return Err(mlua::Error::RuntimeError(format!("{what} must be a positive number")));
    }
    Ok(n as usize)
}

/// Install the `random` global: `int(min, max)` inclusive, `float() → [0,1)`,
/// `string(n)`, `bytes(n) → base64`, `hex(n) → 2n hex chars`, `id() → 20-char
/// sortable id`.
pub(crate) fn register(lua: &Lua, _env: &CapabilityEnv) -> mlua::Result<()> {
    let table = lua.create_table()?;

    table.set(
        "int",
        lua.create_function(|_lua, (min, max): (i64, i64)| {
            if min > max {
                return Err(mlua::Error::RuntimeError("max must be >= min".into()));
            }
            let span = (max as i128) - (min as i128) + 1;
            let offset = (secure_u64() as i128) % span;
            Ok((min as i128 + offset) as i64)
        })?,
    )?;

    table.set(
        "float",
        lua.create_function(|_lua, ()| Ok((secure_u64() >> 11) as f64 / (1u64 << 53) as f64))?,
    )?;

    table.set(
        "string",
        lua.create_function(|_lua, n: i64| {
            let len = positive_len(n, "length")?;
            let out: String = secure_bytes(len)
                .into_iter()
                .map(|byte| ALPHANUMERIC[byte as usize % ALPHANUMERIC.len()] as char)
                .collect();
            Ok(out)
        })?,
    )?;

    table.set(
        "bytes",
        lua.create_function(|_lua, n: i64| {
            let len = positive_len(n, "length")?;
            Ok(STANDARD.encode(secure_bytes(len)))
        })?,
    )?;

    table.set(
        "hex",
        lua.create_function(|_lua, n: i64| {
            let len = positive_len(n, "length")?;
            Ok(hex::encode(secure_bytes(len)))
        })?,
    )?;

    // Seconds-precision timestamp prefix keeps ids sortable by creation time.
    table.set(
        "id",
        lua.create_function(|_lua, ()| {
            let timestamp = Utc::now().timestamp() as u32;
            Ok(format!("{timestamp:08x}{}", hex::encode(secure_bytes(6))))
        })?,
    )?;

    lua.globals().set("random", table)
}

#[cfg(test)]
mod tests {
    use crate::capabilities::testutil::world;

    #[tokio::test]
    async fn int_stays_inclusive_in_range() {
        let w = world();
        w.lua
            .load(
                r#"
                for _ = 1, 200 do
                    local v = random.int(-3, 3)
                    assert(v >= -3 and v <= 3)
                end
                assert(random.int(7, 7) == 7)
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn float_is_in_unit_interval() {
        let w = world();
        w.lua
            .load(
                r#"
                for _ = 1, 100 do
                    local v = random.float()
                    assert(v >= 0 and v < 1)
                end
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn string_is_alphanumeric_of_requested_length() {
        let w = world();
        w.lua
            .load(
                r#"
                local s = random.string(32)
                assert(#s == 32)
                assert(string.match(s, "^%w+$") ~= nil)
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn hex_has_double_width() {
        let w = world();
        w.lua
            .load(
                r#"
                local h = random.hex(16)
                assert(#h == 32)
                assert(string.match(h, "^%x+$") ~= nil)
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn bytes_round_trips_through_base64() {
        let w = world();
        w.lua
            .load(
                r#"
                local encoded = random.bytes(10)
                local decoded = base64.decode(encoded)
                assert(#decoded == 10)
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn id_is_twenty_chars_and_unique() {
        let w = world();
        w.lua
            .load(
                r#"
                local a = random.id()
                local b = random.id()
                assert(#a == 20)
                assert(#b == 20)
                assert(a ~= b)
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_positive_lengths_raise() {
        let w = world();
        w.lua
            .load(
                r#"
                assert(pcall(random.string, 0) == false)
                assert(pcall(random.hex, -1) == false)
                assert(pcall(random.bytes, 0) == false)
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }
}
