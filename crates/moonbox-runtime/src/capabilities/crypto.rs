// SPDX-License-Identifier: MIT OR Apache-2.0
//! `crypto` capability: digests, HMACs, and UUIDs.

use super::CapabilityEnv;
use hmac::{Hmac, Mac};
use md5::Md5;
use mlua::Lua;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use uuid::Uuid;

/// Install the `crypto` global: `md5|sha1|sha256|sha512(s) → hex`,
/// `hmac_sha1|hmac_sha256|hmac_sha512(msg, key) → hex`, `uuid() → v4`.
pub(crate) fn register(lua: &Lua, _env: &CapabilityEnv) -> mlua::Result<()> {
    let table = lua.create_table()?;

    table.set(
        "md5",
        lua.create_function(|_lua, input: mlua::String| {
            let data = input.as_bytes();
            Ok(hex::encode(Md5::digest(&*data)))
        })?,
    )?;
    table.set(
        "sha1",
        lua.create_function(|_lua, input: mlua::String| {
            let data = input.as_bytes();
            Ok(hex::encode(Sha1::digest(&*data)))
        })?,
    )?;
    table.set(
        "sha256",
        lua.create_function(|_lua, input: mlua::String| {
            let data = input.as_bytes();
            Ok(hex::encode(Sha256::digest(&*data)))
        })?,
    )?;
    table.set(
        "sha512",
        lua.create_function(|_lua, input: mlua::String| {
            let data = input.as_bytes();
            Ok(hex::encode(Sha512::digest(&*data)))
        })?,
    )?;

    table.set(
        "hmac_sha1",
        lua.create_function(|_lua, (message, key): (mlua::String, mlua::String)| {
            let (message, key) = (message.as_bytes(), key.as_bytes());
            // HMAC accepts keys of any length; new_from_slice cannot fail.
            let mut mac =
                Hmac::<Sha1>::new_from_slice(&key).expect("HMAC accepts any key length");
            mac.update(&message);
            Ok(hex::encode(mac.finalize().into_bytes()))
        })?,
    )?;
    table.set(
        "hmac_sha256",
        lua.create_function(|_lua, (message, key): (mlua::String, mlua::String)| {
            let (message, key) = (message.as_bytes(), key.as_bytes());
            let mut mac =
                Hmac::<Sha256>::new_from_slice(&key).expect("HMAC accepts any key length");
            mac.update(&message);
            Ok(hex::encode(mac.finalize().into_bytes()))
        })?,
    )?;
    table.set(
        "hmac_sha512",
        lua.create_function(|_lua, (message, key): (mlua::String, mlua::String)| {
            let (message, key) = (message.as_bytes(), key.as_bytes());
            let mut mac =
                Hmac::<Sha512>::new_from_slice(&key).expect("HMAC accepts any key length");
            mac.update(&message);
            Ok(hex::encode(mac.finalize().into_bytes()))
        })?,
    )?;

    table.set("uuid", lua.create_function(|_lua, ()| Ok(Uuid::new_v4().to_string()))?)?;

    lua.globals().set("crypto", table)
}

#[cfg(test)]
mod tests {
    use crate::capabilities::testutil::world;

    #[tokio::test]
    async fn digests_match_known_vectors() {
        let w = world();
        w.lua
            .load(
                r#"
                assert(crypto.md5("abc") == "900150983cd24fb0d6963f7d28e17f72")
                assert(crypto.sha1("abc") == "a9993e364706816aba3e25717850c26c9cd0d89d")
                assert(crypto.sha256("abc") ==
                    "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn sha512_has_expected_width() {
        let w = world();
        w.lua
            .load(r#"assert(#crypto.sha512("abc") == 128)"#)
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn hmac_sha256_matches_known_vector() {
        let w = world();
        // RFC 4231 test case 2.
        w.lua
            .load(
                r#"
                assert(crypto.hmac_sha256("what do ya want for nothing?", "Jefe") ==
                    "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843")
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn hmac_variants_differ() {
        let w = world();
        w.lua
            .load(
                r#"
                local a = crypto.hmac_sha1("msg", "key")
                local b = crypto.hmac_sha512("msg", "key")
                assert(#a == 40)
                assert(#b == 128)
                assert(a ~= b)
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn uuid_is_v4_shaped_and_unique() {
        let w = world();
        w.lua
            .load(
                r#"
                local a = crypto.uuid()
                local b = crypto.uuid()
                assert(#a == 36)
                assert(a ~= b)
                assert(string.sub(a, 15, 15) == "4")
                "#,
            )
            .exec_async()
            .await
            .unwrap();
    }
}
