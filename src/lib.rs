// SPDX-License-Identifier: MIT OR Apache-2.0
//! Moonbox: a single-node FaaS runtime that executes user-supplied Lua
//! functions inside per-invocation sandboxes.
//!
//! This facade re-exports the workspace crates. Most embedders want
//! [`runtime::run`] with [`runtime::Dependencies`] over the in-memory
//! backends from [`core::memory`], swapping in persistent stores behind the
//! same traits as they grow.

#![deny(unsafe_code)]

pub use moonbox_ai as ai;
pub use moonbox_core as core;
pub use moonbox_error as error;
pub use moonbox_http as http;
pub use moonbox_mail as mail;
pub use moonbox_runtime as runtime;
