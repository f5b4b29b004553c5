// SPDX-License-Identifier: MIT OR Apache-2.0
//! Key-value and environment store contracts.
//!
//! Both stores are partitioned by function id; a key written under one
//! function id is never visible under another.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors surfaced by the per-function stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key does not exist in the function's partition.
    #[error("key not found: {key}")]
    NotFound {
        /// Key that was looked up.
        key: String,
    },

    /// The backing store failed.
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns `true` for the typed not-found case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Per-function key-value storage.
///
/// Every operation is scoped to exactly one `function_id`.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch the value for `key`, or [`StoreError::NotFound`].
    async fn get(&self, function_id: &str, key: &str) -> Result<String, StoreError>;

    /// Insert or replace the value for `key`.
    async fn set(&self, function_id: &str, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, function_id: &str, key: &str) -> Result<(), StoreError>;
}

/// Per-function environment variables.
///
/// Same shape as [`KvStore`] plus a bulk read; API keys for the AI and email
/// capabilities live here, never in the process environment.
#[async_trait]
pub trait EnvStore: KvStore {
    /// All variables in the function's partition.
    async fn all(&self, function_id: &str) -> Result<BTreeMap<String, String>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_typed() {
        let err = StoreError::NotFound { key: "missing".into() };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "key not found: missing");
    }

    #[test]
    fn backend_error_is_not_not_found() {
        let err = StoreError::Backend("disk on fire".into());
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("disk on fire"));
    }
}
