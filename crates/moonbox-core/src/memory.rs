// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory reference implementations of the service contracts.
//!
//! These are the default single-node backends and the test doubles in one:
//! all state lives behind a single exclusive lock per store, which is never
//! held across a suspension point.

use crate::chat::{AiTracker, TrackRecord};
use crate::log::{LogEntry, LogLevel, Logger};
use crate::store::{EnvStore, KvStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

// ── Logger ──────────────────────────────────────────────────────────

/// Append-only in-memory logger.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    /// Empty logger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Logger for MemoryLogger {
    async fn log(&self, namespace: &str, level: LogLevel, message: &str) {
        let entry = LogEntry {
            namespace: namespace.to_string(),
            level,
            message: message.to_string(),
            timestamp: Utc::now(),
        };
        self.entries.lock().expect("logger lock poisoned").push(entry);
    }

    async fn entries(&self, namespace: &str) -> Vec<LogEntry> {
        self.entries
            .lock()
            .expect("logger lock poisoned")
            .iter()
            .filter(|e| e.namespace == namespace)
            .cloned()
            .collect()
    }

    async fn entries_paginated(
        &self,
        namespace: &str,
        limit: usize,
        offset: usize,
    ) -> (Vec<LogEntry>, usize) {
        let all = self.entries(namespace).await;
        let total = all.len();
        let page = all.into_iter().skip(offset).take(limit).collect();
        (page, total)
    }
}

// ── KV / env stores ─────────────────────────────────────────────────

/// In-memory key-value store partitioned by function id.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    partitions: Mutex<HashMap<String, BTreeMap<String, String>>>,
}

impl MemoryKvStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, function_id: &str, key: &str) -> Result<String, StoreError> {
        self.partitions
            .lock()
            .expect("kv lock poisoned")
            .get(function_id)
            .and_then(|p| p.get(key).cloned())
            .ok_or_else(|| StoreError::NotFound { key: key.to_string() })
    }

    async fn set(&self, function_id: &str, key: &str, value: &str) -> Result<(), StoreError> {
        self.partitions
            .lock()
            .expect("kv lock poisoned")
            .entry(function_id.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, function_id: &str, key: &str) -> Result<(), StoreError> {
        if let Some(partition) = self
            .partitions
            .lock()
            .expect("kv lock poisoned")
            .get_mut(function_id)
        {
            partition.remove(key);
        }
        Ok(())
    }
}

/// In-memory environment store partitioned by function id.
#[derive(Debug, Default)]
pub struct MemoryEnvStore {
    inner: MemoryKvStore,
}

impl MemoryEnvStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one variable, for wiring up tests and bootstraps.
    pub async fn seed(&self, function_id: &str, key: &str, value: &str) {
        // Infallible for the in-memory backend.
        let _ = self.inner.set(function_id, key, value).await;
    }
}

#[async_trait]
impl KvStore for MemoryEnvStore {
    async fn get(&self, function_id: &str, key: &str) -> Result<String, StoreError> {
        self.inner.get(function_id, key).await
    }

    async fn set(&self, function_id: &str, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(function_id, key, value).await
    }

    async fn delete(&self, function_id: &str, key: &str) -> Result<(), StoreError> {
        self.inner.delete(function_id, key).await
    }
}

#[async_trait]
impl EnvStore for MemoryEnvStore {
    async fn all(&self, function_id: &str) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self
            .inner
            .partitions
            .lock()
            .expect("kv lock poisoned")
            .get(function_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ── Trackers ────────────────────────────────────────────────────────

/// Tracker that records everything it is given.
#[derive(Debug, Default)]
pub struct RecordingTracker {
    records: Mutex<Vec<(String, TrackRecord)>>,
}

impl RecordingTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all `(execution_id, record)` pairs, oldest first.
    pub fn records(&self) -> Vec<(String, TrackRecord)> {
        self.records.lock().expect("tracker lock poisoned").clone()
    }
}

#[async_trait]
impl AiTracker for RecordingTracker {
    async fn track(&self, execution_id: &str, record: TrackRecord) {
        self.records
            .lock()
            .expect("tracker lock poisoned")
            .push((execution_id.to_string(), record));
    }
}

/// Tracker that discards everything.
#[derive(Debug, Default)]
pub struct NullTracker;

#[async_trait]
impl AiTracker for NullTracker {
    async fn track(&self, _execution_id: &str, _record: TrackRecord) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::TrackStatus;

    #[tokio::test]
    async fn kv_partitions_are_isolated() {
        let store = MemoryKvStore::new();
        store.set("function-1", "shared", "A").await.unwrap();
        store.set("function-2", "shared", "B").await.unwrap();
        assert_eq!(store.get("function-1", "shared").await.unwrap(), "A");
        assert_eq!(store.get("function-2", "shared").await.unwrap(), "B");
    }

    #[tokio::test]
    async fn kv_get_missing_is_not_found() {
        let store = MemoryKvStore::new();
        let err = store.get("function-1", "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn kv_delete_is_idempotent() {
        let store = MemoryKvStore::new();
        store.set("f", "k", "v").await.unwrap();
        store.delete("f", "k").await.unwrap();
        store.delete("f", "k").await.unwrap();
        assert!(store.get("f", "k").await.is_err());
    }

    #[tokio::test]
    async fn env_all_returns_partition_only() {
        let env = MemoryEnvStore::new();
        env.seed("f1", "A", "1").await;
        env.seed("f1", "B", "2").await;
        env.seed("f2", "A", "other").await;
        let all = env.all("f1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["A"], "1");
        assert_eq!(all["B"], "2");
    }

    #[tokio::test]
    async fn logger_orders_entries_and_filters_namespace() {
        let logger = MemoryLogger::new();
        logger.info("exec-1", "first").await;
        logger.warn("exec-1", "second").await;
        logger.error("exec-2", "elsewhere").await;

        let entries = logger.entries("exec-1").await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[1].message, "second");
        assert!(entries[0].timestamp <= entries[1].timestamp);
    }

    #[tokio::test]
    async fn logger_pagination_reports_total() {
        let logger = MemoryLogger::new();
        for i in 0..5 {
            logger.info("exec-1", &format!("line {i}")).await;
        }
        let (page, total) = logger.entries_paginated("exec-1", 2, 2).await;
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].message, "line 2");
    }

    #[tokio::test]
    async fn recording_tracker_keeps_order() {
        let tracker = RecordingTracker::new();
        let record = TrackRecord {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            endpoint: "https://api.openai.com/v1".into(),
            request_json: "{}".into(),
            response_json: None,
            duration_ms: 3,
            status: TrackStatus::Success,
            error_message: None,
            input_tokens: Some(10),
            output_tokens: Some(8),
        };
        tracker.track("exec-1", record.clone()).await;
        tracker.track("exec-2", record).await;
        let records = tracker.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, "exec-1");
        assert_eq!(records[1].0, "exec-2");
    }
}
