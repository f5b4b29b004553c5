// SPDX-License-Identifier: MIT OR Apache-2.0
//! Log levels, entries, and the logger contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Informational message.
    Info,
    /// Developer diagnostics.
    Debug,
    /// Something looks wrong but execution continues.
    Warn,
    /// Execution-affecting failure.
    Error,
}

impl LogLevel {
    /// Stable lowercase string form (`"info"`, `"debug"`, `"warn"`, `"error"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Parse the lowercase string form back into a level.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single log line emitted by a function invocation.
///
/// Entries are ordered by `timestamp` within a namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Grouping key; the runtime uses the execution id.
    pub namespace: String,
    /// Severity.
    pub level: LogLevel,
    /// Message text as supplied by the script.
    pub message: String,
    /// Append time.
    pub timestamp: DateTime<Utc>,
}

/// Sink for script log output.
///
/// Implementations must be safe for concurrent use from multiple invocations.
/// Appends never surface an error to the caller.
#[async_trait]
pub trait Logger: Send + Sync {
    /// Append one entry under `namespace`.
    async fn log(&self, namespace: &str, level: LogLevel, message: &str);

    /// All entries for `namespace`, oldest first.
    async fn entries(&self, namespace: &str) -> Vec<LogEntry>;

    /// A page of entries for `namespace` plus the total count.
    async fn entries_paginated(
        &self,
        namespace: &str,
        limit: usize,
        offset: usize,
    ) -> (Vec<LogEntry>, usize);

    /// Shorthand for [`log`](Self::log) at [`LogLevel::Info`].
    async fn info(&self, namespace: &str, message: &str) {
        self.log(namespace, LogLevel::Info, message).await;
    }

    /// Shorthand for [`log`](Self::log) at [`LogLevel::Debug`].
    async fn debug(&self, namespace: &str, message: &str) {
        self.log(namespace, LogLevel::Debug, message).await;
    }

    /// Shorthand for [`log`](Self::log) at [`LogLevel::Warn`].
    async fn warn(&self, namespace: &str, message: &str) {
        self.log(namespace, LogLevel::Warn, message).await;
    }

    /// Shorthand for [`log`](Self::log) at [`LogLevel::Error`].
    async fn error(&self, namespace: &str, message: &str) {
        self.log(namespace, LogLevel::Error, message).await;
    }
}
