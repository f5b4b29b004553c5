// SPDX-License-Identifier: MIT OR Apache-2.0
//! Failure taxonomy of one invocation.

use thiserror::Error;

/// Broad family an [`ExecutionError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The source failed to compile.
    Load,
    /// The script violated the handler contract.
    Contract,
    /// The handler failed while running, including cancellation/timeout.
    Runtime,
}

/// A failed invocation.
///
/// Every variant carries the fully enriched message (header, `[CODE]` block,
/// `[TIP]` paragraph) ready for diagnostic rendering; no partial response
/// accompanies it.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The source could not be loaded or parsed.
    #[error("{0}")]
    Load(String),

    /// No callable global named `handler` after load.
    #[error("{0}")]
    MissingHandler(String),

    /// The interpreter surfaced an error during handler execution.
    #[error("{0}")]
    Runtime(String),

    /// The handler returned a non-table value.
    #[error("{0}")]
    BadReturn(String),
}

impl ExecutionError {
    /// The family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Load(_) => ErrorKind::Load,
            Self::MissingHandler(_) | Self::BadReturn(_) => ErrorKind::Contract,
            Self::Runtime(_) => ErrorKind::Runtime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_families() {
        assert_eq!(ExecutionError::Load("x".into()).kind(), ErrorKind::Load);
        assert_eq!(ExecutionError::MissingHandler("x".into()).kind(), ErrorKind::Contract);
        assert_eq!(ExecutionError::BadReturn("x".into()).kind(), ErrorKind::Contract);
        assert_eq!(ExecutionError::Runtime("x".into()).kind(), ErrorKind::Runtime);
    }

    #[test]
    fn display_is_the_enriched_message() {
        let err = ExecutionError::Runtime("Error at line 4: boom".into());
        assert_eq!(err.to_string(), "Error at line 4: boom");
    }
}
