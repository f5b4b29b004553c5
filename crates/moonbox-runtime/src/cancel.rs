// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cancellation primitives for invocation execution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// A cloneable, cheaply-shareable token used to signal cancellation, with an
/// optional deadline baked in at construction.
///
/// All clones share the same underlying state; cancelling one immediately
/// makes every clone observe `is_cancelled() == true`. A deadline, once
/// reached, behaves exactly like an explicit cancel.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    cancelled: AtomicBool,
    notify: Notify,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// Token that is not cancelled and never expires on its own.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Token that self-cancels at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::build(Some(deadline))
    }

    /// Token that self-cancels after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Some(Instant::now() + timeout))
    }

    fn build(deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
                deadline,
            }),
        }
    }

    /// Signal cancellation. Idempotent — calling more than once is harmless.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// `true` once [`cancel`](Self::cancel) was called or the deadline passed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        matches!(self.inner.deadline, Some(deadline) if Instant::now() >= deadline)
    }

    /// The deadline this token self-cancels at, when it has one.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Resolves when the token is cancelled or its deadline passes.
    ///
    /// Resolves immediately if the token is already cancelled.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.inner.notify.notified();
            match self.inner.deadline {
                Some(deadline) => {
                    tokio::select! {
                        _ = notified => {}
                        _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => return,
                    }
                }
                None => notified.await,
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.inner.deadline)
            .finish()
    }
}

// ── InvocationSignal ────────────────────────────────────────────────

/// The per-invocation signal derived at orchestrator entry.
///
/// Carries the caller's token plus the effective deadline — the minimum of
/// the caller's deadline and the invocation timeout. Cancellation is
/// terminal: capability calls check [`is_expired`](Self::is_expired) before
/// starting work, and the interpreter's instruction hook polls it to unwind
/// tight loops.
#[derive(Clone)]
pub struct InvocationSignal {
    parent: CancellationToken,
    deadline: Instant,
}

impl InvocationSignal {
    /// Derive the signal for one invocation.
    #[must_use]
    pub fn derive(parent: &CancellationToken, timeout: Duration) -> Self {
        let mut deadline = Instant::now() + timeout;
        if let Some(parent_deadline) = parent.deadline() {
            deadline = deadline.min(parent_deadline);
        }
        Self { parent: parent.clone(), deadline }
    }

    /// `true` once the caller cancelled or the effective deadline passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.parent.is_cancelled() || Instant::now() >= self.deadline
    }

    /// The effective deadline.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Resolves when the signal trips, whichever source trips it first.
    pub async fn expired(&self) {
        tokio::select! {
            _ = self.parent.cancelled() => {}
            _ = tokio::time::sleep_until(tokio::time::Instant::from_std(self.deadline)) => {}
        }
    }
}

impl std::fmt::Debug for InvocationSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationSignal")
            .field("expired", &self.is_expired())
            .field("deadline", &self.deadline)
            .finish()
    }
}
