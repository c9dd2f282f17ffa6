//! Ambient cancellation and deadline for client calls.
//!
//! A [`Context`] is passed explicitly into every client method and into the
//! poller's fetch function. It bundles a [`CancellationToken`] with an
//! optional deadline; clones share the token, so cancelling any clone (or
//! the token it was built from) stops every call that holds it. Concurrent
//! polls with different contexts never interfere.
//!
//! Derived contexts can only tighten a deadline: [`Context::with_deadline`]
//! keeps the earlier of the two instants. The poller relies on
//! [`Context::with_timeout_if_absent`], which leaves an existing deadline
//! untouched and only supplies one when the caller has none.

use crate::config::PROCESSING_TIMEOUT;
use crate::error::Doc2xError;
use crate::types::Operation;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Roughly 30 years; durations past this are treated as unbounded.
pub(crate) const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + d`, or `now + FAR_FUTURE` when the sum overflows.
pub(crate) fn instant_after(d: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(d).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Why a context ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupt {
    /// The cancellation token fired (Ctrl-C, caller cancelled).
    #[error("context canceled")]
    Cancelled,
    /// The deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation token plus optional deadline.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context driven by an existing token, with no deadline.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancel this context and every clone sharing its token.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Derive a context that expires at `deadline`, or earlier if this one
    /// already expires earlier.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        };
        Self {
            token: self.token.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(instant_after(timeout))
    }

    /// Supply a deadline only when none is set.
    ///
    /// A zero `timeout` falls back to [`PROCESSING_TIMEOUT`]. An existing
    /// deadline, tighter or looser, is returned unchanged.
    pub fn with_timeout_if_absent(&self, timeout: Duration) -> Self {
        if self.deadline.is_some() {
            return self.clone();
        }
        let timeout = if timeout.is_zero() {
            PROCESSING_TIMEOUT
        } else {
            timeout
        };
        self.with_timeout(timeout)
    }

    /// The interruption cause if the context has already ended.
    pub fn err(&self) -> Option<Interrupt> {
        if self.token.is_cancelled() {
            return Some(Interrupt::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Some(Interrupt::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Resolve once the token is cancelled or the deadline passes.
    ///
    /// Cancellation wins when both are ready.
    pub async fn done(&self) -> Interrupt {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => Interrupt::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Interrupt::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                Interrupt::Cancelled
            }
        }
    }

    /// Drive `fut` to completion unless the context ends first.
    ///
    /// The future is dropped on interruption, which aborts an in-flight
    /// reqwest request.
    pub async fn run<T, F>(&self, operation: Operation, fut: F) -> Result<T, Doc2xError>
    where
        F: Future<Output = Result<T, Doc2xError>>,
    {
        if let Some(cause) = self.err() {
            return Err(Doc2xError::Cancelled { operation, cause });
        }
        tokio::select! {
            biased;
            cause = self.done() => Err(Doc2xError::Cancelled { operation, cause }),
            res = fut => res,
        }
    }
}
