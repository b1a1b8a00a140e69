//! Cancellation-bearing call context.
//!
//! Every RPC call takes a [`CallContext`]. Transports wrap their I/O wait in
//! [`CallContext::run`], which returns as soon as the context is cancelled or
//! its deadline passes, without waiting for the device.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context with no deadline, cancellable through [`cancel`](Self::cancel).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context driven by an externally owned token.
    #[must_use]
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Tighten the deadline to at most `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Tighten the deadline; a later deadline than the current one is ignored.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Derived context: cancelled with its parent, cancellable on its own.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when there is no deadline.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Check the context without waiting.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` or `DeadlineExceeded` when the call must not start.
    pub fn check(&self) -> Result<(), TransportError> {
        if self.token.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            return Err(TransportError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` until it completes, the context is cancelled, or the
    /// deadline passes. `fut` is dropped (and its I/O aborted) in the latter
    /// two cases.
    ///
    /// # Errors
    ///
    /// Returns the error of `fut`, `TransportError::Cancelled`, or
    /// `TransportError::DeadlineExceeded`.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(TransportError::Cancelled),
            () = deadline => Err(TransportError::DeadlineExceeded),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_run_completes() {
        let ctx = CallContext::new();
        let value = ctx.run(async { Ok::<_, TransportError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_run_passes_inner_error() {
        let ctx = CallContext::new();
        let result = ctx
            .run(async { Err::<(), _>(TransportError::Closed) })
            .await;
        assert!(matches!(result, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn test_already_cancelled_never_polls() {
        let ctx = CallContext::new();
        ctx.cancel();

        let polled = Arc::new(AtomicBool::new(false));
        let flag = polled.clone();
        let result = ctx
            .run(async move {
                flag.store(true, Ordering::SeqCst);
                Ok::<_, TransportError>(())
            })
            .await;

        assert!(matches!(result, Err(TransportError::Cancelled)));
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancel_while_waiting() {
        let ctx = CallContext::new();
        let canceller = ctx.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = ctx
            .run(std::future::pending::<Result<(), TransportError>>())
            .await;
        assert!(matches!(result, Err(TransportError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded() {
        let ctx = CallContext::new().with_timeout(Duration::from_secs(5));

        let result = ctx
            .run(std::future::pending::<Result<(), TransportError>>())
            .await;
        assert!(matches!(result, Err(TransportError::DeadlineExceeded)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_only_tightens() {
        let ctx = CallContext::new()
            .with_timeout(Duration::from_secs(1))
            .with_timeout(Duration::from_secs(60));

        let remaining = ctx.remaining().unwrap();
        assert!(remaining <= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_child_follows_parent() {
        let parent = CallContext::new();
        let child = parent.child();

        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn test_child_cancel_leaves_parent() {
        let parent = CallContext::new();
        let child = parent.child();

        child.cancel();
        assert!(!parent.is_cancelled());
        assert!(child.check().is_err());
        assert!(parent.check().is_ok());
    }

    #[test]
    fn test_no_deadline_by_default() {
        let ctx = CallContext::new();
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());
    }
}
