//! Context implementation for cancellation and deadlines
//!
//! Every resource operation receives a [`Context`]. Long running work (HTTP
//! requests, polling sleeps) must race against [`Context::cancelled`] so that
//! an interrupted apply stops promptly.

use crate::error::{Result, TfkitError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant};

/// Context carries the cancellation signal and optional deadline of one
/// operation. Cloning is cheap; all clones observe the same signal.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Sender<bool>,
    timer: Option<AbortHandle>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Context {
    pub fn new() -> Self {
        let (done, _) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done,
                timer: None,
            }),
        }
    }

    /// Derives a context that is cancelled when `timeout` elapses or when
    /// this context is cancelled, whichever comes first.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut deadline = Instant::now() + timeout;
        if let Some(parent_deadline) = self.inner.deadline {
            deadline = deadline.min(parent_deadline);
        }

        let (done, _) = watch::channel(*self.inner.done.borrow());
        let parent = self.clone();
        let signal = done.clone();
        // Aborted when the last clone of the child is dropped
        let timer = tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline) => {}
                _ = parent.cancelled() => {}
            }
            signal.send_replace(true);
        });

        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                done,
                timer: Some(timer.abort_handle()),
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow() || self.inner.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    pub fn cancel(&self) {
        self.inner.done.send_replace(true);
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        let mut done = self.inner.done.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = done.wait_for(|cancelled| *cancelled).await;
    }

    /// Sleeps for `duration` unless cancelled first
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.run(time::sleep(duration)).await
    }

    /// Drives `future` to completion unless the context is cancelled first,
    /// in which case the future is dropped.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output> {
        if self.is_cancelled() {
            return Err(TfkitError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(TfkitError::Cancelled),
            output = future => Ok(output),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
