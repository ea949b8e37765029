//! Cancellation tokens for in-flight resolutions.
//!
//! A resolution started with a token stops as soon as the token (or any of
//! its ancestors) is cancelled. Cancellation is terminal: the resolution fails
//! with [`DependError::Cancelled`](crate::DependError::Cancelled) after
//! releasing every resource acquired so far.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Notify;

/// A cloneable cancellation flag with parent → child propagation.
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::CancellationToken;
///
/// let server = CancellationToken::new();
/// let request = server.child_token();
///
/// assert!(!request.is_cancelled());
/// server.cancel();
/// assert!(request.is_cancelled());
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<CancellationTokenInner>,
}

struct CancellationTokenInner {
    cancelled: AtomicBool,
    notify: Notify,
    parent: Option<CancellationToken>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancellationTokenInner {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
                parent: None,
            }),
        }
    }

    /// A token cancelled with this one, but cancellable on its own.
    pub fn child_token(&self) -> Self {
        Self {
            inner: Arc::new(CancellationTokenInner {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
                parent: Some(self.clone()),
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return true;
        }

        match &self.inner.parent {
            Some(parent) => parent.is_cancelled(),
            None => false,
        }
    }

    /// Completes once this token or an ancestor is cancelled.
    pub fn cancelled(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            loop {
                let notified = self.inner.notify.notified();
                tokio::pin!(notified);
                // Register before checking the flag so a concurrent cancel is not missed.
                notified.as_mut().enable();

                if self.is_cancelled() {
                    return;
                }

                match &self.inner.parent {
                    Some(parent) => {
                        tokio::select! {
                            _ = &mut notified => {}
                            _ = parent.cancelled() => return,
                        }
                    }
                    None => notified.await,
                }
            }
        })
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
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}
