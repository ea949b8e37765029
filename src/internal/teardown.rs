//! Pending teardowns of one resolution.

use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::TeardownFailure;
use crate::key::CallableId;
use crate::traits::generator::ErasedTeardown;
use crate::traits::Exit;

/// Resume handle of one started generator.
pub(crate) struct Teardown {
    callable: CallableId,
    handle: Box<dyn ErasedTeardown>,
}

impl Teardown {
    /// Resumes the generator past its yield point. A panic inside the release
    /// logic is reported as a failure like any returned error.
    pub(crate) async fn finish(self, exit: Exit) -> Result<(), TeardownFailure> {
        let callable = self.callable;
        match AssertUnwindSafe(self.handle.finish(exit)).catch_unwind().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(TeardownFailure { callable, source }),
            Err(payload) => Err(TeardownFailure {
                callable,
                source: panic_message(payload.as_ref()).into(),
            }),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        format!("teardown panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("teardown panicked: {}", message)
    } else {
        "teardown panicked".to_string()
    }
}

/// Teardowns in acquisition order; released LIFO.
///
/// Dropping a stack that still holds entries means its resolution was
/// abandoned (the owning future was dropped or a panic unwound through it).
/// A release already under way is completed first. The remaining teardowns
/// then run with [`Exit::Cancelled`]: spawned on the current Tokio runtime
/// when there is one, driven inline otherwise.
#[derive(Default)]
pub(crate) struct TeardownStack {
    entries: Vec<Teardown>,
    releasing: Option<BoxFuture<'static, Result<(), TeardownFailure>>>,
}

impl TeardownStack {
    pub(crate) fn push(&mut self, callable: CallableId, handle: Box<dyn ErasedTeardown>) {
        self.entries.push(Teardown { callable, handle });
    }

    /// Releases the most recently acquired teardown.
    ///
    /// The release is owned by the stack until it completes, so a caller
    /// dropped mid-release leaves it to the stack's drop handling instead of
    /// cutting it short.
    pub(crate) async fn release_next(&mut self, exit: Exit) -> Option<(CallableId, Result<(), TeardownFailure>)> {
        let teardown = self.entries.pop()?;
        let callable = teardown.callable;
        let result = self.releasing.insert(teardown.finish(exit).boxed()).await;
        self.releasing = None;
        Some((callable, result))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn take(&mut self) -> TeardownStack {
        TeardownStack {
            entries: std::mem::take(&mut self.entries),
            releasing: None,
        }
    }
}

impl Drop for TeardownStack {
    fn drop(&mut self) {
        if self.entries.is_empty() && self.releasing.is_none() {
            return;
        }

        let releasing = self.releasing.take();
        let orphaned = std::mem::take(&mut self.entries);
        tracing::debug!(count = orphaned.len(), "running teardowns of an abandoned resolution");

        let unwind = async move {
            if let Some(releasing) = releasing {
                if let Err(failure) = releasing.await {
                    tracing::warn!(callable = failure.callable.name(), error = %failure.source, "teardown failed");
                }
            }
            for teardown in orphaned.into_iter().rev() {
                if let Err(failure) = teardown.finish(Exit::Cancelled).await {
                    tracing::warn!(callable = failure.callable.name(), error = %failure.source, "teardown failed");
                }
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(unwind);
            }
            Err(_) => futures::executor::block_on(unwind),
        }
    }
}
