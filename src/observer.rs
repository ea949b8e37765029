//! Resolution observers for logging and diagnostics.
//!
//! Observers see every dependency the resolver executes, every request-scoped
//! cache hit, every failure and every teardown. [`TracingObserver`] forwards
//! these events to `tracing`; tests and metrics layers implement
//! [`ResolutionObserver`] directly.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{DependError, TeardownFailure};
use crate::key::CallableId;

/// Hooks called by the resolver.
///
/// All methods run inline on the resolving task, so implementations should
/// be cheap.
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::{CallableId, ResolutionObserver, Resolver};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Recorder(Mutex<Vec<String>>);
///
/// impl ResolutionObserver for Recorder {
///     fn resolving(&self, callable: CallableId) {
///         self.0.lock().unwrap().push(format!("start {}", callable.short_name()));
///     }
///
///     fn resolved(&self, callable: CallableId, _duration: Duration) {
///         self.0.lock().unwrap().push(format!("done {}", callable.short_name()));
///     }
/// }
///
/// let resolver = Resolver::builder()
///     .observer(Arc::new(Recorder::default()))
///     .build();
/// ```
pub trait ResolutionObserver: Send + Sync {
    /// A dependency is about to be executed.
    fn resolving(&self, callable: CallableId);

    /// A dependency produced its value.
    fn resolved(&self, callable: CallableId, duration: Duration);

    /// A dependency's value was reused from the request-scoped cache.
    fn cache_hit(&self, _callable: CallableId) {}

    /// A dependency, or something it depends on, failed.
    fn failed(&self, _callable: CallableId, _error: &DependError) {}

    /// A generator was resumed to release its resource.
    fn torn_down(&self, _callable: CallableId, _failure: Option<&TeardownFailure>) {}
}

#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ResolutionObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn ResolutionObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn resolving(&self, callable: CallableId) {
        for observer in &self.observers {
            observer.resolving(callable);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, callable: CallableId, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(callable, duration);
        }
    }

    #[inline]
    pub(crate) fn cache_hit(&self, callable: CallableId) {
        for observer in &self.observers {
            observer.cache_hit(callable);
        }
    }

    #[inline]
    pub(crate) fn failed(&self, callable: CallableId, error: &DependError) {
        for observer in &self.observers {
            observer.failed(callable, error);
        }
    }

    #[inline]
    pub(crate) fn torn_down(&self, callable: CallableId, failure: Option<&TeardownFailure>) {
        for observer in &self.observers {
            observer.torn_down(callable, failure);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }
}

/// Observer that emits a `tracing` event for every resolution step.
///
/// Successful steps are logged at `debug`, cache hits at `trace`, failures at
/// `warn`.
pub struct TracingObserver {
    prefix: &'static str,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self { prefix: "depends" }
    }

    /// Adds a fixed `prefix` field to every event, to tell resolvers apart.
    pub fn with_prefix(prefix: &'static str) -> Self {
        Self { prefix }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionObserver for TracingObserver {
    fn resolving(&self, callable: CallableId) {
        tracing::debug!(prefix = self.prefix, callable = callable.short_name(), "resolving");
    }

    fn resolved(&self, callable: CallableId, duration: Duration) {
        tracing::debug!(prefix = self.prefix, callable = callable.short_name(), ?duration, "resolved");
    }

    fn cache_hit(&self, callable: CallableId) {
        tracing::trace!(prefix = self.prefix, callable = callable.short_name(), "request cache hit");
    }

    fn failed(&self, callable: CallableId, error: &DependError) {
        tracing::warn!(prefix = self.prefix, callable = callable.short_name(), %error, "dependency failed");
    }

    fn torn_down(&self, callable: CallableId, failure: Option<&TeardownFailure>) {
        match failure {
            None => tracing::debug!(prefix = self.prefix, callable = callable.short_name(), "torn down"),
            Some(failure) => tracing::warn!(
                prefix = self.prefix,
                callable = callable.short_name(),
                error = %failure.source,
                "teardown failed"
            ),
        }
    }
}
