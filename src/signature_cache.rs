//! Process-wide cache of introspected callable signatures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::descriptors::{CallableRef, DependencyDescriptor};
use crate::error::ConfigurationError;
use crate::internal::OnceMap;
use crate::key::CallableId;

type Described = Result<Arc<DependencyDescriptor>, ConfigurationError>;

static GLOBAL: Lazy<Arc<SignatureCache>> = Lazy::new(|| Arc::new(SignatureCache::new()));

/// Memoizes the descriptor of every callable the engine has seen.
///
/// The first `describe` of a callable runs its
/// [`declare`](crate::Callable::declare) function; every later call, from any
/// thread, returns the same `Arc<DependencyDescriptor>`. Introspection
/// failures are cached too, so a malformed callable reports the same
/// [`ConfigurationError`] on every use without being introspected again.
///
/// The set of callables is fixed by the program's types, so the cache is
/// bounded and never evicts.
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::{Callable, CallableRef, Field, SignatureBuilder, SignatureCache};
/// use std::sync::Arc;
///
/// struct GetItem;
///
/// impl Callable for GetItem {
///     fn declare(sig: &mut SignatureBuilder) {
///         sig.param("item_id", Field::path());
///     }
/// }
///
/// let cache = SignatureCache::new();
/// let first = cache.describe(&CallableRef::endpoint::<GetItem>()).unwrap();
/// let second = cache.describe(&CallableRef::endpoint::<GetItem>()).unwrap();
///
/// assert!(Arc::ptr_eq(&first, &second));
/// assert_eq!(cache.introspections(), 1);
/// ```
pub struct SignatureCache {
    descriptors: OnceMap<CallableId, Described>,
    introspections: AtomicUsize,
}

impl SignatureCache {
    /// Creates an empty, private cache.
    pub fn new() -> Self {
        Self {
            descriptors: OnceMap::new(),
            introspections: AtomicUsize::new(0),
        }
    }

    /// The cache shared by every resolver built without a private one.
    pub fn global() -> Arc<SignatureCache> {
        GLOBAL.clone()
    }

    /// Returns the descriptor of `callable`, introspecting it on first use.
    ///
    /// Keyed by identity alone: resolving a type as an endpoint and using it as
    /// a dependency share one descriptor, in either order.
    pub fn describe(&self, callable: &CallableRef) -> Result<Arc<DependencyDescriptor>, ConfigurationError> {
        self.descriptors.get_or_init(&callable.id(), || {
            self.introspections.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(callable = callable.id().name(), "introspecting signature");
            callable.introspect().map(Arc::new)
        })
    }

    /// Returns the cached descriptor without introspecting.
    pub fn get(&self, id: &CallableId) -> Option<Arc<DependencyDescriptor>> {
        self.descriptors.get(id).and_then(Result::ok)
    }

    /// Number of callables described so far, including failed ones.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times introspection actually ran.
    pub fn introspections(&self) -> usize {
        self.introspections.load(Ordering::Relaxed)
    }
}

impl Default for SignatureCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SignatureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureCache")
            .field("entries", &self.len())
            .field("introspections", &self.introspections())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::Arguments;
    use crate::error::BoxError;
    use crate::signature::{Field, SignatureBuilder};
    use crate::traits::{Callable, Dependency};
    use async_trait::async_trait;

    struct Both;

    impl Callable for Both {
        fn declare(sig: &mut SignatureBuilder) {
            sig.param("q", Field::query());
        }
    }

    #[async_trait]
    impl Dependency for Both {
        type Output = ();
        async fn call(_args: Arguments) -> Result<(), BoxError> {
            Ok(())
        }
    }

    struct Rejected;

    impl Callable for Rejected {
        fn declare(sig: &mut SignatureBuilder) {
            sig.reject("unsupported parameter kind");
        }
    }

    #[test]
    fn one_descriptor_serves_every_role() {
        let cache = SignatureCache::new();
        let as_dependency = cache.describe(&CallableRef::plain::<Both>()).unwrap();
        let as_endpoint = cache.describe(&CallableRef::endpoint::<Both>()).unwrap();
        assert!(Arc::ptr_eq(&as_dependency, &as_endpoint));
        assert_eq!(cache.introspections(), 1);
    }

    #[test]
    fn failures_are_cached_not_retried() {
        let cache = SignatureCache::new();
        let first = cache.describe(&CallableRef::endpoint::<Rejected>()).unwrap_err();
        let second = cache.describe(&CallableRef::endpoint::<Rejected>()).unwrap_err();
        assert_eq!(first, second);
        assert_eq!(cache.introspections(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&crate::key::callable_id::<Rejected>()).is_none());
    }
}
