//! Per-request resolution state.

use std::collections::HashMap;

use crate::arguments::AnyArc;
use crate::descriptors::{CallableRef, DependencyKind};
use crate::error::DependResult;
use crate::internal::{ResolutionStack, TeardownStack};
use crate::key::CallableId;
use crate::traits::generator::ErasedTeardown;

/// Everything one resolution owns: the request-scoped value cache, the stack
/// of callables in progress and the teardowns registered so far.
///
/// A context is never shared between requests, so nothing here is locked.
///
/// Values are keyed by identity and role: a type used both as a plain
/// dependency and as a generator produces two different values.
pub(crate) struct ResolutionContext {
    resolved: HashMap<(CallableId, Option<DependencyKind>), AnyArc>,
    stack: ResolutionStack,
    teardowns: TeardownStack,
}

impl ResolutionContext {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            resolved: HashMap::new(),
            stack: ResolutionStack::new(max_depth),
            teardowns: TeardownStack::default(),
        }
    }

    /// Value already computed for `callable` in this request.
    pub(crate) fn cached(&self, callable: &CallableRef) -> Option<AnyArc> {
        self.resolved.get(&(callable.id(), callable.kind())).cloned()
    }

    pub(crate) fn store(&mut self, callable: &CallableRef, value: AnyArc) {
        self.resolved.insert((callable.id(), callable.kind()), value);
    }

    pub(crate) fn enter(&mut self, id: CallableId) -> DependResult<()> {
        self.stack.enter(id)
    }

    pub(crate) fn leave(&mut self, id: CallableId) {
        self.stack.leave(id);
    }

    pub(crate) fn push_teardown(&mut self, id: CallableId, handle: Box<dyn ErasedTeardown>) {
        self.teardowns.push(id, handle);
    }

    /// Moves the pending teardowns out, leaving the context with none.
    pub(crate) fn take_teardowns(&mut self) -> TeardownStack {
        self.teardowns.take()
    }

    #[cfg(test)]
    pub(crate) fn resolved_len(&self) -> usize {
        self.resolved.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::Arguments;
    use crate::error::BoxError;
    use crate::signature::SignatureBuilder;
    use crate::traits::{Callable, Dependency, Exit, GeneratorDependency};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Settings;

    impl Callable for Settings {
        fn declare(_sig: &mut SignatureBuilder) {}
    }

    #[async_trait]
    impl Dependency for Settings {
        type Output = u32;
        async fn call(_args: Arguments) -> Result<u32, BoxError> {
            Ok(7)
        }
    }

    #[async_trait]
    impl GeneratorDependency for Settings {
        type Output = u32;

        async fn start(_args: Arguments) -> Result<(Self, u32), BoxError> {
            Ok((Settings, 8))
        }

        async fn finish(self, _exit: Exit) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[test]
    fn contexts_start_empty_and_keep_values_per_id() {
        let mut ctx = ResolutionContext::new(8);
        let plain = CallableRef::plain::<Settings>();
        assert!(ctx.cached(&plain).is_none());

        ctx.store(&plain, Arc::new(7u32));
        let value = ctx.cached(&plain).unwrap();
        assert_eq!(*value.downcast::<u32>().unwrap(), 7);
        assert_eq!(ctx.resolved_len(), 1);
        assert!(ctx.take_teardowns().is_empty());
    }

    #[test]
    fn one_type_in_two_roles_keeps_two_values() {
        let mut ctx = ResolutionContext::new(8);
        let plain = CallableRef::plain::<Settings>();
        let generator = CallableRef::generator::<Settings>();

        ctx.store(&plain, Arc::new(7u32));
        assert!(ctx.cached(&generator).is_none());

        ctx.store(&generator, Arc::new(8u32));
        assert_eq!(*ctx.cached(&plain).unwrap().downcast::<u32>().unwrap(), 7);
        assert_eq!(ctx.resolved_len(), 2);
    }
}
