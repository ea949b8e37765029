//! Dependency descriptors: the cached, immutable shape of a callable.

use std::fmt;

use crate::error::ConfigurationError;
use crate::key::{callable_id, CallableId};
use crate::security::SecurityScopes;
use crate::signature::{ParamSource, Parameter, SignatureBuilder};
use crate::traits::callable::{invoke_plain, PlainFn};
use crate::traits::generator::{invoke_generator, GeneratorFn};
use crate::traits::{Callable, Dependency, GeneratorDependency};

/// How a dependency produces its value.
///
/// Decided once, when the callable reference is created, and never
/// re-checked per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Returns its value directly.
    Plain,
    /// Yields one value and is resumed after the request to release it.
    Generator,
}

#[derive(Clone, Copy)]
pub(crate) enum Body {
    Endpoint,
    Plain(PlainFn),
    Generator(GeneratorFn),
}

/// Handle to a callable type: its identity, its introspection entry point and
/// its type-erased body.
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::{callable_id, Callable, CallableRef, SignatureBuilder};
///
/// struct Health;
///
/// impl Callable for Health {
///     fn declare(_sig: &mut SignatureBuilder) {}
/// }
///
/// let endpoint = CallableRef::endpoint::<Health>();
/// assert_eq!(endpoint.id(), callable_id::<Health>());
/// assert!(endpoint.is_endpoint());
/// assert_eq!(endpoint.kind(), None);
/// ```
#[derive(Clone, Copy)]
pub struct CallableRef {
    id: CallableId,
    declare: fn(&mut SignatureBuilder),
    body: Body,
}

impl CallableRef {
    pub fn endpoint<E: Callable>() -> Self {
        Self {
            id: callable_id::<E>(),
            declare: E::declare,
            body: Body::Endpoint,
        }
    }

    pub fn plain<D: Dependency>() -> Self {
        Self {
            id: callable_id::<D>(),
            declare: D::declare,
            body: Body::Plain(invoke_plain::<D>),
        }
    }

    pub fn generator<G: GeneratorDependency>() -> Self {
        Self {
            id: callable_id::<G>(),
            declare: G::declare,
            body: Body::Generator(invoke_generator::<G>),
        }
    }

    pub fn id(&self) -> CallableId {
        self.id
    }

    /// `None` for endpoints, which the resolver never invokes.
    pub fn kind(&self) -> Option<DependencyKind> {
        match self.body {
            Body::Endpoint => None,
            Body::Plain(_) => Some(DependencyKind::Plain),
            Body::Generator(_) => Some(DependencyKind::Generator),
        }
    }

    pub fn is_endpoint(&self) -> bool {
        matches!(self.body, Body::Endpoint)
    }

    pub(crate) fn body(&self) -> Body {
        self.body
    }

    /// Runs introspection. Only the [`SignatureCache`](crate::SignatureCache)
    /// calls this, once per callable.
    pub(crate) fn introspect(&self) -> Result<DependencyDescriptor, ConfigurationError> {
        let mut builder = SignatureBuilder::new(self.id);
        (self.declare)(&mut builder);
        builder.finish()
    }
}

impl fmt::Debug for CallableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableRef")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Immutable description of one callable, shared by every request.
///
/// A descriptor carries no role: the same type may be resolved as an endpoint
/// and used as a dependency, and both uses share one descriptor. How the
/// callable is invoked comes from the [`CallableRef`] at the use site.
///
/// Sub-dependencies appear as [`Depends`](crate::Depends) parameters; their
/// own descriptors live in the same cache and are looked up by identity, so a
/// graph with a cycle can still be described.
pub struct DependencyDescriptor {
    callable: CallableId,
    parameters: Vec<Parameter>,
    required_scopes: SecurityScopes,
}

impl DependencyDescriptor {
    pub(crate) fn new(callable: CallableId, parameters: Vec<Parameter>, required_scopes: SecurityScopes) -> Self {
        Self {
            callable,
            parameters,
            required_scopes,
        }
    }

    pub fn callable_id(&self) -> CallableId {
        self.callable
    }

    /// Parameters in declaration order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn required_scopes(&self) -> &SecurityScopes {
        &self.required_scopes
    }

    /// Direct sub-dependencies in declaration order.
    pub fn dependencies(&self) -> impl Iterator<Item = &crate::signature::Depends> {
        self.parameters.iter().filter_map(|p| match p.source() {
            ParamSource::Dependency(depends) => Some(depends),
            _ => None,
        })
    }
}

impl fmt::Debug for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyDescriptor")
            .field("callable", &self.callable)
            .field("parameters", &self.parameters)
            .field("required_scopes", &self.required_scopes.scopes())
            .finish()
    }
}
