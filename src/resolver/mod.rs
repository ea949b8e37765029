//! The resolver: turns an endpoint's declared parameters into arguments.
//!
//! Resolution is depth-first and pre-order. Parameters resolve in declaration
//! order; each dependency runs at most once per request (unless used with
//! [`Depends::no_cache`]), after all of its own parameters. Generators
//! register a teardown when they start, and every registered teardown runs
//! exactly once, in reverse order, whether the request succeeds, fails,
//! times out, is cancelled or is simply dropped.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tracing::Instrument;

use crate::arguments::{AnyArc, Arguments};
use crate::cancellation::CancellationToken;
use crate::config::ResolverConfig;
use crate::descriptors::{Body, CallableRef, DependencyDescriptor};
use crate::error::{BoxError, ConfigurationError, DependError, DependResult, ResolveError};
use crate::internal::ResolutionStack;
use crate::key::CallableId;
use crate::observer::{Observers, ResolutionObserver};
use crate::request::RequestData;
use crate::security::check_scopes;
use crate::signature::{Depends, ParamSource};
use crate::signature_cache::SignatureCache;
use crate::traits::{Callable, Dependency, Exit, GeneratorDependency};

mod cleanup;
mod context;
mod extract;
mod resolved;

use context::ResolutionContext;
pub use resolved::Resolved;

/// Per-call resolution options.
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::{CancellationToken, ResolveOptions};
/// use std::time::Duration;
///
/// let shutdown = CancellationToken::new();
/// let options = ResolveOptions::new()
///     .cancel_on(shutdown.child_token())
///     .timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    cancellation: Option<CancellationToken>,
    timeout: Option<Duration>,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abandons resolution once `token` is cancelled.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Overrides the resolver's default time limit.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Builder for [`Resolver`].
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::{Resolver, ResolverConfig, TracingObserver};
/// use std::sync::Arc;
///
/// let resolver = Resolver::builder()
///     .config(ResolverConfig::default().with_max_depth(64))
///     .observer(Arc::new(TracingObserver::new()))
///     .build();
///
/// assert_eq!(resolver.config().max_depth, 64);
/// ```
pub struct ResolverBuilder {
    config: ResolverConfig,
    observers: Observers,
    overrides: HashMap<CallableId, CallableRef>,
    signatures: Option<Arc<SignatureCache>>,
}

impl ResolverBuilder {
    pub fn new() -> Self {
        Self {
            config: ResolverConfig::default(),
            observers: Observers::default(),
            overrides: HashMap::new(),
            signatures: None,
        }
    }

    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    /// Uses `replacement` wherever `original` is depended on.
    ///
    /// The replacement's own identity is used for request caching and cycle
    /// detection. Overrides are not chained: a replacement that is itself
    /// overridden is still used as given.
    pub fn override_with(mut self, original: CallableRef, replacement: CallableRef) -> Self {
        self.overrides.insert(original.id(), replacement);
        self
    }

    /// Replaces the plain dependency `D` by `R`, which must produce the same
    /// output type.
    pub fn override_dependency<D, R>(self) -> Self
    where
        D: Dependency,
        R: Dependency<Output = D::Output>,
    {
        self.override_with(CallableRef::plain::<D>(), CallableRef::plain::<R>())
    }

    /// Replaces the generator `G` by `R`, which must produce the same output
    /// type.
    pub fn override_generator<G, R>(self) -> Self
    where
        G: GeneratorDependency,
        R: GeneratorDependency<Output = G::Output>,
    {
        self.override_with(CallableRef::generator::<G>(), CallableRef::generator::<R>())
    }

    /// Uses a private signature cache instead of [`SignatureCache::global`].
    pub fn signature_cache(mut self, signatures: Arc<SignatureCache>) -> Self {
        self.signatures = Some(signatures);
        self
    }

    pub fn build(self) -> Resolver {
        Resolver {
            inner: Arc::new(ResolverInner {
                config: self.config,
                observers: self.observers,
                overrides: self.overrides,
                signatures: self.signatures.unwrap_or_else(SignatureCache::global),
            }),
        }
    }
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves endpoint arguments from request data.
///
/// A resolver holds only immutable configuration and a handle to the shared
/// [`SignatureCache`]; all per-request state lives in the resolution itself.
/// It is cheap to clone and safe to use from any number of tasks at once.
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::{
///     async_trait, Arguments, BoxError, Callable, Dependency, Depends, Field, RequestData, Resolver,
///     SignatureBuilder,
/// };
/// use serde_json::json;
///
/// struct CommonParams { q: Option<String>, limit: u32 }
///
/// struct Common;
///
/// impl Callable for Common {
///     fn declare(sig: &mut SignatureBuilder) {
///         sig.param("q", Field::query().optional())
///             .param("limit", Field::query().default(json!(100)));
///     }
/// }
///
/// #[async_trait]
/// impl Dependency for Common {
///     type Output = CommonParams;
///
///     async fn call(args: Arguments) -> Result<CommonParams, BoxError> {
///         Ok(CommonParams { q: args.deserialize("q")?, limit: args.deserialize("limit")? })
///     }
/// }
///
/// struct ReadItems;
///
/// impl Callable for ReadItems {
///     fn declare(sig: &mut SignatureBuilder) {
///         sig.param("commons", Depends::on::<Common>());
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let resolver = Resolver::new();
/// let request = RequestData::new().with_query("q", json!("boots"));
///
/// let count = resolver
///     .run::<ReadItems, _, _, _>(&request, |args| async move {
///         let commons = args.get::<CommonParams>("commons")?;
///         assert_eq!(commons.q.as_deref(), Some("boots"));
///         Ok::<_, BoxError>(commons.limit)
///     })
///     .await
///     .unwrap();
///
/// assert_eq!(count, 100);
/// # }
/// ```
#[derive(Clone)]
pub struct Resolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    config: ResolverConfig,
    observers: Observers,
    overrides: HashMap<CallableId, CallableRef>,
    signatures: Arc<SignatureCache>,
}

impl Resolver {
    /// A resolver with default configuration and the global signature cache.
    pub fn new() -> Self {
        ResolverBuilder::new().build()
    }

    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    #[inline]
    fn inner(&self) -> &ResolverInner {
        &self.inner
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.inner().config
    }

    pub fn signatures(&self) -> &Arc<SignatureCache> {
        &self.inner().signatures
    }

    /// Resolves the arguments of endpoint `E` for one request.
    pub async fn resolve<E: Callable>(&self, request: &RequestData) -> Result<Resolved, ResolveError> {
        self.resolve_callable(CallableRef::endpoint::<E>(), request, ResolveOptions::default())
            .await
    }

    /// Like [`resolve`](Resolver::resolve), with cancellation or a time limit.
    pub async fn resolve_with<E: Callable>(
        &self,
        request: &RequestData,
        options: ResolveOptions,
    ) -> Result<Resolved, ResolveError> {
        self.resolve_callable(CallableRef::endpoint::<E>(), request, options).await
    }

    /// Resolves the parameters of any callable without invoking it.
    ///
    /// On failure every resource acquired so far has already been released
    /// when this returns; the error that ended resolution is kept as the
    /// primary error and teardown failures are attached to it.
    pub async fn resolve_callable(
        &self,
        endpoint: CallableRef,
        request: &RequestData,
        options: ResolveOptions,
    ) -> Result<Resolved, ResolveError> {
        let span = tracing::debug_span!("resolve", endpoint = endpoint.id().short_name());
        let timeout = options.timeout.or_else(|| self.config().timeout());
        let mut ctx = ResolutionContext::new(self.config().max_depth);

        let outcome = {
            let work = self.resolve_endpoint(endpoint, request, &mut ctx);
            guarded(work, timeout, options.cancellation.as_ref())
                .instrument(span.clone())
                .await
        };

        match outcome {
            Ok(arguments) => Ok(Resolved::new(
                arguments,
                ctx.take_teardowns(),
                self.inner().observers.clone(),
            )),
            Err(error) => {
                let exit = exit_for(&error);
                let failures = cleanup::run_teardowns(ctx.take_teardowns(), &exit, &self.inner().observers)
                    .instrument(span)
                    .await;
                Err(ResolveError::new(error, failures))
            }
        }
    }

    /// Resolves `E`, calls `handler` with its arguments, then releases every
    /// generator resource with the handler's outcome.
    ///
    /// A handler error becomes [`DependError::Endpoint`]. If the handler
    /// succeeds but a teardown fails, the result is [`DependError::Teardown`].
    pub async fn run<E, F, Fut, R>(&self, request: &RequestData, handler: F) -> Result<R, ResolveError>
    where
        E: Callable,
        F: FnOnce(Arguments) -> Fut,
        Fut: Future<Output = Result<R, BoxError>>,
    {
        self.run_with::<E, F, Fut, R>(request, ResolveOptions::default(), handler)
            .await
    }

    /// Like [`run`](Resolver::run). The options bound resolution only, not
    /// the handler.
    pub async fn run_with<E, F, Fut, R>(
        &self,
        request: &RequestData,
        options: ResolveOptions,
        handler: F,
    ) -> Result<R, ResolveError>
    where
        E: Callable,
        F: FnOnce(Arguments) -> Fut,
        Fut: Future<Output = Result<R, BoxError>>,
    {
        let resolved = self.resolve_with::<E>(request, options).await?;
        let outcome = handler(resolved.arguments().clone()).await;

        let exit = match &outcome {
            Ok(_) => Exit::Success,
            Err(error) => Exit::Failure(error.to_string()),
        };
        let failures = resolved.release(exit).await;

        match outcome {
            Ok(value) if failures.is_empty() => Ok(value),
            Ok(_) => Err(ResolveError::new(DependError::Teardown(failures.len()), failures)),
            Err(error) => Err(ResolveError::new(DependError::Endpoint(error), failures)),
        }
    }

    /// Walks the static dependency graph of `E` without running anything.
    ///
    /// Every reachable callable is introspected (warming the signature
    /// cache), and configuration errors or cycles surface here instead of on
    /// the first request. Returns the number of distinct callables reached,
    /// the endpoint included.
    pub fn validate<E: Callable>(&self) -> DependResult<usize> {
        self.validate_callable(CallableRef::endpoint::<E>())
    }

    pub fn validate_callable(&self, endpoint: CallableRef) -> DependResult<usize> {
        let descriptor = self.describe_endpoint(&endpoint)?;
        let mut stack = ResolutionStack::new(self.config().max_depth);
        let mut visited = HashSet::new();
        for depends in descriptor.dependencies() {
            self.walk(self.target(depends), &mut stack, &mut visited)?;
        }
        Ok(visited.len() + 1)
    }

    fn walk(
        &self,
        callable: CallableRef,
        stack: &mut ResolutionStack,
        visited: &mut HashSet<CallableId>,
    ) -> DependResult<()> {
        let id = callable.id();
        if visited.contains(&id) {
            return Ok(());
        }
        if callable.is_endpoint() {
            return Err(endpoint_as_dependency(id));
        }

        stack.enter(id)?;
        let descriptor = self.inner().signatures.describe(&callable)?;
        for depends in descriptor.dependencies() {
            self.walk(self.target(depends), stack, visited)?;
        }
        stack.leave(id);

        visited.insert(id);
        Ok(())
    }

    /// The callable actually run for a use site, after overrides.
    fn target(&self, depends: &Depends) -> CallableRef {
        let original = depends.callable_ref();
        self.inner()
            .overrides
            .get(&original.id())
            .copied()
            .unwrap_or(*original)
    }

    fn resolve_endpoint<'a>(
        &'a self,
        endpoint: CallableRef,
        request: &'a RequestData,
        ctx: &'a mut ResolutionContext,
    ) -> BoxFuture<'a, DependResult<Arguments>> {
        Box::pin(async move {
            let descriptor = self.describe_endpoint(&endpoint)?;
            self.resolve_parameters(&descriptor, request, ctx).await
        })
    }

    /// Describes a callable used as the root of a resolution. Endpoints are
    /// never invoked, so scopes declared on one could never be checked.
    fn describe_endpoint(&self, endpoint: &CallableRef) -> DependResult<Arc<DependencyDescriptor>> {
        let descriptor = self.inner().signatures.describe(endpoint)?;
        if !descriptor.required_scopes().is_empty() {
            return Err(ConfigurationError {
                callable: endpoint.id(),
                reason: "scopes on an endpoint are never checked; declare them on a dependency".to_string(),
            }
            .into());
        }
        Ok(descriptor)
    }

    /// Resolves the parameters of one descriptor in declaration order,
    /// stopping at the first failure.
    fn resolve_parameters<'a>(
        &'a self,
        descriptor: &'a DependencyDescriptor,
        request: &'a RequestData,
        ctx: &'a mut ResolutionContext,
    ) -> BoxFuture<'a, DependResult<Arguments>> {
        Box::pin(async move {
            let mut arguments = Arguments::with_scopes(descriptor.required_scopes().clone());

            for parameter in descriptor.parameters() {
                let name = parameter.name().unwrap_or_default();
                let value = match parameter.source() {
                    ParamSource::Field(field) => extract::field(request, name, field)?,
                    ParamSource::Model(model) => extract::model(request, name, model)?,
                    ParamSource::Dependency(depends) => self.resolve_dependency(depends, request, ctx).await?,
                };

                if let Some(name) = parameter.name() {
                    arguments.insert(name, value);
                }
            }

            Ok(arguments)
        })
    }

    fn resolve_dependency<'a>(
        &'a self,
        depends: &'a Depends,
        request: &'a RequestData,
        ctx: &'a mut ResolutionContext,
    ) -> BoxFuture<'a, DependResult<AnyArc>> {
        Box::pin(async move {
            let callable = self.target(depends);
            let id = callable.id();

            if depends.uses_cache() {
                if let Some(value) = ctx.cached(&callable) {
                    self.inner().observers.cache_hit(id);
                    tracing::trace!(callable = id.short_name(), "request cache hit");
                    return Ok(value);
                }
            }

            if let Err(error) = ctx.enter(id) {
                self.inner().observers.failed(id, &error);
                return Err(error);
            }
            let result = self.execute(callable, request, ctx).await;
            ctx.leave(id);

            let value = match result {
                Ok(value) => value,
                Err(error) => {
                    self.inner().observers.failed(id, &error);
                    return Err(error);
                }
            };

            if depends.uses_cache() {
                ctx.store(&callable, value.clone());
            }
            Ok(value)
        })
    }

    /// Resolves the parameters of `callable`, then invokes it. A started
    /// generator leaves its teardown on the context.
    fn execute<'a>(
        &'a self,
        callable: CallableRef,
        request: &'a RequestData,
        ctx: &'a mut ResolutionContext,
    ) -> BoxFuture<'a, DependResult<AnyArc>> {
        Box::pin(async move {
            let id = callable.id();
            if callable.is_endpoint() {
                return Err(endpoint_as_dependency(id));
            }

            let descriptor = self.inner().signatures.describe(&callable)?;
            let arguments = self.resolve_parameters(&descriptor, request, ctx).await?;

            self.inner().observers.resolving(id);
            let started = Instant::now();

            let value = match callable.body() {
                Body::Plain(call) => call(arguments)
                    .await
                    .map_err(|error| body_error(&descriptor, error))?,
                Body::Generator(start) => {
                    let (value, teardown) = start(arguments)
                        .await
                        .map_err(|error| body_error(&descriptor, error))?;
                    ctx.push_teardown(id, teardown);
                    value
                }
                Body::Endpoint => return Err(endpoint_as_dependency(id)),
            };

            self.inner().observers.resolved(id, started.elapsed());
            Ok(value)
        })
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("config", &self.inner().config)
            .field("observers", &self.inner().observers.len())
            .field("overrides", &self.inner().overrides.len())
            .field("signatures", &self.inner().signatures)
            .finish()
    }
}

/// Maps an error raised by a dependency body: a scope-failure signal becomes
/// a [`SecurityError`](crate::SecurityError), anything else is wrapped with
/// the original error kept as its source.
fn body_error(descriptor: &DependencyDescriptor, error: BoxError) -> DependError {
    let callable = descriptor.callable_id();
    match check_scopes(callable, descriptor.required_scopes(), error) {
        Ok(security) => DependError::Security(security),
        Err(source) => DependError::Dependency { callable, source },
    }
}

fn endpoint_as_dependency(callable: CallableId) -> DependError {
    ConfigurationError {
        callable,
        reason: "an endpoint cannot be used as a dependency".to_string(),
    }
    .into()
}

fn exit_for(error: &DependError) -> Exit {
    match error {
        DependError::Cancelled | DependError::Timeout(_) => Exit::Cancelled,
        other => Exit::Failure(other.to_string()),
    }
}

/// Runs `work` until it finishes, `cancel` fires or `timeout` elapses.
async fn guarded<T, W>(work: W, timeout: Option<Duration>, cancel: Option<&CancellationToken>) -> DependResult<T>
where
    W: Future<Output = DependResult<T>>,
{
    let cancelled = async {
        match cancel {
            Some(token) => token.cancelled().await,
            None => futures::future::pending::<()>().await,
        }
    };

    let bounded = async {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(result) => result,
                Err(_) => Err(DependError::Timeout(limit)),
            },
            None => work.await,
        }
    };

    tokio::select! {
        biased;
        _ = cancelled => Err(DependError::Cancelled),
        result = bounded => result,
    }
}
