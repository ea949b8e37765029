//! Declared parameter lists and the builder callables use to describe them.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::arguments::AnyArc;
use crate::descriptors::{CallableRef, DependencyDescriptor};
use crate::error::{ConfigurationError, Location};
use crate::key::CallableId;
use crate::security::{validate_scope, SecurityScopes};
use crate::traits::{Dependency, GeneratorDependency};

/// A primitive request-field extractor.
///
/// By default the field is read under the parameter's own name; header
/// parameters have `_` turned into `-` (`user_agent` reads `user-agent`).
/// An alias replaces the key verbatim.
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::{Field, Location};
/// use serde_json::json;
///
/// let field = Field::header();
/// assert_eq!(field.key("x_token"), "x-token");
///
/// let aliased = Field::query().alias("item-query").default(json!("all"));
/// assert_eq!(aliased.key("q"), "item-query");
/// assert_eq!(aliased.location(), Location::Query);
/// assert!(!aliased.is_required());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    location: Location,
    alias: Option<&'static str>,
    default: Option<Value>,
    required: bool,
}

impl Field {
    fn at(location: Location) -> Self {
        Self {
            location,
            alias: None,
            default: None,
            required: true,
        }
    }

    pub fn path() -> Self {
        Self::at(Location::Path)
    }

    pub fn query() -> Self {
        Self::at(Location::Query)
    }

    pub fn header() -> Self {
        Self::at(Location::Header)
    }

    pub fn cookie() -> Self {
        Self::at(Location::Cookie)
    }

    /// A member of a JSON object body.
    pub fn body() -> Self {
        Self::at(Location::Body)
    }

    pub fn alias(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }

    /// Value used when the request does not carry the field.
    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self.required = false;
        self
    }

    /// Missing values resolve to `null` instead of failing.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// The key this field reads for a parameter named `name`.
    pub fn key(&self, name: &str) -> String {
        match (self.alias, self.location) {
            (Some(alias), _) => alias.to_string(),
            (None, Location::Header) => name.replace('_', "-"),
            (None, _) => name.to_string(),
        }
    }
}

/// Converts a JSON value into a model instance.
pub(crate) type ModelAdapter = fn(&Value) -> Result<AnyArc, serde_json::Error>;

fn adapt<T>(value: &Value) -> Result<AnyArc, serde_json::Error>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let model = T::deserialize(value)?;
    Ok(Arc::new(model))
}

/// A nested model deserialized from the request body.
///
/// A plain model consumes the whole body; an embedded one reads the body
/// member named after the parameter (or its alias).
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::Model;
///
/// #[derive(serde::Deserialize)]
/// struct Item { name: String }
///
/// let whole_body = Model::of::<Item>();
/// assert!(!whole_body.is_embedded());
///
/// let member = Model::of::<Item>().embed();
/// assert!(member.is_embedded());
/// ```
#[derive(Clone)]
pub struct Model {
    type_id: TypeId,
    type_name: &'static str,
    adapter: ModelAdapter,
    embed: bool,
    alias: Option<&'static str>,
}

impl Model {
    pub fn of<T>() -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            adapter: adapt::<T>,
            embed: false,
            alias: None,
        }
    }

    pub fn embed(mut self) -> Self {
        self.embed = true;
        self
    }

    /// Embeds the model under an explicit body key.
    pub fn alias(mut self, alias: &'static str) -> Self {
        self.embed = true;
        self.alias = Some(alias);
        self
    }

    pub fn is_embedded(&self) -> bool {
        self.embed
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn key(&self, name: &'static str) -> &'static str {
        self.alias.unwrap_or(name)
    }

    pub(crate) fn adapter(&self) -> ModelAdapter {
        self.adapter
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("type_name", &self.type_name)
            .field("embed", &self.embed)
            .field("alias", &self.alias)
            .finish()
    }
}

/// A use of another dependency.
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::{async_trait, Arguments, BoxError, Callable, Dependency, Depends, SignatureBuilder};
///
/// struct Settings;
///
/// impl Callable for Settings {
///     fn declare(_sig: &mut SignatureBuilder) {}
/// }
///
/// #[async_trait]
/// impl Dependency for Settings {
///     type Output = String;
///     async fn call(_args: Arguments) -> Result<String, BoxError> {
///         Ok("prod".into())
///     }
/// }
///
/// let cached = Depends::on::<Settings>();
/// assert!(cached.uses_cache());
///
/// let fresh = Depends::on::<Settings>().no_cache();
/// assert!(!fresh.uses_cache());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Depends {
    callable: CallableRef,
    use_cache: bool,
}

impl Depends {
    /// Uses a plain dependency.
    pub fn on<D: Dependency>() -> Self {
        Self::callable(CallableRef::plain::<D>())
    }

    /// Uses a generator dependency.
    pub fn generator<G: GeneratorDependency>() -> Self {
        Self::callable(CallableRef::generator::<G>())
    }

    pub fn callable(callable: CallableRef) -> Self {
        Self {
            callable,
            use_cache: true,
        }
    }

    /// Runs the dependency on every use instead of reusing the value
    /// already computed for this request.
    pub fn no_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn callable_ref(&self) -> &CallableRef {
        &self.callable
    }

    pub fn uses_cache(&self) -> bool {
        self.use_cache
    }
}

/// Where one parameter's value comes from.
#[derive(Debug, Clone)]
pub enum ParamSource {
    Field(Field),
    Model(Model),
    Dependency(Depends),
}

impl From<Field> for ParamSource {
    fn from(field: Field) -> Self {
        ParamSource::Field(field)
    }
}

impl From<Model> for ParamSource {
    fn from(model: Model) -> Self {
        ParamSource::Model(model)
    }
}

impl From<Depends> for ParamSource {
    fn from(depends: Depends) -> Self {
        ParamSource::Dependency(depends)
    }
}

/// One declared parameter.
///
/// Unnamed parameters are always dependencies that run for their side
/// effects only; their value never reaches the argument mapping.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: Option<&'static str>,
    source: ParamSource,
}

impl Parameter {
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    pub fn source(&self) -> &ParamSource {
        &self.source
    }

    pub(crate) fn reads_whole_body(&self) -> bool {
        matches!(&self.source, ParamSource::Model(model) if !model.is_embedded())
    }

    pub(crate) fn reads_body(&self) -> bool {
        match &self.source {
            ParamSource::Field(field) => field.location() == Location::Body,
            ParamSource::Model(_) => true,
            ParamSource::Dependency(_) => false,
        }
    }
}

/// Collects the parameter list of one callable during introspection.
///
/// Problems are recorded rather than panicking; the first one becomes the
/// callable's [`ConfigurationError`] when the descriptor is built.
pub struct SignatureBuilder {
    callable: CallableId,
    parameters: Vec<Parameter>,
    scopes: Vec<String>,
    problems: Vec<String>,
}

impl SignatureBuilder {
    pub(crate) fn new(callable: CallableId) -> Self {
        Self {
            callable,
            parameters: Vec::new(),
            scopes: Vec::new(),
            problems: Vec::new(),
        }
    }

    /// The callable being introspected.
    pub fn callable(&self) -> CallableId {
        self.callable
    }

    /// Declares a named parameter.
    pub fn param(&mut self, name: &'static str, source: impl Into<ParamSource>) -> &mut Self {
        self.parameters.push(Parameter {
            name: Some(name),
            source: source.into(),
        });
        self
    }

    /// Declares a dependency that runs for its side effects only.
    pub fn depends(&mut self, depends: Depends) -> &mut Self {
        self.parameters.push(Parameter {
            name: None,
            source: ParamSource::Dependency(depends),
        });
        self
    }

    /// Declares the authorization scopes this callable requires.
    pub fn scopes<I, S>(&mut self, scopes: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes.extend(scopes.into_iter().map(Into::into));
        self
    }

    /// Marks the signature as impossible to describe.
    pub fn reject(&mut self, reason: impl Into<String>) -> &mut Self {
        self.problems.push(reason.into());
        self
    }

    pub(crate) fn finish(mut self) -> Result<DependencyDescriptor, ConfigurationError> {
        self.check();
        if let Some(reason) = self.problems.into_iter().next() {
            return Err(ConfigurationError {
                callable: self.callable,
                reason,
            });
        }
        Ok(DependencyDescriptor::new(
            self.callable,
            self.parameters,
            SecurityScopes::new(self.scopes),
        ))
    }

    fn check(&mut self) {
        let mut seen: Vec<&'static str> = Vec::new();
        for parameter in &self.parameters {
            let Some(name) = parameter.name else { continue };
            if name.is_empty() {
                self.problems.push("parameter name must not be empty".to_string());
            } else if seen.contains(&name) {
                self.problems.push(format!("parameter `{}` is declared twice", name));
            }
            seen.push(name);

            if let ParamSource::Field(field) = &parameter.source {
                if field.location() == Location::Path && !field.is_required() {
                    self.problems.push(format!("path parameter `{}` cannot be optional", name));
                }
            }
        }

        let whole_body = self.parameters.iter().filter(|p| p.reads_whole_body()).count();
        let body = self.parameters.iter().filter(|p| p.reads_body()).count();
        if whole_body > 0 && body > 1 {
            self.problems.push(
                "ambiguous body: a whole-body model cannot share the body with other parameters; embed it".to_string(),
            );
        }

        for scope in &self.scopes {
            if let Err(reason) = validate_scope(scope) {
                self.problems.push(reason);
            }
        }
    }
}

impl fmt::Debug for SignatureBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureBuilder")
            .field("callable", &self.callable)
            .field("parameters", &self.parameters.len())
            .field("scopes", &self.scopes)
            .finish()
    }
}
