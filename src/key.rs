//! Callable identity used as the key of every cache in the engine.

use std::any::TypeId;
use std::fmt;

/// Stable identity of a callable (endpoint or dependency).
///
/// Every callable is a Rust type implementing [`Callable`](crate::Callable),
/// so its identity is the `TypeId` of that type. The type name is carried
/// along for diagnostics only: two ids are equal exactly when their type ids
/// are equal.
///
/// Two callables that behave identically but are distinct types are distinct
/// ids and are never deduplicated.
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::{callable_id, CallableId};
///
/// struct LoadUser;
/// struct LoadOrder;
///
/// let a: CallableId = callable_id::<LoadUser>();
/// assert_eq!(a, callable_id::<LoadUser>());
/// assert_ne!(a, callable_id::<LoadOrder>());
/// assert!(a.name().ends_with("LoadUser"));
/// ```
#[derive(Clone, Copy)]
pub struct CallableId {
    type_id: TypeId,
    name: &'static str,
}

impl CallableId {
    /// Creates an id from a type id and its diagnostic name.
    pub const fn new(type_id: TypeId, name: &'static str) -> Self {
        Self { type_id, name }
    }

    /// The underlying type id.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Full type name of the callable.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path, for compact log lines.
    ///
    /// ```rust
    /// use ferrous_depends::callable_id;
    ///
    /// mod auth { pub struct CurrentUser; }
    /// assert_eq!(callable_id::<auth::CurrentUser>().short_name(), "CurrentUser");
    /// ```
    pub fn short_name(&self) -> &'static str {
        // Generic parameters may contain paths too; only strip the outer one.
        let head = match self.name.find('<') {
            Some(pos) => &self.name[..pos],
            None => self.name,
        };
        match head.rfind("::") {
            Some(pos) => &self.name[pos + 2..],
            None => self.name,
        }
    }
}

// Equality and hashing ignore the name: the type id alone is the identity.
impl PartialEq for CallableId {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for CallableId {}

impl std::hash::Hash for CallableId {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for CallableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CallableId").field(&self.name).finish()
    }
}

impl fmt::Display for CallableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Returns the identity of callable type `T`.
#[inline(always)]
pub fn callable_id<T: 'static>() -> CallableId {
    CallableId::new(TypeId::of::<T>(), std::any::type_name::<T>())
}
