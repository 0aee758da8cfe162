//! Tracked-entity identity
//!
//! A tracked entity is either a runtime type (records, query managers) or a
//! `"<module-path>.<qualified-name>"` key for an instrumented callable. The
//! two shapes are an explicit tagged variant rather than duck typing, so the
//! signature store and suppression stack can compare and hash them with a
//! single contract: two identities denoting the same real-world entity
//! compare equal.

use std::any::TypeId;

/// Declares a type as trackable.
///
/// `ancestors` makes class-relationship suppression explicit: suppressing a
/// base type also suppresses every type that lists it as an ancestor.
pub trait Tracked: 'static {
    /// Display name used in log output
    fn display_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Ancestor types for subtype suppression checks (defaults to none)
    fn ancestors() -> Vec<TypeId> {
        Vec::new()
    }
}

/// Identity of a type-tracked entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
    ancestors: Vec<TypeId>,
}

impl TypeRef {
    /// Identity of `T`
    pub fn of<T: Tracked>() -> Self {
        TypeRef {
            id: TypeId::of::<T>(),
            name: T::display_name(),
            ancestors: T::ancestors(),
        }
    }

    /// The underlying type id
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Display name of the type
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True when this type is `other` or lists `other` as an ancestor
    pub fn is_subtype_of(&self, other: TypeId) -> bool {
        self.id == other || self.ancestors.contains(&other)
    }
}

/// Tagged identity: a runtime type or a qualified callable name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityId {
    /// A record or manager runtime type
    Type(TypeRef),
    /// A `"<module-path>.<qualified-name>"` callable key
    Name(String),
}

impl EntityId {
    /// Identity of the tracked type `T`
    pub fn of_type<T: Tracked>() -> Self {
        EntityId::Type(TypeRef::of::<T>())
    }

    /// Identity of a named callable, keyed by module path and qualified
    /// name so separately obtained references to the same callable match
    pub fn named(module_path: &str, qualname: &str) -> Self {
        EntityId::Name(format!("{module_path}.{qualname}"))
    }

    /// Name rendered in log output
    pub fn display_name(&self) -> &str {
        match self {
            EntityId::Type(t) => t.name(),
            EntityId::Name(n) => n,
        }
    }
}
