//! Dependency identification keys.
//!
//! [`DependencyKey`] identifies a registrable or requestable type. One
//! concrete service answers to two linked keys: its value key (`T`) and
//! its pointer key (`Arc<T>`). Trait objects are requested through the
//! interface key (`Arc<dyn I>`).

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The form in which a type is registered or requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyShape {
    /// The concrete type itself, `T`.
    Value,
    /// A shared pointer to a concrete type, `Arc<T>`.
    Pointer,
    /// A shared pointer to a trait object, `Arc<dyn I>`.
    Interface,
}

impl fmt::Display for KeyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyShape::Value => write!(f, "value"),
            KeyShape::Pointer => write!(f, "pointer"),
            KeyShape::Interface => write!(f, "interface"),
        }
    }
}

/// Uniquely identifies a dependency in the container.
///
/// Keys compare and hash by [`TypeId`] only. The [`KeyShape`] is
/// carried along for diagnostics.
///
/// # Examples
/// ```
/// use anbar_container::key::{DependencyKey, KeyShape};
///
/// struct Mailer;
///
/// let value = DependencyKey::of::<Mailer>();
/// let pointer = DependencyKey::pointer::<Mailer>();
/// assert_ne!(value, pointer);
/// assert_eq!(pointer.shape(), KeyShape::Pointer);
/// ```
#[derive(Clone)]
pub struct DependencyKey {
    type_id: TypeId,
    type_name: &'static str,
    shape: KeyShape,
}

impl DependencyKey {
    /// Creates the value key for `T`.
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            shape: KeyShape::Value,
        }
    }

    /// Creates the pointer key for `T`, i.e. the key of `Arc<T>`.
    ///
    /// `T` may be unsized, so this is also the key under which shared
    /// trait objects registered through `add_shared` are found.
    #[inline]
    pub fn pointer<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<Arc<T>>(),
            type_name: type_name::<Arc<T>>(),
            shape: KeyShape::Pointer,
        }
    }

    /// Creates the interface key for the trait object `I`.
    ///
    /// ```
    /// use anbar_container::key::DependencyKey;
    ///
    /// trait Clock {}
    /// let key = DependencyKey::interface::<dyn Clock>();
    /// assert!(key.is_interface());
    /// assert_eq!(key, DependencyKey::pointer::<dyn Clock>());
    /// ```
    #[inline]
    pub fn interface<I: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<Arc<I>>(),
            type_name: type_name::<Arc<I>>(),
            shape: KeyShape::Interface,
        }
    }

    /// Creates a key from raw parts.
    ///
    /// Prefer the typed constructors; this exists for hand-written
    /// [`Shape`](crate::Shape) implementations that borrow another
    /// service's key under their own name.
    ///
    /// ```rust
    /// use std::any::TypeId;
    /// use std::sync::Arc;
    /// use anbar_container::{Container, DependencyKey, Instance, KeyShape, Result, Shape};
    ///
    /// struct Config { port: u16 }
    ///
    /// /// Resolves the `Config` service but hands out only its port.
    /// struct Port(u16);
    ///
    /// impl Shape for Port {
    ///     fn key() -> Result<DependencyKey> {
    ///         Ok(DependencyKey::from_raw(TypeId::of::<Arc<Config>>(), "Port", KeyShape::Pointer))
    ///     }
    ///
    ///     fn unwrap(instance: &Instance) -> Result<Self> {
    ///         let config = <Arc<Config> as Shape>::unwrap(instance)?;
    ///         Ok(Port(config.port))
    ///     }
    /// }
    ///
    /// assert_eq!(Port::key().unwrap(), DependencyKey::pointer::<Config>());
    ///
    /// let mut container = Container::new();
    /// container.add_value(Config { port: 8080 });
    /// container.build();
    ///
    /// let Port(port) = container.require_service::<Port>().unwrap();
    /// assert_eq!(port, 8080);
    /// ```
    #[inline]
    pub fn from_raw(type_id: TypeId, type_name: &'static str, shape: KeyShape) -> Self {
        Self { type_id, type_name, shape }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the full Rust type name, for error messages.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn shape(&self) -> KeyShape {
        self.shape
    }

    #[inline]
    pub fn is_interface(&self) -> bool {
        self.shape == KeyShape::Interface
    }

    /// Returns the type name with module paths stripped.
    pub fn short_name(&self) -> String {
        anbar_support::rendering::shorten_type_name(self.type_name)
    }
}

impl PartialEq for DependencyKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for DependencyKey {}

impl Hash for DependencyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DependencyKey({}, {})", self.type_name, self.shape)
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Ledger;
    trait Audit {}

    #[test]
    fn value_key_names_the_type() {
        let key = DependencyKey::of::<Ledger>();
        assert!(key.type_name().ends_with("Ledger"));
        assert_eq!(key.shape(), KeyShape::Value);
        assert_eq!(key.short_name(), "Ledger");
    }

    #[test]
    fn same_type_same_key() {
        assert_eq!(DependencyKey::of::<Ledger>(), DependencyKey::of::<Ledger>());
    }

    #[test]
    fn value_and_pointer_keys_differ() {
        assert_ne!(DependencyKey::of::<Ledger>(), DependencyKey::pointer::<Ledger>());
        assert_eq!(DependencyKey::pointer::<Ledger>().short_name(), "Arc<Ledger>");
    }

    #[test]
    fn pointer_key_matches_arc_value_key() {
        assert_eq!(
            DependencyKey::pointer::<Ledger>(),
            DependencyKey::of::<Arc<Ledger>>()
        );
    }

    #[test]
    fn interface_key_for_trait_object() {
        let key = DependencyKey::interface::<dyn Audit>();
        assert!(key.is_interface());
        assert_eq!(key.short_name(), "Arc<dyn Audit>");
    }

    #[test]
    fn shape_does_not_affect_lookup() {
        let mut map = HashMap::new();
        map.insert(DependencyKey::interface::<dyn Audit>(), "audit");
        assert_eq!(map.get(&DependencyKey::pointer::<dyn Audit>()), Some(&"audit"));
        assert_eq!(map.get(&DependencyKey::of::<Ledger>()), None);
    }
}
