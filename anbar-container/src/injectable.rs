//! The construction contract between services and the container.
//!
//! A service is any `Send + Sync + 'static` type implementing
//! [`Injectable`]: it names its dependencies through an associated
//! [`Dependencies`] type and builds itself from the resolved values.
//! Dependencies are requested as [`Shape`]s, normally `Arc<T>` for a
//! concrete service or `Arc<dyn Trait>` for an interface.
//!
//! ```rust
//! use std::sync::Arc;
//! use anbar_container::{BoxError, Injectable};
//!
//! struct Config { url: String }
//! struct Database { url: String }
//!
//! impl Injectable for Config {
//!     type Deps = ();
//!     fn init((): ()) -> Result<Self, BoxError> {
//!         Ok(Config { url: "postgres://localhost".into() })
//!     }
//! }
//!
//! impl Injectable for Database {
//!     type Deps = (Arc<Config>,);
//!     fn init((config,): Self::Deps) -> Result<Self, BoxError> {
//!         Ok(Database { url: config.url.clone() })
//!     }
//! }
//! ```
//!
//! Tuples up to sixteen elements resolve through a fixed-arity path.
//! Initializers that need more, or that decide their dependency list at
//! runtime, use [`DynamicDeps`] and override
//! [`Injectable::dependencies`].

use std::any::{Any, type_name};
use std::sync::Arc;

use crate::error::{AnbarError, BoxError, Result};
use crate::key::DependencyKey;

/// A constructed service, type-erased.
///
/// Call sites store the concrete service as `Arc<T>` behind this type.
/// Values handed to [`Shape::unwrap`] hold the requested form itself
/// (an `Arc<T>` or `Arc<dyn I>`) behind one more `Arc`.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Builds a service instance from its resolved dependencies, in
/// declaration order.
pub(crate) type FactoryFn = Arc<dyn Fn(Vec<Instance>) -> Result<Instance> + Send + Sync>;

/// A type the container can construct.
pub trait Injectable: Sized + Send + Sync + 'static {
    /// The initializer's parameters, in order.
    type Deps: Dependencies;

    /// Keys of the declared dependencies, in initializer order.
    ///
    /// Only override this together with [`DynamicDeps`].
    fn dependencies() -> Result<Vec<DependencyKey>> {
        Self::Deps::keys()
    }

    /// Builds the service. Returning an error aborts the resolution that
    /// triggered construction.
    fn init(deps: Self::Deps) -> std::result::Result<Self, BoxError>;
}

/// A form in which a service can be requested.
///
/// Implemented for `Arc<X>`, where `X` is a concrete service or a trait
/// object registered as an interface.
pub trait Shape: Sized + Send + Sync + 'static {
    /// The key this shape is registered under.
    fn key() -> Result<DependencyKey>;

    /// Extracts `Self` from a projected instance.
    fn unwrap(instance: &Instance) -> Result<Self>;
}

impl<X: ?Sized + Send + Sync + 'static> Shape for Arc<X> {
    fn key() -> Result<DependencyKey> {
        Ok(DependencyKey::pointer::<X>())
    }

    fn unwrap(instance: &Instance) -> Result<Self> {
        (**instance)
            .downcast_ref::<Arc<X>>()
            .cloned()
            .ok_or(AnbarError::UnwrapFailed {
                expected: type_name::<Arc<X>>(),
                reason: "stored instance has a different type",
            })
    }
}

/// The dependency list of an initializer.
pub trait Dependencies: Sized {
    /// Keys of every element, in order.
    fn keys() -> Result<Vec<DependencyKey>>;

    /// Assembles `Self` from projected instances, in key order.
    fn from_resolved(resolved: Vec<Instance>) -> Result<Self>;
}

macro_rules! impl_dependencies {
    ($($shape:ident $var:ident),*) => {
        impl<$($shape: Shape),*> Dependencies for ($($shape,)*) {
            fn keys() -> Result<Vec<DependencyKey>> {
                Ok(vec![$($shape::key()?),*])
            }

            fn from_resolved(resolved: Vec<Instance>) -> Result<Self> {
                let [$($var),*] = resolved.as_slice() else {
                    return Err(AnbarError::UnwrapFailed {
                        expected: type_name::<Self>(),
                        reason: "wrong number of resolved dependencies",
                    });
                };
                Ok(($($shape::unwrap($var)?,)*))
            }
        }
    };
}

impl_dependencies!();
impl_dependencies!(A a);
impl_dependencies!(A a, B b);
impl_dependencies!(A a, B b, C c);
impl_dependencies!(A a, B b, C c, D d);
impl_dependencies!(A a, B b, C c, D d, E e);
impl_dependencies!(A a, B b, C c, D d, E e, F f);
impl_dependencies!(A a, B b, C c, D d, E e, F f, G g);
impl_dependencies!(A a, B b, C c, D d, E e, F f, G g, H h);
impl_dependencies!(A a, B b, C c, D d, E e, F f, G g, H h, I i);
impl_dependencies!(A a, B b, C c, D d, E e, F f, G g, H h, I i, J j);
impl_dependencies!(A a, B b, C c, D d, E e, F f, G g, H h, I i, J j, K k);
impl_dependencies!(A a, B b, C c, D d, E e, F f, G g, H h, I i, J j, K k, L l);
impl_dependencies!(A a, B b, C c, D d, E e, F f, G g, H h, I i, J j, K k, L l, M m);
impl_dependencies!(A a, B b, C c, D d, E e, F f, G g, H h, I i, J j, K k, L l, M m, N n);
impl_dependencies!(A a, B b, C c, D d, E e, F f, G g, H h, I i, J j, K k, L l, M m, N n, O o);
impl_dependencies!(A a, B b, C c, D d, E e, F f, G g, H h, I i, J j, K k, L l, M m, N n, O o, P p);

/// Dependencies resolved without a fixed arity.
///
/// The keys come from an overridden [`Injectable::dependencies`]; values
/// are read back by position.
///
/// ```rust
/// use std::sync::Arc;
/// use anbar_container::{BoxError, DependencyKey, DynamicDeps, Injectable, Result};
///
/// struct Clock;
/// struct Report { clock: Arc<Clock> }
///
/// impl Injectable for Report {
///     type Deps = DynamicDeps;
///
///     fn dependencies() -> Result<Vec<DependencyKey>> {
///         Ok(vec![DependencyKey::pointer::<Clock>()])
///     }
///
///     fn init(deps: DynamicDeps) -> std::result::Result<Self, BoxError> {
///         Ok(Report { clock: deps.get(0)? })
///     }
/// }
/// ```
#[derive(Clone)]
pub struct DynamicDeps {
    resolved: Vec<Instance>,
}

impl DynamicDeps {
    /// Reads the dependency at `index` as shape `S`.
    pub fn get<S: Shape>(&self, index: usize) -> Result<S> {
        let instance = self.resolved.get(index).ok_or(AnbarError::UnwrapFailed {
            expected: type_name::<S>(),
            reason: "dependency index out of range",
        })?;
        S::unwrap(instance)
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

impl Dependencies for DynamicDeps {
    fn keys() -> Result<Vec<DependencyKey>> {
        Ok(Vec::new())
    }

    fn from_resolved(resolved: Vec<Instance>) -> Result<Self> {
        Ok(Self { resolved })
    }
}

/// Declares that `Arc<Self>` can be viewed as `Arc<I>`.
///
/// This is the bound that lets a service be registered under an
/// interface; the [`implements!`](crate::implements) macro writes the
/// usual unsizing impl.
pub trait Implements<I: ?Sized>: Send + Sync + 'static {
    fn upcast(self: Arc<Self>) -> Arc<I>;
}

/// Implements [`Implements`] for one type and any number of trait
/// objects.
///
/// ```rust
/// use anbar_container::implements;
///
/// trait Greeter: Send + Sync { fn greet(&self) -> String; }
/// trait Named: Send + Sync { fn name(&self) -> &str; }
///
/// struct English;
/// impl Greeter for English { fn greet(&self) -> String { "hello".into() } }
/// impl Named for English { fn name(&self) -> &str { "en" } }
///
/// implements!(English => dyn Greeter, dyn Named);
/// ```
#[macro_export]
macro_rules! implements {
    ($ty:ty => $($iface:ty),+ $(,)?) => {
        $(
            impl $crate::Implements<$iface> for $ty {
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$iface> {
                    self
                }
            }
        )+
    };
}

/// The factory the container stores for an [`Injectable`] type.
pub(crate) fn factory_for<T: Injectable>() -> FactoryFn {
    Arc::new(construct::<T>)
}

fn construct<T: Injectable>(resolved: Vec<Instance>) -> Result<Instance> {
    let deps = T::Deps::from_resolved(resolved)?;
    let service = T::init(deps).map_err(|source| AnbarError::InitFailed {
        key: DependencyKey::of::<T>(),
        source: Arc::from(source),
    })?;
    Ok(Arc::new(service))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Config {
        name: &'static str,
    }

    struct Service {
        config: Arc<Config>,
    }

    impl Injectable for Service {
        type Deps = (Arc<Config>,);

        fn init((config,): Self::Deps) -> std::result::Result<Self, BoxError> {
            if config.name.is_empty() {
                return Err("config name is empty".into());
            }
            Ok(Service { config })
        }
    }

    fn projected<T: Send + Sync + 'static>(value: T) -> Instance {
        Arc::new(Arc::new(value))
    }

    #[test]
    fn tuple_keys_follow_declaration_order() {
        let keys = <(Arc<Config>, Arc<Service>)>::keys().unwrap();
        assert_eq!(
            keys,
            vec![DependencyKey::pointer::<Config>(), DependencyKey::pointer::<Service>()]
        );
    }

    #[test]
    fn unit_has_no_dependencies() {
        assert!(<()>::keys().unwrap().is_empty());
        assert!(<()>::from_resolved(Vec::new()).is_ok());
    }

    #[test]
    fn tuple_rejects_wrong_arity() {
        let result = <(Arc<Config>,)>::from_resolved(Vec::new());
        assert!(matches!(result, Err(AnbarError::UnwrapFailed { .. })));
    }

    #[test]
    fn shape_unwrap_rejects_other_types() {
        let instance = projected(Config { name: "x" });
        assert!(<Arc<Config> as Shape>::unwrap(&instance).is_ok());
        assert!(matches!(
            <Arc<Service> as Shape>::unwrap(&instance),
            Err(AnbarError::UnwrapFailed { .. })
        ));
    }

    #[test]
    fn factory_runs_initializer() {
        let factory = factory_for::<Service>();
        let instance = factory(vec![projected(Config { name: "main" })]).unwrap();
        let service = instance.downcast::<Service>().ok().unwrap();
        assert_eq!(service.config.name, "main");
    }

    #[test]
    fn factory_wraps_initializer_error() {
        let factory = factory_for::<Service>();
        let err = factory(vec![projected(Config { name: "" })]).err().unwrap();
        match err {
            AnbarError::InitFailed { key, source } => {
                assert_eq!(key, DependencyKey::of::<Service>());
                assert_eq!(source.to_string(), "config name is empty");
            }
            other => panic!("Expected InitFailed, got: {other:?}"),
        }
    }

    #[test]
    fn dynamic_deps_read_by_position() {
        let deps = DynamicDeps::from_resolved(vec![projected(Config { name: "dyn" })]).unwrap();
        assert_eq!(deps.len(), 1);
        let config: Arc<Config> = deps.get(0).unwrap();
        assert_eq!(config.name, "dyn");
        assert!(deps.get::<Arc<Config>>(1).is_err());
    }
}
