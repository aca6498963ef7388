//! Resolution scopes.
//!
//! The container resolves through its global scope, which never caches
//! anything and refuses Scoped services. A request scope from
//! [`Container::create_scope`] keeps one instance of each Scoped service
//! for as long as the scope value lives.

use std::sync::Arc;

use dashmap::DashMap;

use crate::container::Container;
use crate::error::Result;
use crate::injectable::{Instance, Shape};
use crate::registry::SiteId;

/// Instance storage behind a [`Scope`].
#[derive(Debug)]
pub(crate) enum ScopeCache {
    Global,
    Request(DashMap<SiteId, Instance>),
}

impl ScopeCache {
    pub fn request() -> Self {
        ScopeCache::Request(DashMap::new())
    }

    pub fn get(&self, site: SiteId) -> Option<Instance> {
        match self {
            ScopeCache::Global => None,
            ScopeCache::Request(instances) => instances.get(&site).map(|entry| entry.value().clone()),
        }
    }

    /// Stores `instance` unless another one got there first, and returns
    /// the instance that is now cached.
    pub fn insert(&self, site: SiteId, instance: Instance) -> Instance {
        match self {
            ScopeCache::Global => instance,
            ScopeCache::Request(instances) => instances.entry(site).or_insert(instance).value().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ScopeCache::Global => 0,
            ScopeCache::Request(instances) => instances.len(),
        }
    }
}

/// A cache boundary for Scoped services.
///
/// Obtained from [`Container::create_scope`]. Within one scope every
/// Scoped service is constructed at most once; separate scopes never
/// share instances. Dropping the scope drops its instances.
///
/// # Examples
/// ```rust
/// use std::sync::Arc;
/// use anbar_container::{BoxError, Container, Injectable};
///
/// struct RequestId(u32);
///
/// impl Injectable for RequestId {
///     type Deps = ();
///     fn init((): ()) -> Result<Self, BoxError> {
///         Ok(RequestId(7))
///     }
/// }
///
/// let mut container = Container::new();
/// container.add_scoped::<RequestId>();
/// container.build();
///
/// let scope = container.create_scope();
/// let first: Arc<RequestId> = scope.require_service().unwrap();
/// let second: Arc<RequestId> = scope.require_service().unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
///
/// assert!(container.require_service::<Arc<RequestId>>().is_err());
/// ```
#[derive(Debug)]
pub struct Scope<'c> {
    container: &'c Container,
    cache: ScopeCache,
}

impl<'c> Scope<'c> {
    pub(crate) fn new(container: &'c Container, cache: ScopeCache) -> Self {
        Self { container, cache }
    }

    /// Resolves `S` within this scope.
    ///
    /// # Errors
    /// See [`Container::require_service`].
    pub fn require_service<S: Shape>(&self) -> Result<S> {
        self.container.resolve::<S>(&self.cache)
    }

    /// Resolves the concrete service `T` within this scope.
    pub fn require_service_ptr<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.container.resolve_ptr::<T>(&self.cache)
    }

    /// Returns `true` for the container's global scope.
    pub fn is_global(&self) -> bool {
        matches!(self.cache, ScopeCache::Global)
    }

    /// Number of Scoped instances cached so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_cache_stores_nothing() {
        let cache = ScopeCache::Global;
        let instance: Instance = Arc::new(1u8);
        cache.insert(0, instance);
        assert!(cache.get(0).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn request_cache_keeps_first_instance() {
        let cache = ScopeCache::request();
        let first: Instance = Arc::new(1u8);
        let second: Instance = Arc::new(2u8);

        let kept = cache.insert(3, first.clone());
        assert!(Arc::ptr_eq(&kept, &first));

        let kept = cache.insert(3, second);
        assert!(Arc::ptr_eq(&kept, &first));
        assert!(cache.get(3).is_some_and(|found| Arc::ptr_eq(&found, &first)));
        assert_eq!(cache.len(), 1);
    }
}
