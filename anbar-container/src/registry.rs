//! Descriptor registry — every registration the container knows about.
//!
//! Each registered implementation owns one [`CallSite`]. Keys map to
//! call sites through [`Route`]s: the value key and pointer key of a
//! concrete type, and any interface aliases, all point at the same call
//! site with a different projection.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::callsite::CallSite;
use crate::error::{AlreadyRegisteredError, AnbarError, Result};
use crate::graph::{DependencyInfo, GraphValidator};
use crate::injectable::{FactoryFn, Implements, Instance};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;

/// Index of a call site inside the registry.
pub(crate) type SiteId = usize;

/// Converts a call site's stored instance into the form requested
/// through one particular key.
pub(crate) type Projection = fn(&Instance) -> Option<Instance>;

/// Where a key leads.
#[derive(Clone, Copy)]
pub(crate) struct Route {
    pub site: SiteId,
    pub project: Projection,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route").field("site", &self.site).finish()
    }
}

/// Registration record for one implementation.
#[derive(Clone)]
pub(crate) struct Descriptor {
    /// Canonical key: the value key, or the pointer key for shared values
    pub key: DependencyKey,
    pub lifetime: Lifetime,
    /// Declared dependencies in initializer order
    pub dependencies: Vec<DependencyKey>,
    /// Interface keys aliased onto this implementation
    pub interfaces: Vec<DependencyKey>,
    pub factory: FactoryFn,
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("dependencies", &self.dependencies)
            .field("interfaces", &self.interfaces)
            .finish()
    }
}

/// Stores all call sites and the keys that reach them.
///
/// Populated during registration and frozen once the container is built.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    sites: Vec<CallSite>,
    routes: HashMap<DependencyKey, Route>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new descriptor reachable through `keys`.
    ///
    /// # Errors
    /// Returns [`AnbarError::AlreadyRegistered`] if any key is claimed.
    pub fn insert(
        &mut self,
        descriptor: Descriptor,
        keys: &[(DependencyKey, Projection)],
    ) -> Result<SiteId> {
        for (key, _) in keys {
            self.ensure_unclaimed(key)?;
        }

        let id = self.sites.len();
        debug!(
            key = %descriptor.key,
            lifetime = %descriptor.lifetime,
            dependencies = descriptor.dependencies.len(),
            "Registered dependency"
        );
        for (key, project) in keys {
            self.routes.insert(key.clone(), Route { site: id, project: *project });
        }
        self.sites.push(CallSite::new(id, descriptor));
        Ok(id)
    }

    /// Makes `interface` resolve to an existing call site.
    ///
    /// # Errors
    /// Returns [`AnbarError::AlreadyRegistered`] if the interface key is
    /// claimed, whichever implementation claimed it.
    pub fn alias(&mut self, interface: DependencyKey, site: SiteId, project: Projection) -> Result<()> {
        self.ensure_unclaimed(&interface)?;

        debug!(from = %interface, to = %self.sites[site].key(), "Registered alias");
        self.sites[site].add_interface(interface.clone());
        self.routes.insert(interface, Route { site, project });
        Ok(())
    }

    /// Fails if `key` already routes to an implementation.
    pub fn ensure_unclaimed(&self, key: &DependencyKey) -> Result<()> {
        match self.routes.get(key) {
            Some(route) => Err(AnbarError::AlreadyRegistered(AlreadyRegisteredError {
                key: key.clone(),
                existing: self.sites[route.site].key().clone(),
            })),
            None => Ok(()),
        }
    }

    /// Looks up the route for a key.
    pub fn route(&self, key: &DependencyKey) -> Option<Route> {
        let route = self.routes.get(key).copied();
        if let Some(route) = route {
            trace!(from = %key, to = %self.sites[route.site].key(), "Following route");
        }
        route
    }

    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.routes.contains_key(key)
    }

    pub fn site(&self, id: SiteId) -> &CallSite {
        &self.sites[id]
    }

    pub fn sites(&self) -> &[CallSite] {
        &self.sites
    }

    /// Returns the number of registered implementations.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Type names of every routable key, for suggestions.
    pub fn type_names(&self) -> Vec<&'static str> {
        self.routes.keys().map(DependencyKey::type_name).collect()
    }

    /// Builds a validator over the current registrations, in
    /// registration order.
    pub fn graph(&self) -> GraphValidator {
        let infos = self
            .sites
            .iter()
            .map(|site| DependencyInfo {
                key: site.key().clone(),
                dependencies: site.descriptor().dependencies.clone(),
                lifetime: site.lifetime(),
            })
            .collect();

        let aliases = self
            .routes
            .iter()
            .map(|(key, route)| (key.clone(), self.sites[route.site].key().clone()))
            .collect();

        GraphValidator::new(infos, aliases)
    }

    /// Wires every call site to its dependencies.
    ///
    /// Sites already wired are skipped, so this can be repeated.
    ///
    /// # Errors
    /// - [`AnbarError::NotRegistered`] — a declared key has no route
    /// - [`AnbarError::CaptiveDependency`] — a long-lived site reaches a
    ///   service that needs a scope
    pub fn wire(&mut self, graph: &mut GraphValidator) -> Result<()> {
        for id in 0..self.sites.len() {
            if self.sites[id].is_built() {
                continue;
            }
            let routes = self.sites[id].plan(self, graph)?;
            self.sites[id].set_dependencies(routes);
        }
        Ok(())
    }
}

/// Projection for keys of a concrete service: yields `Arc<T>`.
pub(crate) fn project_concrete<T: Send + Sync + 'static>(instance: &Instance) -> Option<Instance> {
    let concrete = instance.clone().downcast::<T>().ok()?;
    Some(Arc::new(concrete) as Instance)
}

/// Projection for an interface alias: yields `Arc<I>`.
pub(crate) fn project_interface<I, T>(instance: &Instance) -> Option<Instance>
where
    I: ?Sized + Send + Sync + 'static,
    T: Implements<I>,
{
    let concrete = instance.clone().downcast::<T>().ok()?;
    let upcast: Arc<I> = <T as Implements<I>>::upcast(concrete);
    Some(Arc::new(upcast) as Instance)
}

/// Projection for keys naming the stored type itself: the value key of
/// a service, or the pointer key of a shared value.
pub(crate) fn project_stored(instance: &Instance) -> Option<Instance> {
    Some(instance.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Database;
    trait Store: Send + Sync {}
    impl Store for Database {}
    crate::implements!(Database => dyn Store);

    fn descriptor(key: DependencyKey) -> Descriptor {
        Descriptor {
            key,
            lifetime: Lifetime::Singleton,
            dependencies: vec![],
            interfaces: vec![],
            factory: Arc::new(|_: Vec<Instance>| -> Result<Instance> { Ok(Arc::new(Database)) }),
        }
    }

    fn concrete_keys() -> Vec<(DependencyKey, Projection)> {
        vec![
            (DependencyKey::of::<Database>(), project_stored as Projection),
            (DependencyKey::pointer::<Database>(), project_concrete::<Database> as Projection),
        ]
    }

    #[test]
    fn insert_routes_value_and_pointer_keys() {
        let mut reg = Registry::new();
        let id = reg.insert(descriptor(DependencyKey::of::<Database>()), &concrete_keys()).unwrap();

        assert_eq!(reg.route(&DependencyKey::of::<Database>()).map(|r| r.site), Some(id));
        assert_eq!(reg.route(&DependencyKey::pointer::<Database>()).map(|r| r.site), Some(id));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn duplicate_insert_fails() {
        let mut reg = Registry::new();
        reg.insert(descriptor(DependencyKey::of::<Database>()), &concrete_keys()).unwrap();

        let err = reg
            .insert(descriptor(DependencyKey::of::<Database>()), &concrete_keys())
            .unwrap_err();
        assert!(matches!(err, AnbarError::AlreadyRegistered(_)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn alias_merges_onto_existing_site() {
        let mut reg = Registry::new();
        let id = reg.insert(descriptor(DependencyKey::of::<Database>()), &concrete_keys()).unwrap();

        let iface = DependencyKey::interface::<dyn Store>();
        reg.alias(iface.clone(), id, project_interface::<dyn Store, Database>).unwrap();

        assert_eq!(reg.route(&iface).map(|r| r.site), Some(id));
        assert_eq!(reg.site(id).descriptor().interfaces, vec![iface.clone()]);
        assert!(reg.alias(iface, id, project_interface::<dyn Store, Database>).is_err());
    }

    #[test]
    fn projections_produce_requested_forms() {
        let stored: Instance = Arc::new(Database);

        let pointer = project_concrete::<Database>(&stored).unwrap();
        assert!(pointer.downcast_ref::<Arc<Database>>().is_some());

        let iface = project_interface::<dyn Store, Database>(&stored).unwrap();
        assert!(iface.downcast_ref::<Arc<dyn Store>>().is_some());

        assert!(project_concrete::<String>(&stored).is_none());

        let value = project_stored(&stored).unwrap();
        assert!(value.downcast_ref::<Database>().is_some());
    }
}
