//! Call sites — the construction engine.
//!
//! A [`CallSite`] is the build-time plan for one registered
//! implementation: its descriptor, the routes to its dependencies, and
//! (for long-lived lifetimes) the cached outcome of construction.

use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use crate::error::{AnbarError, Result};
use crate::graph::GraphValidator;
use crate::injectable::Instance;
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;
use crate::registry::{Descriptor, Registry, Route, SiteId};
use crate::scope::ScopeCache;

#[derive(Debug)]
pub(crate) struct CallSite {
    id: SiteId,
    descriptor: Descriptor,
    /// One route per declared dependency, in declaration order
    dependencies: Vec<Route>,
    built: bool,
    /// Singleton outcome; errors are cached as well
    instance: OnceCell<Result<Instance>>,
}

impl CallSite {
    pub fn new(id: SiteId, descriptor: Descriptor) -> Self {
        Self {
            id,
            descriptor,
            dependencies: Vec::new(),
            built: false,
            instance: OnceCell::new(),
        }
    }

    pub fn key(&self) -> &DependencyKey {
        &self.descriptor.key
    }

    pub fn lifetime(&self) -> Lifetime {
        self.descriptor.lifetime
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn add_interface(&mut self, interface: DependencyKey) {
        self.descriptor.interfaces.push(interface);
    }

    /// Resolves the route of every declared dependency and checks each
    /// edge for captive dependencies.
    pub fn plan(&self, registry: &Registry, graph: &mut GraphValidator) -> Result<Vec<Route>> {
        let mut routes = Vec::with_capacity(self.descriptor.dependencies.len());

        for dep in &self.descriptor.dependencies {
            let route = registry
                .route(dep)
                .ok_or_else(|| graph.not_registered(dep, Some(self.key().clone())))?;
            graph.check_captive(self.key(), dep)?;
            routes.push(route);
        }

        Ok(routes)
    }

    pub fn set_dependencies(&mut self, routes: Vec<Route>) {
        self.dependencies = routes;
        self.built = true;
    }

    /// Produces the instance for this site according to its lifetime.
    ///
    /// `scope` is `None` while a long-lived service is being built;
    /// anything reaching a Scoped site from there fails with
    /// [`MissingScope`](AnbarError::MissingScope).
    pub fn build(&self, registry: &Registry, scope: Option<&ScopeCache>) -> Result<Instance> {
        match self.lifetime() {
            Lifetime::Singleton | Lifetime::HostedService => self
                .instance
                .get_or_init(|| self.construct(registry, None))
                .clone(),
            Lifetime::Transient => self.construct(registry, scope),
            Lifetime::Scoped => match scope {
                None => Err(AnbarError::MissingScope { key: self.key().clone() }),
                Some(ScopeCache::Global) => Err(AnbarError::ScopedInGlobalScope {
                    key: self.key().clone(),
                }),
                Some(cache) => {
                    if let Some(found) = cache.get(self.id) {
                        trace!(key = %self.key(), "Reusing scoped instance");
                        return Ok(found);
                    }
                    let instance = self.construct(registry, scope)?;
                    Ok(cache.insert(self.id, instance))
                }
            },
        }
    }

    /// Builds every dependency, projects it to the requested form and
    /// runs the factory.
    fn construct(&self, registry: &Registry, scope: Option<&ScopeCache>) -> Result<Instance> {
        if !self.built {
            return Err(AnbarError::ContainerNotBuilt);
        }

        let mut resolved = Vec::with_capacity(self.dependencies.len());
        for (route, dep) in self.dependencies.iter().zip(&self.descriptor.dependencies) {
            let instance = registry.site(route.site).build(registry, scope).map_err(|source| {
                AnbarError::DependencyFailed {
                    dependency: dep.clone(),
                    dependent: self.key().clone(),
                    source: Box::new(source),
                }
            })?;
            let projected = (route.project)(&instance).ok_or(AnbarError::UnwrapFailed {
                expected: dep.type_name(),
                reason: "registered implementation does not produce this type",
            })?;
            resolved.push(projected);
        }

        debug!(key = %self.key(), lifetime = %self.lifetime(), "Constructing dependency");
        (self.descriptor.factory)(resolved)
    }
}
