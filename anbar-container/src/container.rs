//! # The Container — heart of Anbar
//!
//! Registration, build and resolution.
//!
//! # Lifecycle
//! ```text
//! Container::new()  ──add_*()──>  registrations
//!                                    │
//!                                 build()      validate graph, wire call sites,
//!                                    │         construct hosted services
//!                                    ▼
//!                         require_service()    global scope
//!                         create_scope()       request scope
//! ```
//!
//! Registration and build misuse is a programmer error and panics.
//! Resolution returns [`Result`].
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use anbar_container::prelude::*;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, msg: &str) -> String;
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, msg: &str) -> String { format!("[console] {msg}") }
//! }
//! implements!(ConsoleLogger => dyn Logger);
//!
//! impl Injectable for ConsoleLogger {
//!     type Deps = ();
//!     fn init((): ()) -> Result<Self, BoxError> { Ok(ConsoleLogger) }
//! }
//!
//! struct UserService {
//!     logger: Arc<dyn Logger>,
//! }
//!
//! impl Injectable for UserService {
//!     type Deps = (Arc<dyn Logger>,);
//!     fn init((logger,): Self::Deps) -> Result<Self, BoxError> {
//!         Ok(UserService { logger })
//!     }
//! }
//!
//! let mut container = Container::new();
//! container
//!     .add_singleton_as::<dyn Logger, ConsoleLogger>()
//!     .add_transient::<UserService>();
//! container.build();
//!
//! let service = container.require_service_ptr::<UserService>().unwrap();
//! assert_eq!(service.logger.log("hi"), "[console] hi");
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use anbar_support::rendering::suggest_similar;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::error::{AnbarError, NotRegisteredError, Result};
use crate::injectable::{Implements, Injectable, Instance, Shape, factory_for};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;
use crate::provider::Provider;
use crate::registry::{
    Descriptor, Projection, Registry, SiteId, project_concrete, project_interface, project_stored,
};
use crate::scope::{Scope, ScopeCache};
use crate::settings::ContainerSettings;

#[cfg(feature = "async")]
use crate::hosted::{HostedEntry, HostedService};

/// The dependency injection container.
///
/// Registrations take `&mut self` and may be chained. After
/// [`build`](Container::build) the container is frozen and can be shared
/// across threads by reference.
pub struct Container {
    pub(crate) registry: Registry,
    pub(crate) settings: ContainerSettings,
    pub(crate) built: bool,
    /// Hosted registrations, in registration order
    #[cfg(feature = "async")]
    pub(crate) hosted: Vec<HostedEntry>,
    /// Hosted instances, filled during build
    #[cfg(feature = "async")]
    pub(crate) hosted_services: Vec<Arc<dyn HostedService>>,
}

impl Container {
    /// Creates an empty container with default settings.
    pub fn new() -> Self {
        Self::with_settings(ContainerSettings::default())
    }

    pub fn with_settings(settings: ContainerSettings) -> Self {
        Self {
            registry: Registry::new(),
            settings,
            built: false,
            #[cfg(feature = "async")]
            hosted: Vec::new(),
            #[cfg(feature = "async")]
            hosted_services: Vec::new(),
        }
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    // ── Registration ──

    /// Registers `T` with one instance for the whole container.
    ///
    /// # Panics
    /// If the container is built, `T` is already registered, or `T`'s
    /// initializer declares the same dependency twice.
    pub fn add_singleton<T: Injectable>(&mut self) -> &mut Self {
        self.register::<T>(Lifetime::Singleton);
        self
    }

    /// Registers `T` with a fresh instance on every resolution.
    ///
    /// # Panics
    /// See [`add_singleton`](Container::add_singleton).
    pub fn add_transient<T: Injectable>(&mut self) -> &mut Self {
        self.register::<T>(Lifetime::Transient);
        self
    }

    /// Registers `T` with one instance per [`Scope`].
    ///
    /// # Panics
    /// See [`add_singleton`](Container::add_singleton).
    pub fn add_scoped<T: Injectable>(&mut self) -> &mut Self {
        self.register::<T>(Lifetime::Scoped);
        self
    }

    /// Registers `T` as a singleton and makes it resolvable as `Arc<I>`.
    ///
    /// If `T` is already registered, `I` is aliased onto the existing
    /// registration, which keeps its lifetime.
    ///
    /// `T` must implement the interface; this is checked by the compiler:
    ///
    /// ```rust,compile_fail
    /// use anbar_container::{BoxError, Container, Injectable};
    ///
    /// trait Clock: Send + Sync {}
    /// struct NotAClock;
    /// impl Injectable for NotAClock {
    ///     type Deps = ();
    ///     fn init((): ()) -> Result<Self, BoxError> { Ok(NotAClock) }
    /// }
    ///
    /// Container::new().add_singleton_as::<dyn Clock, NotAClock>();
    /// ```
    ///
    /// # Panics
    /// If the container is built or `I` is already claimed.
    pub fn add_singleton_as<I, T>(&mut self) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        T: Injectable + Implements<I>,
    {
        self.register_as::<I, T>(Lifetime::Singleton);
        self
    }

    /// Interface registration with the Transient lifetime.
    ///
    /// # Panics
    /// See [`add_singleton_as`](Container::add_singleton_as).
    pub fn add_transient_as<I, T>(&mut self) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        T: Injectable + Implements<I>,
    {
        self.register_as::<I, T>(Lifetime::Transient);
        self
    }

    /// Interface registration with the Scoped lifetime.
    ///
    /// # Panics
    /// See [`add_singleton_as`](Container::add_singleton_as).
    pub fn add_scoped_as<I, T>(&mut self) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        T: Injectable + Implements<I>,
    {
        self.register_as::<I, T>(Lifetime::Scoped);
        self
    }

    /// Registers an already constructed value, resolvable as `Arc<V>`.
    ///
    /// When `V` is itself an `Arc<X>`, the value is also resolvable as
    /// `Arc<X>`, the same pointer that was passed in.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use anbar_container::Container;
    ///
    /// struct Config { port: u16 }
    ///
    /// let mut container = Container::new();
    /// container.add_value(Config { port: 8080 });
    /// container.build();
    ///
    /// let config = container.require_service::<Arc<Config>>().unwrap();
    /// assert_eq!(config.port, 8080);
    /// ```
    ///
    /// # Panics
    /// If the container is built or `V` is already registered.
    pub fn add_value<V: Send + Sync + 'static>(&mut self, value: V) -> &mut Self {
        self.ensure_not_built();

        let key = DependencyKey::of::<V>();
        let instance: Instance = Arc::new(value);
        let keys = [
            (key.clone(), project_stored as Projection),
            (DependencyKey::pointer::<V>(), project_concrete::<V> as Projection),
        ];

        self.insert(Self::value_descriptor(key, instance), &keys);
        self
    }

    /// Registers an already shared value, resolvable as `Arc<X>`.
    ///
    /// `X` may be a trait object, which is how external collaborators
    /// such as clocks or clients are usually supplied.
    ///
    /// # Panics
    /// If the container is built or `Arc<X>` is already registered.
    pub fn add_shared<X: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<X>) -> &mut Self {
        self.ensure_not_built();

        let key = DependencyKey::pointer::<X>();
        let instance: Instance = Arc::new(value);

        self.insert(
            Self::value_descriptor(key.clone(), instance),
            &[(key, project_stored as Projection)],
        );
        self
    }

    /// Lets a [`Provider`] register its services.
    pub fn add_provider(&mut self, provider: &dyn Provider) -> &mut Self {
        debug!(provider = provider.name(), "Registering provider");
        provider.register(self);
        self
    }

    pub(crate) fn register<T: Injectable>(&mut self, lifetime: Lifetime) -> SiteId {
        self.ensure_not_built();

        let descriptor = Self::describe::<T>(lifetime).unwrap_or_else(|err| fatal(err));
        let keys = [
            (DependencyKey::of::<T>(), project_stored as Projection),
            (DependencyKey::pointer::<T>(), project_concrete::<T> as Projection),
        ];
        self.insert(descriptor, &keys)
    }

    fn register_as<I, T>(&mut self, lifetime: Lifetime)
    where
        I: ?Sized + Send + Sync + 'static,
        T: Injectable + Implements<I>,
    {
        self.ensure_not_built();

        let interface = DependencyKey::interface::<I>();
        if let Err(err) = self.registry.ensure_unclaimed(&interface) {
            fatal(err);
        }

        let site = match self.registry.route(&DependencyKey::of::<T>()) {
            Some(route) => {
                let existing = self.registry.site(route.site);
                if existing.lifetime() != lifetime {
                    warn!(
                        interface = %interface,
                        implementation = %existing.key(),
                        existing = %existing.lifetime(),
                        requested = %lifetime,
                        "Interface aliased onto an existing registration keeps its lifetime"
                    );
                }
                route.site
            }
            None => self.register::<T>(lifetime),
        };

        if let Err(err) = self.registry.alias(interface, site, project_interface::<I, T>) {
            fatal(err);
        }
    }

    fn describe<T: Injectable>(lifetime: Lifetime) -> Result<Descriptor> {
        let key = DependencyKey::of::<T>();
        let dependencies = T::dependencies()?;

        let mut seen = HashSet::with_capacity(dependencies.len());
        for dep in &dependencies {
            if !seen.insert(dep) {
                return Err(AnbarError::DuplicateDependency {
                    consumer: key,
                    dependency: dep.clone(),
                });
            }
        }

        Ok(Descriptor {
            key,
            lifetime,
            dependencies,
            interfaces: Vec::new(),
            factory: factory_for::<T>(),
        })
    }

    fn value_descriptor(key: DependencyKey, instance: Instance) -> Descriptor {
        Descriptor {
            key,
            lifetime: Lifetime::Singleton,
            dependencies: Vec::new(),
            interfaces: Vec::new(),
            factory: Arc::new(move |_: Vec<Instance>| -> Result<Instance> { Ok(instance.clone()) }),
        }
    }

    fn insert(&mut self, descriptor: Descriptor, keys: &[(DependencyKey, Projection)]) -> SiteId {
        self.registry
            .insert(descriptor, keys)
            .unwrap_or_else(|err| fatal(err))
    }

    // ── Build ──

    /// Validates the graph and prepares every registration for
    /// resolution.
    ///
    /// # Panics
    /// On any error [`try_build`](Container::try_build) would return.
    pub fn build(&mut self) {
        if let Err(err) = self.try_build() {
            fatal(err);
        }
    }

    /// Fallible form of [`build`](Container::build).
    ///
    /// Steps, in order: reject a second build; check every declared
    /// dependency is registered and the graph is acyclic; wire call
    /// sites, rejecting captive dependencies; construct hosted services
    /// in registration order; construct every singleton when
    /// [`eager_singletons`](ContainerSettings::eager_singletons) is set.
    ///
    /// # Errors
    /// - [`AnbarError::ContainerAlreadyBuilt`]
    /// - [`AnbarError::NotRegistered`]
    /// - [`AnbarError::CircularDependency`]
    /// - [`AnbarError::CaptiveDependency`]
    /// - [`AnbarError::EagerConstructionFailed`]
    #[instrument(skip(self), name = "container_build")]
    pub fn try_build(&mut self) -> Result<()> {
        if self.built {
            return Err(AnbarError::ContainerAlreadyBuilt);
        }
        info!(registered = self.registry.len(), "Building container");

        let mut graph = self
            .registry
            .graph()
            .with_max_suggestions(self.settings.max_suggestions);
        graph.validate()?;
        self.registry.wire(&mut graph)?;

        #[cfg(feature = "async")]
        self.construct_hosted()?;

        if self.settings.eager_singletons {
            self.construct_singletons()?;
        }

        self.built = true;
        info!("Container built successfully");
        Ok(())
    }

    #[cfg(feature = "async")]
    fn construct_hosted(&mut self) -> Result<()> {
        let mut services = Vec::with_capacity(self.hosted.len());

        for entry in &self.hosted {
            let instance = self.construct_eagerly(entry.site)?;
            let service = (entry.cast)(&instance).ok_or(AnbarError::UnwrapFailed {
                expected: entry.key.type_name(),
                reason: "hosted registration does not produce a hosted service",
            })?;
            services.push(service);
        }

        debug!(count = services.len(), "Constructed hosted services");
        self.hosted_services = services;
        Ok(())
    }

    fn construct_singletons(&self) -> Result<()> {
        for (id, site) in self.registry.sites().iter().enumerate() {
            if site.lifetime() == Lifetime::Singleton {
                self.construct_eagerly(id)?;
            }
        }
        Ok(())
    }

    fn construct_eagerly(&self, site: SiteId) -> Result<Instance> {
        let site = self.registry.site(site);
        site.build(&self.registry, Some(&ScopeCache::Global))
            .map_err(|source| AnbarError::EagerConstructionFailed {
                key: site.key().clone(),
                source: Box::new(source),
            })
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Number of registered implementations.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }

    /// Returns `true` if `S` can be requested from this container.
    pub fn contains<S: Shape>(&self) -> bool {
        S::key().is_ok_and(|key| self.registry.contains(&key))
    }

    // ── Resolution ──

    /// Resolves `S` through the global scope.
    ///
    /// `S` is `Arc<T>` for a concrete service or `Arc<dyn I>` for an
    /// interface.
    ///
    /// # Errors
    /// - [`AnbarError::NotRegistered`] — nothing answers to `S`
    /// - [`AnbarError::ScopedInGlobalScope`] — `S` needs a request scope
    /// - [`AnbarError::InitFailed`] / [`AnbarError::DependencyFailed`] —
    ///   construction failed
    /// - [`AnbarError::UnwrapFailed`] — the instance is not an `S`
    /// - [`AnbarError::ExtractKey`] — `S` has no key
    ///
    /// # Panics
    /// If the container is not built.
    pub fn require_service<S: Shape>(&self) -> Result<S> {
        self.resolve::<S>(&ScopeCache::Global)
    }

    /// Resolves the concrete service `T` through the global scope.
    ///
    /// # Panics
    /// If the container is not built.
    pub fn require_service_ptr<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.resolve_ptr::<T>(&ScopeCache::Global)
    }

    /// Opens a new request scope with an empty cache.
    ///
    /// # Panics
    /// If the container is not built.
    pub fn create_scope(&self) -> Scope<'_> {
        self.ensure_built();
        debug!("Creating new scope");
        Scope::new(self, ScopeCache::request())
    }

    pub(crate) fn resolve<S: Shape>(&self, cache: &ScopeCache) -> Result<S> {
        self.ensure_built();
        let key = S::key()?;
        let instance = self.resolve_key(&key, cache)?;
        S::unwrap(&instance)
    }

    pub(crate) fn resolve_ptr<T: Send + Sync + 'static>(&self, cache: &ScopeCache) -> Result<Arc<T>> {
        self.resolve::<Arc<T>>(cache)
    }

    fn resolve_key(&self, key: &DependencyKey, cache: &ScopeCache) -> Result<Instance> {
        trace!(key = %key, "Resolving");

        let route = self
            .registry
            .route(key)
            .ok_or_else(|| self.not_registered(key))?;
        let instance = self.registry.site(route.site).build(&self.registry, Some(cache))?;

        (route.project)(&instance).ok_or(AnbarError::UnwrapFailed {
            expected: key.type_name(),
            reason: "registered implementation does not produce this type",
        })
    }

    fn not_registered(&self, key: &DependencyKey) -> AnbarError {
        let available = self.registry.type_names();
        AnbarError::NotRegistered(NotRegisteredError {
            requested: key.clone(),
            required_by: None,
            suggestions: suggest_similar(key.type_name(), &available, self.settings.max_suggestions),
        })
    }

    // ── State checks ──

    #[track_caller]
    fn ensure_built(&self) {
        if !self.built {
            fatal(AnbarError::ContainerNotBuilt);
        }
    }

    #[track_caller]
    fn ensure_not_built(&self) {
        if self.built {
            fatal(AnbarError::ContainerAlreadyBuilt);
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registered", &self.registry.len())
            .field("built", &self.built)
            .finish()
    }
}

/// Reports a programmer error through the fatal channel.
///
/// The panic payload is the [`AnbarError`] itself, so a caller that
/// recovers the unwind can downcast it and match on the variant.
#[track_caller]
pub(crate) fn fatal(err: AnbarError) -> ! {
    error!(error = %err, "Fatal container error");
    std::panic::panic_any(err)
}

/// Runs `f` and returns the error it raised through the fatal channel.
#[cfg(test)]
pub(crate) fn catch_fatal(f: impl FnOnce()) -> AnbarError {
    let payload = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(()) => panic!("Expected a fatal container error"),
        Err(payload) => payload,
    };
    match payload.downcast::<AnbarError>() {
        Ok(err) => *err,
        Err(_) => panic!("Panic payload is not an AnbarError"),
    }
}

pub mod prelude {
    pub use super::Container;
    pub use crate::error::{AnbarError, BoxError, Result};
    #[cfg(feature = "async")]
    pub use crate::hosted::HostedService;
    pub use crate::implements;
    pub use crate::injectable::{Dependencies, DynamicDeps, Implements, Injectable, Shape};
    pub use crate::key::DependencyKey;
    pub use crate::lifetime::Lifetime;
    pub use crate::provider::Provider;
    pub use crate::scope::Scope;
    pub use crate::settings::ContainerSettings;
}
