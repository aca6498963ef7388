//! Dependency graph validation.
//!
//! Validates the dependency graph at build time:
//! - Checks that every declared dependency is registered
//! - Detects circular dependencies
//! - Detects captive dependencies (long-lived services reaching a
//!   service that needs a scope)
//!
//! All validation happens during [`Container::build()`](crate::Container::build),
//! before the first resolution.

use std::collections::{HashMap, HashSet};

use anbar_support::rendering::suggest_similar;
use tracing::{debug, instrument, warn};

use crate::error::{
    AnbarError, CaptiveDependencyError, CircularDependencyError, NotRegisteredError, Result,
};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;

/// Information about a registered implementation needed for validation.
#[derive(Debug, Clone)]
pub(crate) struct DependencyInfo {
    /// Canonical key of the implementation
    pub key: DependencyKey,
    /// Declared dependencies, as requested by the initializer
    pub dependencies: Vec<DependencyKey>,
    pub lifetime: Lifetime,
}

/// Validates the dependency graph for correctness.
///
/// # Algorithm
/// Depth-first search in registration order. A "visiting" set detects
/// cycles; the current path is kept for error reporting. Whether a node
/// needs a scope is computed once per node and memoized.
pub(crate) struct GraphValidator {
    /// Registered implementations, in registration order
    infos: Vec<DependencyInfo>,
    /// Canonical key → position in `infos`
    index: HashMap<DependencyKey, usize>,
    /// Every routable key → canonical key
    aliases: HashMap<DependencyKey, DependencyKey>,
    max_suggestions: usize,
    visiting: HashSet<DependencyKey>,
    validated: HashSet<DependencyKey>,
    path: Vec<DependencyKey>,
    needs_scope: HashMap<DependencyKey, bool>,
}

impl GraphValidator {
    pub fn new(infos: Vec<DependencyInfo>, aliases: HashMap<DependencyKey, DependencyKey>) -> Self {
        let index = infos
            .iter()
            .enumerate()
            .map(|(i, info)| (info.key.clone(), i))
            .collect();

        Self {
            infos,
            index,
            aliases,
            max_suggestions: 3,
            visiting: HashSet::new(),
            validated: HashSet::new(),
            path: Vec::new(),
            needs_scope: HashMap::new(),
        }
    }

    /// Caps the number of "did you mean" names in [`NotRegistered`](AnbarError::NotRegistered).
    pub fn with_max_suggestions(mut self, max: usize) -> Self {
        self.max_suggestions = max;
        self
    }

    /// Validates the entire dependency graph.
    ///
    /// # Errors
    /// - [`AnbarError::NotRegistered`] — missing dependency
    /// - [`AnbarError::CircularDependency`] — cycle detected
    #[instrument(skip(self), name = "graph_validation")]
    pub fn validate(&mut self) -> Result<()> {
        debug!(dependency_count = self.infos.len(), "Starting dependency graph validation");

        for i in 0..self.infos.len() {
            let key = self.infos[i].key.clone();
            self.validate_key(&key)?;
        }

        debug!("Dependency graph validation passed");
        Ok(())
    }

    /// Validates one canonical key (recursive DFS).
    fn validate_key(&mut self, key: &DependencyKey) -> Result<()> {
        if self.validated.contains(key) {
            return Ok(());
        }

        if self.visiting.contains(key) {
            let mut chain = self.path.clone();
            chain.push(key.clone());

            warn!(cycle = ?chain, "Circular dependency detected");
            return Err(AnbarError::CircularDependency(CircularDependencyError { chain }));
        }

        let Some(&position) = self.index.get(key) else {
            return Err(self.not_registered(key, self.path.last().cloned()));
        };
        let dependencies = self.infos[position].dependencies.clone();

        self.visiting.insert(key.clone());
        self.path.push(key.clone());

        for dep in &dependencies {
            let Some(canonical) = self.canonical(dep) else {
                return Err(self.not_registered(dep, Some(key.clone())));
            };
            self.validate_key(&canonical)?;
        }

        self.path.pop();
        self.visiting.remove(key);
        self.validated.insert(key.clone());

        Ok(())
    }

    /// Maps any routable key to the canonical key of its implementation.
    pub fn canonical(&self, key: &DependencyKey) -> Option<DependencyKey> {
        self.aliases.get(key).cloned()
    }

    /// Builds a [`NotRegistered`](AnbarError::NotRegistered) error with
    /// suggestions drawn from every routable key.
    pub fn not_registered(&self, requested: &DependencyKey, required_by: Option<DependencyKey>) -> AnbarError {
        let available: Vec<&str> = self.aliases.keys().map(DependencyKey::type_name).collect();
        let suggestions = suggest_similar(requested.type_name(), &available, self.max_suggestions);

        AnbarError::NotRegistered(NotRegisteredError {
            requested: requested.clone(),
            required_by,
            suggestions,
        })
    }

    fn info(&self, key: &DependencyKey) -> Option<&DependencyInfo> {
        let canonical = self.aliases.get(key)?;
        self.index.get(canonical).map(|&i| &self.infos[i])
    }

    /// Returns `true` if building `key` needs a request scope: it is
    /// Scoped, or it is Transient and one of its dependencies needs a
    /// scope.
    ///
    /// Only meaningful after [`validate`](Self::validate) succeeded.
    pub fn requires_scope(&mut self, key: &DependencyKey) -> bool {
        let Some(info) = self.info(key) else {
            return false;
        };
        let canonical = info.key.clone();
        if let Some(&cached) = self.needs_scope.get(&canonical) {
            return cached;
        }
        let lifetime = info.lifetime;
        let dependencies = info.dependencies.clone();

        let needs = match lifetime {
            Lifetime::Scoped => true,
            Lifetime::Transient => dependencies.iter().any(|dep| self.requires_scope(dep)),
            Lifetime::Singleton | Lifetime::HostedService => false,
        };

        self.needs_scope.insert(canonical, needs);
        needs
    }

    /// The path from `key` down to the Scoped service that forces a
    /// scope, with lifetimes.
    fn scope_chain(&mut self, key: &DependencyKey) -> Vec<(DependencyKey, Lifetime)> {
        let mut chain = Vec::new();
        let mut current = key.clone();

        while let Some(info) = self.info(&current) {
            chain.push((info.key.clone(), info.lifetime));
            if info.lifetime == Lifetime::Scoped {
                break;
            }
            let dependencies = info.dependencies.clone();
            match dependencies.into_iter().find(|dep| self.requires_scope(dep)) {
                Some(next) => current = next,
                None => break,
            }
        }

        chain
    }

    /// Checks one edge `consumer → dependency` for a captive dependency.
    ///
    /// A Singleton or HostedService may not depend on anything that
    /// needs a scope, directly or through Transients.
    pub fn check_captive(&mut self, consumer: &DependencyKey, dependency: &DependencyKey) -> Result<()> {
        let Some(info) = self.info(consumer) else {
            return Ok(());
        };
        if !info.lifetime.is_long_lived() {
            return Ok(());
        }
        let (consumer_key, consumer_lifetime) = (info.key.clone(), info.lifetime);

        if !self.requires_scope(dependency) {
            return Ok(());
        }

        let dependency_lifetime = self
            .info(dependency)
            .map(|info| info.lifetime)
            .unwrap_or(Lifetime::Scoped);
        let mut chain = vec![(consumer_key.clone(), consumer_lifetime)];
        chain.extend(self.scope_chain(dependency));

        warn!(
            consumer = %consumer_key,
            consumer_lifetime = %consumer_lifetime,
            dependency = %dependency,
            dependency_lifetime = %dependency_lifetime,
            "Captive dependency detected"
        );

        Err(AnbarError::CaptiveDependency(CaptiveDependencyError {
            consumer: consumer_key,
            consumer_lifetime,
            dependency: dependency.clone(),
            dependency_lifetime,
            chain,
        }))
    }
}
