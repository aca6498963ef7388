//! Error types for Anbar container operations.
//!
//! Errors fall into two channels. Wiring mistakes (duplicate
//! registrations, cycles, captive dependencies, using the container out
//! of order) are programmer errors: the registration and build entry
//! points panic with the error's message. Everything that depends on how
//! the container is called at runtime is returned as a value.
//!
//! [`AnbarError`] is `Clone` so a failed singleton construction can be
//! cached and handed to every later caller.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use anbar_support::rendering::{ChainEntry, render_chain, render_lifetime_chain};

use crate::key::DependencyKey;
use crate::lifetime::Lifetime;

/// Boxed error returned by initializers and hosted services.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Shared error cause, kept in an `Arc` so errors stay cloneable.
pub type SharedError = Arc<dyn StdError + Send + Sync>;

/// Main error type for all Anbar operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnbarError {
    /// Requested or declared dependency was never registered.
    #[error("{}", .0)]
    NotRegistered(NotRegisteredError),

    /// The dependency graph contains a cycle.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A long-lived service depends on something that needs a scope.
    #[error("{}", .0)]
    CaptiveDependency(CaptiveDependencyError),

    /// A type or interface key is already claimed.
    #[error("{}", .0)]
    AlreadyRegistered(AlreadyRegisteredError),

    /// An initializer lists the same dependency type twice.
    #[error("Dependency {dependency} is declared more than once by the initializer of {consumer}")]
    DuplicateDependency {
        consumer: DependencyKey,
        dependency: DependencyKey,
    },

    /// No key could be derived for a requested shape.
    #[error("Can't extract dependency name for {type_name}")]
    ExtractKey { type_name: &'static str },

    /// A scoped service was built without any scope.
    #[error("Scoped dependency {key} was built without a scope")]
    MissingScope { key: DependencyKey },

    /// A scoped service was requested through the global scope.
    #[error("Called scoped dependency {key} in global scope\n  Hint: resolve it through container.create_scope()")]
    ScopedInGlobalScope { key: DependencyKey },

    /// The service's initializer returned an error.
    #[error("Failed to build dependency {key}: {source}")]
    InitFailed {
        key: DependencyKey,
        #[source]
        source: SharedError,
    },

    /// A dependency failed while its consumer was being constructed.
    #[error("Failed to build dependency {dependency} for {dependent}")]
    DependencyFailed {
        dependency: DependencyKey,
        dependent: DependencyKey,
        #[source]
        source: Box<AnbarError>,
    },

    /// The constructed instance does not have the requested shape.
    #[error("Failed unwrap of type {expected}: {reason}")]
    UnwrapFailed {
        expected: &'static str,
        reason: &'static str,
    },

    /// A hosted service or eager singleton failed during build.
    #[error("Failed to build {key} while building the container")]
    EagerConstructionFailed {
        key: DependencyKey,
        #[source]
        source: Box<AnbarError>,
    },

    /// The container has not been built yet.
    #[error("Container is not built. Call .build() after registering dependencies")]
    ContainerNotBuilt,

    /// The container is already built and cannot be modified.
    #[error("Container is already built. Register dependencies before calling .build()")]
    ContainerAlreadyBuilt,

    /// A hosted service failed to start.
    #[error("Failed to start hosted service #{index} ({key}): {source}")]
    HostedStartFailed {
        index: usize,
        key: DependencyKey,
        #[source]
        source: SharedError,
    },

    /// A hosted service failed to stop.
    #[error("Failed to stop hosted service #{index} ({key}): {source}")]
    HostedStopFailed {
        index: usize,
        key: DependencyKey,
        #[source]
        source: SharedError,
    },
}

impl AnbarError {
    /// Follows [`DependencyFailed`](AnbarError::DependencyFailed) and
    /// [`EagerConstructionFailed`](AnbarError::EagerConstructionFailed)
    /// wrappers down to the error that started the failure.
    pub fn root_cause(&self) -> &AnbarError {
        match self {
            AnbarError::DependencyFailed { source, .. }
            | AnbarError::EagerConstructionFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Error when a dependency was not registered.
#[derive(Debug, Clone)]
pub struct NotRegisteredError {
    /// The dependency that was requested
    pub requested: DependencyKey,
    /// The service whose initializer declared it, if any
    pub required_by: Option<DependencyKey>,
    /// Registered type names that look similar
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency not found: {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: Did you forget to register {}?",
            self.requested.short_name()
        )
    }
}

/// Error when a circular dependency is detected.
#[derive(Debug, Clone)]
pub struct CircularDependencyError {
    /// The full walk that led back into itself, ending with the repeated
    /// node. Example: `[Root, A, B, A]`.
    pub chain: Vec<DependencyKey>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.chain.iter().map(DependencyKey::short_name).collect();
        write!(f, "Circle dependency detected:\n  {}", render_chain(&names))?;
        write!(f, "\n  Hint: Break the cycle by restructuring the initializers")
    }
}

/// Error when a long-lived service would capture a scoped one.
#[derive(Debug, Clone)]
pub struct CaptiveDependencyError {
    /// The Singleton or HostedService holding the edge
    pub consumer: DependencyKey,
    pub consumer_lifetime: Lifetime,
    /// The dependency declared on that edge
    pub dependency: DependencyKey,
    pub dependency_lifetime: Lifetime,
    /// From the consumer down to the Scoped service that forces the scope
    pub chain: Vec<(DependencyKey, Lifetime)>,
}

impl fmt::Display for CaptiveDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Captive dependency: {} ({}) cannot depend on {} ({})",
            self.consumer, self.consumer_lifetime, self.dependency, self.dependency_lifetime,
        )?;

        let entries: Vec<ChainEntry> = self
            .chain
            .iter()
            .map(|(key, lifetime)| ChainEntry::new(key.short_name(), lifetime.to_string()))
            .collect();
        write!(f, "{}", render_lifetime_chain(&entries))?;

        write!(
            f,
            "  Hint: Make {} Scoped or Transient, or stop it from reaching a Scoped service",
            self.consumer.short_name(),
        )
    }
}

/// Error when a type or interface key is claimed twice.
#[derive(Debug, Clone)]
pub struct AlreadyRegisteredError {
    pub key: DependencyKey,
    /// The implementation that already owns the key
    pub existing: DependencyKey,
}

impl fmt::Display for AlreadyRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type already registered: {}", self.key)?;
        if self.existing != self.key {
            write!(f, " (implemented by {})", self.existing)?;
        }
        write!(f, "\n  Hint: Each type and interface can be registered only once")
    }
}

/// Convenient Result type for Anbar operations.
pub type Result<T, E = AnbarError> = std::result::Result<T, E>;
