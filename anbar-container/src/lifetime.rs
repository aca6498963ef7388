//! Service lifetimes.
//!
//! A lifetime decides how long a constructed service is reused:
//! - [`Lifetime::Singleton`] — one instance per container
//! - [`Lifetime::HostedService`] — a singleton that is also started and
//!   stopped with the application
//! - [`Lifetime::Scoped`] — one instance per [`Scope`](crate::Scope)
//! - [`Lifetime::Transient`] — a new instance on every resolution

use std::fmt;

/// Defines the lifetime of a registered service.
///
/// # Examples
/// ```
/// use anbar_container::lifetime::Lifetime;
///
/// assert!(Lifetime::HostedService.is_long_lived());
/// assert!(!Lifetime::Scoped.is_long_lived());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Constructed once, on first resolution, and shared by every caller
    /// for the rest of the container's life.
    ///
    /// # When to use
    /// - Connection pools
    /// - Configuration snapshots
    /// - Shared caches
    Singleton,

    /// Constructed afresh for every resolution and never cached.
    Transient,

    /// Constructed once per scope.
    ///
    /// Must be resolved through a scope obtained from
    /// [`Container::create_scope`](crate::Container::create_scope);
    /// the container's global scope refuses it.
    ///
    /// # When to use
    /// - Per-request transactions
    /// - User session data
    Scoped,

    /// A singleton that the container constructs eagerly at build time
    /// and drives through start/stop.
    HostedService,
}

impl Lifetime {
    /// Returns `true` for lifetimes that hold one instance for the whole
    /// container. Such services must never capture scoped ones.
    #[inline]
    pub fn is_long_lived(&self) -> bool {
        matches!(self, Lifetime::Singleton | Lifetime::HostedService)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Singleton => write!(f, "Singleton"),
            Lifetime::Transient => write!(f, "Transient"),
            Lifetime::Scoped => write!(f, "Scoped"),
            Lifetime::HostedService => write!(f, "HostedService"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_lived_lifetimes() {
        assert!(Lifetime::Singleton.is_long_lived());
        assert!(Lifetime::HostedService.is_long_lived());
        assert!(!Lifetime::Scoped.is_long_lived());
        assert!(!Lifetime::Transient.is_long_lived());
    }

    #[test]
    fn display_names() {
        assert_eq!(Lifetime::Singleton.to_string(), "Singleton");
        assert_eq!(Lifetime::HostedService.to_string(), "HostedService");
        assert_eq!(format!("{}", Lifetime::Scoped), "Scoped");
    }
}
