//! Provider trait — a module of related registrations.
//!
//! # Examples
//! ```rust
//! use anbar_container::{BoxError, Container, Injectable, Provider};
//!
//! struct Pool;
//! impl Injectable for Pool {
//!     type Deps = ();
//!     fn init((): ()) -> Result<Self, BoxError> { Ok(Pool) }
//! }
//!
//! struct DatabaseProvider;
//!
//! impl Provider for DatabaseProvider {
//!     fn register(&self, container: &mut Container) {
//!         container.add_singleton::<Pool>();
//!     }
//! }
//!
//! let mut container = Container::new();
//! container.add_provider(&DatabaseProvider);
//! assert_eq!(container.len(), 1);
//! ```

use crate::container::Container;

/// Registers a group of related services into a container.
///
/// Split registrations by domain instead of one giant block:
///
/// ```rust,ignore
/// container
///     .add_provider(&DatabaseProvider)
///     .add_provider(&AuthProvider)
///     .add_provider(&EmailProvider);
/// ```
pub trait Provider {
    /// Registers this provider's services.
    ///
    /// Registration misuse panics exactly as the container's own
    /// registration methods do.
    fn register(&self, container: &mut Container);

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::injectable::Injectable;
    use std::sync::Arc;

    struct Greeting(&'static str);
    impl Injectable for Greeting {
        type Deps = ();
        fn init((): ()) -> Result<Self, BoxError> {
            Ok(Greeting("hello"))
        }
    }

    struct Shout(String);
    impl Injectable for Shout {
        type Deps = (Arc<Greeting>,);
        fn init((greeting,): Self::Deps) -> Result<Self, BoxError> {
            Ok(Shout(greeting.0.to_uppercase()))
        }
    }

    struct GreetingProvider;

    impl Provider for GreetingProvider {
        fn register(&self, container: &mut Container) {
            container.add_singleton::<Greeting>().add_transient::<Shout>();
        }
    }

    #[test]
    fn provider_registers_dependencies() {
        let mut container = Container::new();
        container.add_provider(&GreetingProvider);
        container.build();

        assert_eq!(container.len(), 2);
        let shout = container.require_service_ptr::<Shout>().unwrap();
        assert_eq!(shout.0, "HELLO");
    }

    #[test]
    fn provider_has_name() {
        assert!(GreetingProvider.name().contains("GreetingProvider"));
    }
}
