//! # Anbar — Dependency Injection Container for Rust
//!
//! A lifetime-aware IoC container. Services declare their dependencies
//! through their initializer, the container checks the whole graph once
//! at build time (missing registrations, cycles, captive dependencies)
//! and then resolves object graphs on demand.
//!
//! ```rust
//! use std::sync::Arc;
//! use anbar::{BoxError, Container, injectable};
//!
//! struct Config {
//!     url: String,
//! }
//!
//! struct Database {
//!     url: String,
//! }
//!
//! #[injectable]
//! impl Database {
//!     fn init(config: Arc<Config>) -> Result<Self, BoxError> {
//!         Ok(Database { url: config.url.clone() })
//!     }
//! }
//!
//! let mut container = Container::new();
//! container
//!     .add_value(Config { url: "postgres://localhost".into() })
//!     .add_singleton::<Database>();
//! container.build();
//!
//! let db = container.require_service_ptr::<Database>().unwrap();
//! assert_eq!(db.url, "postgres://localhost");
//! ```
//!
//! See [`Container`] for registration and resolution, [`Scope`] for
//! per-request services and [`HostedService`] for background services.

pub use anbar_container::*;
pub use anbar_derive::*;
pub use anbar_support::*;
