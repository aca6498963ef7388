//! Core container implementation for Anbar DI.
//!
//! Services implement [`Injectable`], are registered on a [`Container`]
//! with a [`Lifetime`], and are resolved as [`Shape`]s after
//! [`Container::build`] has validated the graph.

mod callsite;
pub mod container;
pub mod error;
mod graph;
#[cfg(feature = "async")]
pub mod hosted;
mod injectable;
pub mod key;
pub mod lifetime;
pub mod provider;
mod registry;
pub mod scope;
pub mod settings;

pub use container::{Container, prelude};
pub use error::{AnbarError, BoxError, Result};
#[cfg(feature = "async")]
pub use hosted::HostedService;
pub use injectable::{Dependencies, DynamicDeps, Implements, Injectable, Instance, Shape};
pub use key::{DependencyKey, KeyShape};
pub use lifetime::Lifetime;
pub use provider::Provider;
pub use scope::Scope;
pub use settings::ContainerSettings;
