//! Hosted services — singletons started and stopped with the application.
//!
//! Hosted services are constructed eagerly by
//! [`Container::build`], in registration order. [`Container::start_async`]
//! starts them in that order and [`Container::stop_async`] stops them in
//! reverse.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::container::Container;
use crate::error::{AnbarError, BoxError, Result};
use crate::injectable::{Injectable, Instance};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;
use crate::registry::SiteId;

/// A background service driven by the container.
///
/// # Examples
/// ```rust
/// use anbar_container::{BoxError, HostedService};
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl HostedService for Heartbeat {
///     async fn start(&self, token: CancellationToken) -> Result<(), BoxError> {
///         tokio::spawn(async move { token.cancelled().await });
///         Ok(())
///     }
///
///     async fn stop(&self, _token: CancellationToken) -> Result<(), BoxError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait HostedService: Send + Sync + 'static {
    /// Starts the service. Long-running work should be spawned and
    /// should watch `token`.
    async fn start(&self, token: CancellationToken) -> std::result::Result<(), BoxError>;

    async fn stop(&self, token: CancellationToken) -> std::result::Result<(), BoxError>;
}

/// A hosted registration awaiting construction.
pub(crate) struct HostedEntry {
    pub site: SiteId,
    pub key: DependencyKey,
    /// Views the constructed instance as a hosted service
    pub cast: fn(&Instance) -> Option<Arc<dyn HostedService>>,
}

fn cast_hosted<T: HostedService>(instance: &Instance) -> Option<Arc<dyn HostedService>> {
    let service = instance.clone().downcast::<T>().ok()?;
    Some(service as Arc<dyn HostedService>)
}

impl Container {
    /// Registers `T` as a hosted service.
    ///
    /// # Panics
    /// See [`add_singleton`](Container::add_singleton).
    pub fn add_hosted_service<T: Injectable + HostedService>(&mut self) -> &mut Self {
        let site = self.register::<T>(Lifetime::HostedService);
        self.hosted.push(HostedEntry {
            site,
            key: DependencyKey::of::<T>(),
            cast: cast_hosted::<T>,
        });
        self
    }

    /// Number of registered hosted services.
    pub fn hosted_len(&self) -> usize {
        self.hosted.len()
    }

    /// Starts every hosted service in registration order.
    ///
    /// # Errors
    /// - [`AnbarError::ContainerNotBuilt`]
    /// - [`AnbarError::HostedStartFailed`] for the first service that
    ///   fails; later services are not started
    pub async fn start_async(&self, token: &CancellationToken) -> Result<()> {
        if !self.built {
            return Err(AnbarError::ContainerNotBuilt);
        }
        info!(count = self.hosted_services.len(), "Starting hosted services");

        for (index, (entry, service)) in self.hosted.iter().zip(&self.hosted_services).enumerate() {
            debug!(index, key = %entry.key, "Starting hosted service");

            if let Err(source) = service.start(token.clone()).await {
                error!(index, key = %entry.key, error = %source, "Hosted service failed to start");
                return Err(AnbarError::HostedStartFailed {
                    index,
                    key: entry.key.clone(),
                    source: Arc::from(source),
                });
            }
        }

        Ok(())
    }

    /// Stops every hosted service in reverse registration order.
    ///
    /// A failure does not stop the loop; the first failure is returned
    /// once every service has been asked to stop.
    ///
    /// # Errors
    /// - [`AnbarError::ContainerNotBuilt`]
    /// - [`AnbarError::HostedStopFailed`]
    pub async fn stop_async(&self, token: &CancellationToken) -> Result<()> {
        if !self.built {
            return Err(AnbarError::ContainerNotBuilt);
        }
        info!(count = self.hosted_services.len(), "Stopping hosted services");

        let mut first_error = None;
        for (index, (entry, service)) in self
            .hosted
            .iter()
            .zip(&self.hosted_services)
            .enumerate()
            .rev()
        {
            debug!(index, key = %entry.key, "Stopping hosted service");

            if let Err(source) = service.stop(token.clone()).await {
                warn!(index, key = %entry.key, error = %source, "Hosted service failed to stop");
                first_error.get_or_insert(AnbarError::HostedStopFailed {
                    index,
                    key: entry.key.clone(),
                    source: Arc::from(source),
                });
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}
