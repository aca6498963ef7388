//! Basic example of the Anbar DI container.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anbar::prelude::*;
use anbar::injectable;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

// === Define your traits and types ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[LOG] {msg}");
    }
}

implements!(ConsoleLogger => dyn Logger);

#[injectable]
impl ConsoleLogger {
    fn init() -> Result<Self, BoxError> {
        Ok(ConsoleLogger)
    }
}

struct Config {
    database_url: String,
    debug: bool,
}

struct Database {
    url: String,
    logger: Arc<dyn Logger>,
}

#[injectable]
impl Database {
    fn init(config: Arc<Config>, logger: Arc<dyn Logger>) -> Result<Self, BoxError> {
        Ok(Database {
            url: config.database_url.clone(),
            logger,
        })
    }

    fn query(&self, sql: &str) -> String {
        self.logger.log(&format!("Executing: {sql}"));
        format!("Results from {}", self.url)
    }
}

/// One per request.
struct UserRepository {
    db: Arc<Database>,
}

#[injectable]
impl UserRepository {
    fn init(db: Arc<Database>) -> Result<Self, BoxError> {
        Ok(UserRepository { db })
    }

    fn find_user(&self, id: u64) -> String {
        self.db.query(&format!("SELECT * FROM users WHERE id = {id}"))
    }
}

/// New on every resolution.
struct UserService {
    repo: Arc<UserRepository>,
    logger: Arc<dyn Logger>,
}

#[injectable]
impl UserService {
    fn init(repo: Arc<UserRepository>, logger: Arc<dyn Logger>) -> Result<Self, BoxError> {
        Ok(UserService { repo, logger })
    }

    fn get_user(&self, id: u64) -> String {
        self.logger.log(&format!("Getting user {id}"));
        self.repo.find_user(id)
    }
}

/// Background job started and stopped with the application.
struct MetricsFlusher {
    logger: Arc<dyn Logger>,
    flushed: AtomicU64,
}

#[injectable]
impl MetricsFlusher {
    fn init(logger: Arc<dyn Logger>) -> Result<Self, BoxError> {
        Ok(MetricsFlusher {
            logger,
            flushed: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl HostedService for MetricsFlusher {
    async fn start(&self, _token: CancellationToken) -> Result<(), BoxError> {
        self.logger.log("Metrics flusher started");
        Ok(())
    }

    async fn stop(&self, _token: CancellationToken) -> Result<(), BoxError> {
        let flushed = self.flushed.fetch_add(1, Ordering::SeqCst) + 1;
        self.logger.log(&format!("Metrics flushed {flushed} time(s), stopping"));
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter("anbar_container=debug")
        .init();

    let mut container = Container::new();
    container
        .add_value(Config {
            database_url: "postgres://localhost/myapp".to_string(),
            debug: true,
        })
        .add_singleton_as::<dyn Logger, ConsoleLogger>()
        .add_singleton::<Database>()
        .add_scoped::<UserRepository>()
        .add_transient::<UserService>()
        .add_hosted_service::<MetricsFlusher>();
    container.build();

    println!("Container built successfully");
    println!("{container:?}");

    let token = CancellationToken::new();
    container.start_async(&token).await?;

    let config = container.require_service_ptr::<Config>()?;
    println!("Config: database_url={}, debug={}", config.database_url, config.debug);

    // === Create a scope (e.g., for an HTTP request) ===
    {
        let scope = container.create_scope();

        let service = scope.require_service_ptr::<UserService>()?;
        println!("{}", service.get_user(42));

        // Same scope: UserRepository is reused
        let service2 = scope.require_service_ptr::<UserService>()?;
        println!("{}", service2.get_user(7));
        println!("Scoped instances cached: {}", scope.len());
    }

    // Scoped services cannot come from the global scope
    if let Err(err) = container.require_service_ptr::<UserService>() {
        println!("Expected failure: {err}");
    }

    token.cancel();
    container.stop_async(&token).await?;
    Ok(())
}
