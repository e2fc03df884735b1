pub mod auth;
pub mod cfg;
pub mod clock;
pub mod constant;
pub mod error;
pub mod investment;
pub mod logging;
pub mod mdw;
pub mod notify;
pub mod portfolio;
pub mod product;
pub mod redis;
pub mod req;
pub mod reset;
pub mod server;
pub mod store;
pub mod svc;
#[cfg(test)]
pub(crate) mod testkit;
pub mod txlog;
pub mod types;
pub mod user;
pub mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::auth::password::PasswordHasher;
use crate::auth::svc::AuthSettings;
use crate::cfg::{Config, StorageKind};
use crate::clock::SystemClock;
use crate::notify::LogNotifier;
use crate::redis::RedisCache;
use crate::store::Stores;
use crate::store::memory::MemoryStore;
use crate::svc::Service;

/// Wires stores, cache, notifier and auth settings from config.
pub async fn bootstrap(config: &Config) -> Result<Service> {
    let stores = match config.storage {
        StorageKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("database_url is not set")?;
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await
                .context("failed to connect to postgres")?;
            info!("connected to postgres");
            Stores::postgres(pool)
        }
        StorageKind::Memory => {
            warn!("using in-memory storage; data is lost on restart");
            Stores::memory(Arc::new(MemoryStore::new()))
        }
    };

    let cache = match &config.redis_url {
        Some(url) => match RedisCache::new(url, config.product_cache_ttl_secs).await {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!("product cache disabled, redis unavailable: {}", e);
                None
            }
        },
        None => None,
    };

    let settings = AuthSettings {
        keys: config.jwt_keys()?,
        session_ttl: config.session_ttl(),
        reset_ttl: config.reset_ttl(),
        hasher: PasswordHasher::new(
            config.password_hash_memory_kib,
            config.password_hash_iterations,
        )
        .map_err(|e| anyhow::anyhow!("{}", e))?,
        admin_emails: config.admin_emails(),
    };

    Ok(Service::new(
        stores,
        Arc::new(LogNotifier),
        Arc::new(SystemClock),
        settings,
        cache,
    ))
}
