//! Meridian Database Layer
//!
//! Persistence for the event ingestion core: PostgreSQL via `sqlx` for
//! durable state, Redis via `deadpool-redis` for the OAuth nonce store and
//! rate limiting. Tenant isolation is schema-based (§3a) — registry tables
//! live in `public`; everything else lives under `tenant_{slug}` and is only
//! reachable through a scoped connection (see `meridian-tenancy`).
//!
//! # Repository pattern
//!
//! One `*Repo` per aggregate. Registry repos own a `PgPool` directly;
//! tenant-scoped repos are stateless and take an already-scoped
//! `&mut PgConnection` so they cannot accidentally run against the wrong
//! schema.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod repos;

use deadpool_redis::{Config as RedisConfig, Pool as RedisPool, Runtime};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

pub use config::DatabaseConfig;
pub use error::{DbError, DbResult};
pub use models::*;
pub use repos::*;

pub struct Database {
    pub pg: PgPool,
    pub redis: RedisPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        info!(url = %config.postgres_url_masked(), "connecting to postgres");

        let pg = PgPoolOptions::new()
            .max_connections(config.pg_max_connections)
            .min_connections(config.pg_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.pg_acquire_timeout_secs))
            .connect(&config.postgres_url)
            .await
            .map_err(|e| DbError::Connection(format!("postgres: {e}")))?;

        info!(url = %config.redis_url_masked(), "connecting to redis");

        let redis_cfg = RedisConfig::from_url(&config.redis_url);
        let redis = redis_cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| DbError::Connection(format!("redis: {e}")))?;

        {
            let mut conn = redis
                .get()
                .await
                .map_err(|e| DbError::Connection(format!("redis pool: {e}")))?;
            let _: String = deadpool_redis::redis::cmd("PING")
                .query_async(&mut *conn)
                .await
                .map_err(|e| DbError::Connection(format!("redis ping: {e}")))?;
        }

        Ok(Self { pg, redis })
    }

    pub async fn health_check(&self) -> DbResult<HealthStatus> {
        let pg_ok = sqlx::query("SELECT 1").fetch_one(&self.pg).await.is_ok();

        let redis_ok = async {
            let mut conn = self.redis.get().await.ok()?;
            let result: Result<String, _> = deadpool_redis::redis::cmd("PING")
                .query_async(&mut *conn)
                .await;
            result.ok()
        }
        .await
        .is_some();

        Ok(HealthStatus {
            postgres: pg_ok,
            redis: redis_ok,
            healthy: pg_ok && redis_ok,
        })
    }

    pub fn tenant_repo(&self) -> TenantRepo {
        TenantRepo::new(self.pg.clone())
    }

    pub fn connection_repo(&self) -> ConnectionRepo {
        ConnectionRepo::new(self.pg.clone())
    }

    pub fn inbound_address_repo(&self) -> InboundAddressRepo {
        InboundAddressRepo::new(self.pg.clone())
    }

    pub fn oauth_state_repo(&self) -> OAuthStateRepo {
        OAuthStateRepo::new(self.pg.clone())
    }

    pub fn cache(&self) -> cache::CacheManager {
        cache::CacheManager::new(self.redis.clone())
    }
}

#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub postgres: bool,
    pub redis: bool,
    pub healthy: bool,
}

/// Builds the `tenant_{slug}` schema identifier used by `search_path`
/// (§3a, §4.D). Slugs are restricted at tenant-creation time to
/// `[a-z0-9_]+`, so this never needs to escape a quoted identifier.
pub fn tenant_schema_name(slug: &str) -> String {
    format!("tenant_{slug}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_name_is_prefixed() {
        assert_eq!(tenant_schema_name("acme"), "tenant_acme");
    }
}
