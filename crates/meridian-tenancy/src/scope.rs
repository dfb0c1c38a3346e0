//! Tenant Scope Executor (§4.D): `withTenant(tenant id, block) -> block's
//! result`, with storage isolation for the block's duration and a no-op
//! re-entrancy path for nested calls on the same tenant.

use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;

use meridian_db::tenant_schema_name;
use meridian_types::TenantId;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use tokio::sync::Mutex;

use crate::error::TenancyError;

tokio::task_local! {
    static CURRENT_SCOPE: RefCell<Option<(TenantId, String, Arc<Mutex<PoolConnection<Postgres>>>)>>;
}

/// A storage scope pinned to one tenant's schema. Handlers borrow this
/// rather than acquiring their own connection, so concurrent handlers for
/// the same event share one pinned, `search_path`-scoped connection (§4.H
/// fans out handlers; each holds only a `&TenantScope`).
#[derive(Clone)]
pub struct TenantScope {
    tenant_id: TenantId,
    tenant_slug: String,
    conn: Arc<Mutex<PoolConnection<Postgres>>>,
}

impl TenantScope {
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// The tenant's schema slug, needed by handlers that enqueue follow-up
    /// jobs (job spooling pins its own connection's `search_path` by slug).
    pub fn tenant_slug(&self) -> &str {
        &self.tenant_slug
    }

    pub async fn connection(&self) -> tokio::sync::MutexGuard<'_, PoolConnection<Postgres>> {
        self.conn.lock().await
    }
}

/// Runs `block` with storage isolated to `tenant_id`'s schema. A call nested
/// inside an outer `with_tenant` for the *same* tenant reuses the existing
/// scope instead of acquiring a second connection (§4.D re-entrancy
/// invariant). `search_path` is reset to the default before the connection
/// returns to the pool, so a panicking handler can't leak scope onto the
/// next borrower — done as an explicit reset at the end of this function
/// rather than in `Drop`, since resetting requires an `await` that `Drop`
/// cannot perform.
pub async fn with_tenant<F, Fut, T>(
    pool: &PgPool,
    tenant_id: TenantId,
    tenant_slug: &str,
    block: F,
) -> Result<T, TenancyError>
where
    F: FnOnce(TenantScope) -> Fut,
    Fut: Future<Output = T>,
{
    let reentrant = CURRENT_SCOPE
        .try_with(|cell| cell.borrow().clone())
        .ok()
        .flatten();

    if let Some((active_tenant, active_slug, conn)) = reentrant {
        if active_tenant == tenant_id {
            let scope = TenantScope {
                tenant_id,
                tenant_slug: active_slug,
                conn,
            };
            return Ok(block(scope).await);
        }
    }

    let mut conn = pool.acquire().await.map_err(meridian_db::DbError::from)?;
    let schema = tenant_schema_name(tenant_slug);
    sqlx::query(&format!("SET search_path = {schema}, public"))
        .execute(&mut *conn)
        .await
        .map_err(meridian_db::DbError::from)?;

    let shared = Arc::new(Mutex::new(conn));
    let scope = TenantScope {
        tenant_id,
        tenant_slug: tenant_slug.to_string(),
        conn: Arc::clone(&shared),
    };

    let cell = RefCell::new(Some((tenant_id, tenant_slug.to_string(), Arc::clone(&shared))));
    let result = CURRENT_SCOPE.scope(cell, block(scope)).await;

    if let Ok(mut guard) = shared.try_lock() {
        let _ = sqlx::query("RESET search_path").execute(&mut *guard).await;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_name_matches_expected_prefix() {
        assert_eq!(tenant_schema_name("acme-co"), "tenant_acme-co");
    }
}
