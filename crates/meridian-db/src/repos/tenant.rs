//! Tenant registry rows. Lives in the `public` schema; never tenant-scoped.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, DbResult, DbTenant};

pub struct TenantRepo {
    pool: PgPool,
}

impl TenantRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbTenant>> {
        let tenant = sqlx::query_as::<_, DbTenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    pub async fn find_by_slug(&self, slug: &str) -> DbResult<Option<DbTenant>> {
        let tenant = sqlx::query_as::<_, DbTenant>("SELECT * FROM tenants WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    /// All active tenants, used at startup to spawn one outbox flusher per
    /// tenant schema (§4.K).
    pub async fn list_active(&self) -> DbResult<Vec<DbTenant>> {
        let tenants = sqlx::query_as::<_, DbTenant>("SELECT * FROM tenants WHERE status = 'active'")
            .fetch_all(&self.pool)
            .await?;
        Ok(tenants)
    }

    pub async fn require_active(&self, id: Uuid) -> DbResult<DbTenant> {
        let tenant = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("tenant {id}")))?;
        if tenant.status != "active" {
            return Err(DbError::InvalidInput(format!("tenant {id} is {}", tenant.status)));
        }
        Ok(tenant)
    }
}
