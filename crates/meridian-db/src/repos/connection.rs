//! External-source connection registry rows (§3, §4.C).

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbConnection, DbResult};

pub struct ConnectionRepo {
    pool: PgPool,
}

impl ConnectionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The only active connection for an external id, used by
    /// `resolveByShop` (§4.C). At most one active connection per (tenant,
    /// external id) is an invariant enforced by a unique index.
    pub async fn find_active_by_external_id(&self, external_id: &str) -> DbResult<Option<DbConnection>> {
        let conn = sqlx::query_as::<_, DbConnection>(
            "SELECT * FROM connections WHERE external_id = $1 AND status = 'active'",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(conn)
    }

    pub async fn find_by_tenant(&self, tenant_id: Uuid, external_id: &str) -> DbResult<Option<DbConnection>> {
        let conn = sqlx::query_as::<_, DbConnection>(
            "SELECT * FROM connections WHERE tenant_id = $1 AND external_id = $2 AND status != 'deleted'",
        )
        .bind(tenant_id)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(conn)
    }

    pub async fn upsert(&self, conn: &DbConnection) -> DbResult<DbConnection> {
        let row = sqlx::query_as::<_, DbConnection>(
            r#"
            INSERT INTO connections (
                id, tenant_id, external_id, sealed_access_token, sealed_webhook_secret,
                capabilities, protocol_version, status, last_inbound_at, last_sync_at,
                installed_at, consecutive_registration_failures
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (tenant_id, external_id) DO UPDATE SET
                sealed_access_token = EXCLUDED.sealed_access_token,
                sealed_webhook_secret = EXCLUDED.sealed_webhook_secret,
                capabilities = EXCLUDED.capabilities,
                protocol_version = EXCLUDED.protocol_version,
                status = EXCLUDED.status
            RETURNING *
            "#,
        )
        .bind(conn.id)
        .bind(conn.tenant_id)
        .bind(&conn.external_id)
        .bind(&conn.sealed_access_token)
        .bind(&conn.sealed_webhook_secret)
        .bind(&conn.capabilities)
        .bind(&conn.protocol_version)
        .bind(&conn.status)
        .bind(conn.last_inbound_at)
        .bind(conn.last_sync_at)
        .bind(conn.installed_at)
        .bind(conn.consecutive_registration_failures)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn mark_disconnected(&self, id: Uuid) -> DbResult<()> {
        sqlx::query(
            "UPDATE connections SET status = 'disconnected', sealed_access_token = '', sealed_webhook_secret = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_deleted(&self, id: Uuid) -> DbResult<()> {
        sqlx::query(
            "UPDATE connections SET status = 'deleted', sealed_access_token = '', sealed_webhook_secret = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn touch_last_inbound(&self, id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE connections SET last_inbound_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn touch_last_sync(&self, id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE connections SET last_sync_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// >5 consecutive registration failures flips status to `failed`; a
    /// success zeros the counter and restores `active` (§4.L).
    pub async fn record_registration_failure(&self, id: Uuid) -> DbResult<i32> {
        let row: (i32,) = sqlx::query_as(
            "UPDATE connections SET consecutive_registration_failures = consecutive_registration_failures + 1 WHERE id = $1 RETURNING consecutive_registration_failures",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if row.0 > 5 {
            sqlx::query("UPDATE connections SET status = 'failed' WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        Ok(row.0)
    }

    pub async fn record_registration_success(&self, id: Uuid) -> DbResult<()> {
        sqlx::query(
            "UPDATE connections SET consecutive_registration_failures = 0, status = 'active' WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
