//! OAuth handshake state (§3): short-lived, single-use.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbOAuthState, DbResult};

pub struct OAuthStateRepo {
    pool: PgPool,
}

impl OAuthStateRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, state: &DbOAuthState) -> DbResult<DbOAuthState> {
        let row = sqlx::query_as::<_, DbOAuthState>(
            r#"
            INSERT INTO oauth_states (id, tenant_id, external_source_candidate, redirect, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(state.id)
        .bind(state.tenant_id)
        .bind(&state.external_source_candidate)
        .bind(&state.redirect)
        .bind(state.expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Consumes the state row atomically: deletes it and returns what was
    /// there, or `None` if already used or never existed. Expired rows are
    /// treated as absent even though a background sweep also reaps them.
    pub async fn consume(&self, id: Uuid) -> DbResult<Option<DbOAuthState>> {
        let row = sqlx::query_as::<_, DbOAuthState>(
            "DELETE FROM oauth_states WHERE id = $1 AND expires_at > $2 RETURNING *",
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn sweep_expired(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM oauth_states WHERE expires_at <= $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
