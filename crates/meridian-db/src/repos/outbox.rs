//! Durable job spool (§3b, §4.K): written when the live sink can't ack a
//! follow-up job within its deadline, drained by a background flusher.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{DbOutboxJob, DbResult};

pub struct OutboxRepo;

impl OutboxRepo {
    pub async fn enqueue(
        conn: &mut PgConnection,
        tenant_id: Uuid,
        topic: &str,
        payload: serde_json::Value,
    ) -> DbResult<DbOutboxJob> {
        let row = sqlx::query_as::<_, DbOutboxJob>(
            r#"
            INSERT INTO job_outbox (id, tenant_id, topic, payload, attempts, next_attempt_at, enqueued_at)
            VALUES ($1, $2, $3, $4, 0, $5, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(topic)
        .bind(payload)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn claim_due(conn: &mut PgConnection, now: DateTime<Utc>, limit: i64) -> DbResult<Vec<DbOutboxJob>> {
        let rows = sqlx::query_as::<_, DbOutboxJob>(
            "SELECT * FROM job_outbox WHERE next_attempt_at <= $1 ORDER BY enqueued_at ASC LIMIT $2",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// Exponential backoff: `next_attempt_at = now + 2^attempts` seconds,
    /// capped by the caller's retry policy.
    pub async fn record_attempt_failure(
        conn: &mut PgConnection,
        id: Uuid,
        next_attempt_at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE job_outbox SET attempts = attempts + 1, next_attempt_at = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(next_attempt_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> DbResult<()> {
        sqlx::query("DELETE FROM job_outbox WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
