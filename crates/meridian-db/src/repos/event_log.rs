//! The idempotency store (§4.E): the tenant-schema-scoped `event_log` table.
//!
//! All methods take an already tenant-scoped connection — callers must be
//! inside a `TenantScope` (`meridian-tenancy`) before calling any of these.

use chrono::Utc;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{DbEventRecord, DbResult};

pub enum ReserveOutcome {
    Inserted(DbEventRecord),
    Existing(DbEventRecord),
}

pub struct EventLogRepo;

impl EventLogRepo {
    /// Insert-if-absent on `idempotency_key`. A conflict returns the
    /// existing row rather than erroring — the standard Postgres
    /// "upsert as dedup" idiom, avoiding a check-then-insert race (§4.E).
    pub async fn reserve(
        conn: &mut PgConnection,
        external_source_id: &str,
        topic: &str,
        external_event_id: Option<&str>,
        payload: serde_json::Value,
        headers: serde_json::Value,
        hmac_verified: bool,
        idempotency_key: &str,
    ) -> DbResult<ReserveOutcome> {
        let id = Uuid::new_v4();
        let inserted = sqlx::query_as::<_, DbEventRecord>(
            r#"
            INSERT INTO event_log (
                id, external_source_id, topic, external_event_id, payload,
                hmac_verified, status, processed_at, error_message, retry_count,
                idempotency_key, received_at, headers
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', NULL, NULL, 0, $7, $8, $9)
            ON CONFLICT (idempotency_key) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(external_source_id)
        .bind(topic)
        .bind(external_event_id)
        .bind(&payload)
        .bind(hmac_verified)
        .bind(idempotency_key)
        .bind(Utc::now())
        .bind(&headers)
        .fetch_optional(&mut *conn)
        .await?;

        match inserted {
            Some(row) => Ok(ReserveOutcome::Inserted(row)),
            None => {
                let existing = sqlx::query_as::<_, DbEventRecord>(
                    "SELECT * FROM event_log WHERE idempotency_key = $1",
                )
                .bind(idempotency_key)
                .fetch_one(&mut *conn)
                .await?;
                Ok(ReserveOutcome::Existing(existing))
            }
        }
    }

    pub async fn mark_completed(conn: &mut PgConnection, id: Uuid) -> DbResult<()> {
        sqlx::query(
            "UPDATE event_log SET status = 'completed', processed_at = $2, error_message = NULL WHERE id = $1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(conn: &mut PgConnection, id: Uuid, error_message: &str) -> DbResult<()> {
        sqlx::query(
            "UPDATE event_log SET status = 'failed', processed_at = $2, error_message = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(Utc::now())
        .bind(error_message)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// `reason` is stored in `error_message` for audit (§4.G: "mark the
    /// event ignored with reason"), even though it is not actually an error.
    pub async fn mark_ignored(conn: &mut PgConnection, id: Uuid, reason: &str) -> DbResult<()> {
        sqlx::query(
            "UPDATE event_log SET status = 'ignored', processed_at = $2, error_message = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(Utc::now())
        .bind(reason)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Resets a failed event back to pending for redispatch, keeping the
    /// idempotency key and original payload unchanged (§4.L).
    pub async fn retry(conn: &mut PgConnection, id: Uuid) -> DbResult<DbEventRecord> {
        let row = sqlx::query_as::<_, DbEventRecord>(
            r#"
            UPDATE event_log
            SET status = 'pending', retry_count = retry_count + 1, error_message = NULL
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> DbResult<Option<DbEventRecord>> {
        let row = sqlx::query_as::<_, DbEventRecord>("SELECT * FROM event_log WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Failed events still worth retrying (§4.L): under the max attempt
    /// count and received within the lookback window. Ordered oldest-first
    /// so a bounded retry sweep drains the longest-waiting events first.
    pub async fn find_failed_eligible_for_retry(
        conn: &mut PgConnection,
        max_retry_count: i32,
        received_after: chrono::DateTime<Utc>,
        limit: i64,
    ) -> DbResult<Vec<DbEventRecord>> {
        let rows = sqlx::query_as::<_, DbEventRecord>(
            r#"
            SELECT * FROM event_log
            WHERE status = 'failed' AND retry_count < $1 AND received_at >= $2
            ORDER BY received_at ASC
            LIMIT $3
            "#,
        )
        .bind(max_retry_count)
        .bind(received_after)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    pub async fn counts_by_status_since(
        conn: &mut PgConnection,
        since: chrono::DateTime<Utc>,
    ) -> DbResult<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM event_log WHERE received_at >= $1 GROUP BY status",
        )
        .bind(since)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    pub async fn counts_by_topic_since(
        conn: &mut PgConnection,
        since: chrono::DateTime<Utc>,
    ) -> DbResult<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT topic, COUNT(*) FROM event_log WHERE received_at >= $1 GROUP BY topic",
        )
        .bind(since)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }
}
