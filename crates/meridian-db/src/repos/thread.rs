//! Thread + thread-message repository (tenant-scoped, §4.I
//! *support*/*creator*): one open thread per contact and purpose, or a
//! resolved thread keyed by the mail's reference chain.

use chrono::Utc;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{DbResult, DbThreadMessageRecord, DbThreadRecord};

pub struct ThreadRepo;

impl ThreadRepo {
    pub async fn find_by_external_key(conn: &mut PgConnection, external_thread_key: &str) -> DbResult<Option<DbThreadRecord>> {
        let row = sqlx::query_as::<_, DbThreadRecord>(
            "SELECT * FROM threads WHERE external_thread_key = $1",
        )
        .bind(external_thread_key)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row)
    }

    /// "Open-per-contact" fallback when no reference chain resolves a
    /// thread: the most recently active open thread for this contact and
    /// purpose, if any.
    pub async fn find_open_for_contact(conn: &mut PgConnection, contact_id: Uuid, purpose: &str) -> DbResult<Option<DbThreadRecord>> {
        let row = sqlx::query_as::<_, DbThreadRecord>(
            "SELECT * FROM threads WHERE contact_id = $1 AND purpose = $2 AND status = 'open' ORDER BY last_inbound_at DESC LIMIT 1",
        )
        .bind(contact_id)
        .bind(purpose)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn create(
        conn: &mut PgConnection,
        contact_id: Uuid,
        purpose: &str,
        subject: Option<&str>,
        external_thread_key: &str,
    ) -> DbResult<DbThreadRecord> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, DbThreadRecord>(
            r#"
            INSERT INTO threads (id, contact_id, purpose, subject, external_thread_key, status, message_count, last_inbound_at, created_at)
            VALUES ($1, $2, $3, $4, $5, 'open', 0, $6, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(contact_id)
        .bind(purpose)
        .bind(subject)
        .bind(external_thread_key)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    /// Inserts the inbound message and bumps the parent thread's counters
    /// and last-inbound timestamp in the same call (§3 "thread record:
    /// counts, timestamps").
    pub async fn append_message(
        conn: &mut PgConnection,
        thread_id: Uuid,
        source_event_id: Uuid,
        sender: &str,
        body_excerpt: &str,
    ) -> DbResult<DbThreadMessageRecord> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, DbThreadMessageRecord>(
            r#"
            INSERT INTO thread_messages (id, thread_id, source_event_id, sender, body_excerpt, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(thread_id)
        .bind(source_event_id)
        .bind(sender)
        .bind(body_excerpt)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(
            "UPDATE threads SET message_count = message_count + 1, last_inbound_at = $2 WHERE id = $1",
        )
        .bind(thread_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(row)
    }
}
