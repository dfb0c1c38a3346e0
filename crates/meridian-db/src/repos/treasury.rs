//! Treasury-communication repository (tenant-scoped, §4.I *treasury*):
//! append-only audit of parsed approval/rejection verdicts.

use chrono::Utc;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{DbResult, DbTreasuryCommunication};

pub struct TreasuryCommunicationRepo;

impl TreasuryCommunicationRepo {
    pub async fn insert(
        conn: &mut PgConnection,
        source_event_id: Uuid,
        request_id: Option<&str>,
        direction: &str,
        verdict: &str,
        confidence: &str,
        matched_tokens: &[String],
    ) -> DbResult<DbTreasuryCommunication> {
        let row = sqlx::query_as::<_, DbTreasuryCommunication>(
            r#"
            INSERT INTO treasury_communications (
                id, source_event_id, request_id, direction, verdict, confidence, matched_tokens, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(source_event_id)
        .bind(request_id)
        .bind(direction)
        .bind(verdict)
        .bind(confidence)
        .bind(matched_tokens)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }
}
