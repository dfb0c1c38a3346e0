//! Receipt repository (tenant-scoped, §4.I *receipts*).

use chrono::Utc;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{DbReceiptRecord, DbResult};

pub struct ReceiptRepo;

impl ReceiptRepo {
    pub async fn insert(
        conn: &mut PgConnection,
        source_event_id: Uuid,
        vendor: Option<&str>,
        amount_minor: Option<i64>,
        currency: Option<&str>,
        occurred_on: Option<chrono::DateTime<Utc>>,
        attachment_urls: &[String],
    ) -> DbResult<DbReceiptRecord> {
        let row = sqlx::query_as::<_, DbReceiptRecord>(
            r#"
            INSERT INTO receipts (
                id, source_event_id, vendor, amount_minor, currency, occurred_on,
                attachment_urls, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'recorded', $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(source_event_id)
        .bind(vendor)
        .bind(amount_minor)
        .bind(currency)
        .bind(occurred_on)
        .bind(attachment_urls)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }
}
