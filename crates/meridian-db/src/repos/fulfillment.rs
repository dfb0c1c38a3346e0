//! Fulfillment repository (tenant-scoped, §4.I).

use chrono::Utc;
use sqlx::PgConnection;

use crate::{DbFulfillment, DbResult};

pub struct FulfillmentRepo;

impl FulfillmentRepo {
    pub async fn upsert(conn: &mut PgConnection, fulfillment: &DbFulfillment) -> DbResult<DbFulfillment> {
        let row = sqlx::query_as::<_, DbFulfillment>(
            r#"
            INSERT INTO fulfillments (id, external_id, order_external_id, status, tracking_number, tracking_url, synced_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (external_id) DO UPDATE SET
                status = EXCLUDED.status,
                tracking_number = EXCLUDED.tracking_number,
                tracking_url = EXCLUDED.tracking_url,
                synced_at = EXCLUDED.synced_at
            RETURNING *
            "#,
        )
        .bind(fulfillment.id)
        .bind(&fulfillment.external_id)
        .bind(&fulfillment.order_external_id)
        .bind(&fulfillment.status)
        .bind(&fulfillment.tracking_number)
        .bind(&fulfillment.tracking_url)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }
}
