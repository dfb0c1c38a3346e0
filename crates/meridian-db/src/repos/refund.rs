//! Refund + refund line item repository (tenant-scoped, §4.I).

use chrono::Utc;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{DbRefund, DbRefundLineItem, DbResult};

pub struct RefundRepo;

impl RefundRepo {
    /// Inserts a refund row aggregating successful refund transactions into
    /// a single minor-unit total (§4.I).
    pub async fn upsert(conn: &mut PgConnection, refund: &DbRefund) -> DbResult<DbRefund> {
        let row = sqlx::query_as::<_, DbRefund>(
            r#"
            INSERT INTO refunds (id, external_id, order_external_id, amount_minor, currency, reason, synced_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (external_id) DO UPDATE SET
                amount_minor = EXCLUDED.amount_minor,
                currency = EXCLUDED.currency,
                reason = EXCLUDED.reason,
                synced_at = EXCLUDED.synced_at
            RETURNING *
            "#,
        )
        .bind(refund.id)
        .bind(&refund.external_id)
        .bind(&refund.order_external_id)
        .bind(refund.amount_minor)
        .bind(&refund.currency)
        .bind(&refund.reason)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn find_by_order_external_id(
        conn: &mut PgConnection,
        order_external_id: &str,
    ) -> DbResult<Vec<DbRefund>> {
        let rows = sqlx::query_as::<_, DbRefund>(
            "SELECT * FROM refunds WHERE order_external_id = $1 ORDER BY synced_at DESC",
        )
        .bind(order_external_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// Replaces a refund's line items: delete-then-insert, atomic per
    /// parent (§5).
    pub async fn replace_line_items(
        conn: &mut PgConnection,
        refund_id: Uuid,
        items: &[DbRefundLineItem],
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM refund_line_items WHERE refund_id = $1")
            .bind(refund_id)
            .execute(&mut *conn)
            .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO refund_line_items (id, refund_id, order_line_item_external_id, quantity, amount_minor)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(refund_id)
            .bind(&item.order_line_item_external_id)
            .bind(item.quantity)
            .bind(item.amount_minor)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}
