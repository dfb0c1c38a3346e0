//! Order + order line item repository (tenant-scoped, §4.I).

use chrono::Utc;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{DbOrder, DbOrderLineItem, DbResult};

pub struct OrderRepo;

impl OrderRepo {
    /// Upsert keyed by external id; `synced_at` is always refreshed so a
    /// stale replay doesn't look newer than a subsequent live update only if
    /// the caller checks ordering — this store is last-write-wins by design
    /// (§4.I: "idempotent via upsert-on-external-id with a refreshed
    /// synced-at timestamp"). Financial columns are all integer minor
    /// units (§8 S1).
    pub async fn upsert(conn: &mut PgConnection, order: &DbOrder) -> DbResult<DbOrder> {
        let row = sqlx::query_as::<_, DbOrder>(
            r#"
            INSERT INTO orders (
                id, external_id, order_number, customer_external_id, customer_email, status, fulfillment_status,
                gross_sales_minor, discounts_minor, tax_minor, net_sales_minor, total_amount_minor,
                refunded_amount_minor, currency, synced_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (external_id) DO UPDATE SET
                order_number = EXCLUDED.order_number,
                customer_external_id = EXCLUDED.customer_external_id,
                customer_email = EXCLUDED.customer_email,
                status = EXCLUDED.status,
                gross_sales_minor = EXCLUDED.gross_sales_minor,
                discounts_minor = EXCLUDED.discounts_minor,
                tax_minor = EXCLUDED.tax_minor,
                net_sales_minor = EXCLUDED.net_sales_minor,
                total_amount_minor = EXCLUDED.total_amount_minor,
                currency = EXCLUDED.currency,
                synced_at = EXCLUDED.synced_at
            RETURNING *
            "#,
        )
        .bind(order.id)
        .bind(&order.external_id)
        .bind(&order.order_number)
        .bind(&order.customer_external_id)
        .bind(&order.customer_email)
        .bind(&order.status)
        .bind(&order.fulfillment_status)
        .bind(order.gross_sales_minor)
        .bind(order.discounts_minor)
        .bind(order.tax_minor)
        .bind(order.net_sales_minor)
        .bind(order.total_amount_minor)
        .bind(order.refunded_amount_minor)
        .bind(&order.currency)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn find_by_external_id(conn: &mut PgConnection, external_id: &str) -> DbResult<Option<DbOrder>> {
        let row = sqlx::query_as::<_, DbOrder>("SELECT * FROM orders WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Replaces the order's line items in one transaction-bound statement
    /// set: delete then bulk-insert, matching §5's "child-collection
    /// replacement runs inside a single transaction" resource model.
    pub async fn replace_line_items(
        conn: &mut PgConnection,
        order_id: Uuid,
        items: &[DbOrderLineItem],
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM order_line_items WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *conn)
            .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_line_items (id, order_id, external_id, product_external_id, title, quantity, price_minor, currency)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id)
            .bind(order_id)
            .bind(&item.external_id)
            .bind(&item.product_external_id)
            .bind(&item.title)
            .bind(item.quantity)
            .bind(item.price_minor)
            .bind(&item.currency)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// *updated*/*paid*/*cancelled*: refreshes financial/fulfillment status
    /// only, per §4.I (no line-item replacement on these topics).
    pub async fn update_status(
        conn: &mut PgConnection,
        external_id: &str,
        status: &str,
        fulfillment_status: Option<&str>,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE orders SET status = $2, fulfillment_status = COALESCE($3, fulfillment_status), synced_at = $4 WHERE external_id = $1",
        )
        .bind(external_id)
        .bind(status)
        .bind(fulfillment_status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// *refunds/create*: atomically adds to the running refunded-amount
    /// total (§4.I "increments the order's refunded-amount column").
    pub async fn increment_refunded_amount(
        conn: &mut PgConnection,
        external_id: &str,
        amount_minor: i64,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE orders SET refunded_amount_minor = refunded_amount_minor + $2, synced_at = $3 WHERE external_id = $1",
        )
        .bind(external_id)
        .bind(amount_minor)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// GDPR `customers/redact`: rewrites `customer_email` to the shared
    /// sentinel for exactly the orders the request named (§4.I), leaving
    /// every other order column — including `customer_external_id` — intact
    /// so order history stays queryable.
    pub async fn redact_customer_email(
        conn: &mut PgConnection,
        external_ids: &[String],
        sentinel_email: &str,
    ) -> DbResult<()> {
        sqlx::query("UPDATE orders SET customer_email = $2 WHERE external_id = ANY($1)")
            .bind(external_ids)
            .bind(sentinel_email)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
