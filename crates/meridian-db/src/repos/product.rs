//! Product repository (tenant-scoped, §4.I).

use chrono::Utc;
use sqlx::PgConnection;

use crate::{DbProduct, DbResult};

pub struct ProductRepo;

impl ProductRepo {
    pub async fn upsert(conn: &mut PgConnection, product: &DbProduct) -> DbResult<DbProduct> {
        let row = sqlx::query_as::<_, DbProduct>(
            r#"
            INSERT INTO products (id, external_id, title, status, synced_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (external_id) DO UPDATE SET
                title = EXCLUDED.title,
                status = EXCLUDED.status,
                synced_at = EXCLUDED.synced_at
            RETURNING *
            "#,
        )
        .bind(product.id)
        .bind(&product.external_id)
        .bind(&product.title)
        .bind(&product.status)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    /// `products/delete`: archives rather than removing the row (§4.I).
    pub async fn mark_archived(conn: &mut PgConnection, external_id: &str) -> DbResult<()> {
        sqlx::query("UPDATE products SET status = 'archived', synced_at = $2 WHERE external_id = $1")
            .bind(external_id)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
