//! Contact repository (tenant-scoped, §4.I *support*/*creator*): resolves a
//! sender address to a durable contact row, creating one on first contact.

use chrono::Utc;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{DbContact, DbResult};

pub struct ContactRepo;

impl ContactRepo {
    pub async fn find_by_email(conn: &mut PgConnection, email: &str) -> DbResult<Option<DbContact>> {
        let row = sqlx::query_as::<_, DbContact>("SELECT * FROM contacts WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    pub async fn find_or_create(conn: &mut PgConnection, email: &str, display_name: Option<&str>) -> DbResult<DbContact> {
        if let Some(existing) = Self::find_by_email(conn, email).await? {
            return Ok(existing);
        }

        let row = sqlx::query_as::<_, DbContact>(
            r#"
            INSERT INTO contacts (id, email, display_name, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email.to_lowercase())
        .bind(display_name)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }
}
