//! Customer + customer address repository (tenant-scoped, §4.I).

use chrono::Utc;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{DbCustomer, DbCustomerAddress, DbResult};

pub struct CustomerRepo;

impl CustomerRepo {
    pub async fn upsert(conn: &mut PgConnection, customer: &DbCustomer) -> DbResult<DbCustomer> {
        let row = sqlx::query_as::<_, DbCustomer>(
            r#"
            INSERT INTO customers (id, external_id, email, first_name, last_name, phone, synced_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (external_id) DO UPDATE SET
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                phone = EXCLUDED.phone,
                synced_at = EXCLUDED.synced_at
            RETURNING *
            "#,
        )
        .bind(customer.id)
        .bind(&customer.external_id)
        .bind(&customer.email)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.phone)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn find_by_external_id(conn: &mut PgConnection, external_id: &str) -> DbResult<Option<DbCustomer>> {
        let row = sqlx::query_as::<_, DbCustomer>("SELECT * FROM customers WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Replaces the customer's address list: delete-then-insert within one
    /// caller-managed transaction (§5 "child-collection replacement").
    pub async fn replace_addresses(
        conn: &mut PgConnection,
        customer_external_id: &str,
        addresses: &[DbCustomerAddress],
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM customer_addresses WHERE customer_external_id = $1")
            .bind(customer_external_id)
            .execute(&mut *conn)
            .await?;

        for addr in addresses {
            sqlx::query(
                r#"
                INSERT INTO customer_addresses (id, customer_external_id, line1, line2, city, province, country, zip)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(customer_external_id)
            .bind(&addr.line1)
            .bind(&addr.line2)
            .bind(&addr.city)
            .bind(&addr.province)
            .bind(&addr.country)
            .bind(&addr.zip)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// GDPR `customers/delete` and `customers/redact`: scrubs PII but keeps
    /// the row for audit (§3 "soft delete... retained for audit"); email is
    /// rewritten to a deterministic sentinel derived from the external id
    /// so order history referencing it stays joinable.
    pub async fn redact(conn: &mut PgConnection, external_id: &str, sentinel_email: &str) -> DbResult<()> {
        sqlx::query(
            "UPDATE customers SET email = $2, first_name = 'Redacted', last_name = 'Customer', phone = NULL, synced_at = $3 WHERE external_id = $1",
        )
        .bind(external_id)
        .bind(sentinel_email)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM customer_addresses WHERE customer_external_id = $1")
            .bind(external_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}

/// `email → sentinel` derivation shared by `customers/delete` and the GDPR
/// `customers/redact` topic (§4.I): stable per external id so repeated
/// redaction requests are idempotent.
pub fn redaction_sentinel_email(external_id: &str) -> String {
    format!("redacted+{external_id}@deleted.invalid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_email_is_deterministic() {
        assert_eq!(redaction_sentinel_email("100001"), redaction_sentinel_email("100001"));
        assert_ne!(redaction_sentinel_email("100001"), redaction_sentinel_email("100002"));
    }
}
