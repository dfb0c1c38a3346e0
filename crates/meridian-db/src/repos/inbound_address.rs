//! Inbound email address routing table (§3).

use sqlx::PgPool;

use crate::{DbInboundAddress, DbResult};

pub struct InboundAddressRepo {
    pool: PgPool,
}

impl InboundAddressRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `resolveByInboundAddress`: lookup is always lower-cased (§3 unique
    /// index is on the lower-cased address).
    pub async fn find_by_address(&self, address: &str) -> DbResult<Option<DbInboundAddress>> {
        let row = sqlx::query_as::<_, DbInboundAddress>(
            "SELECT * FROM inbound_addresses WHERE address = $1 AND enabled = true",
        )
        .bind(address.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
