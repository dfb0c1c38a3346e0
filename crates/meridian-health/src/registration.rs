//! Registration status rollup (§4.L): per (tenant, external source) — is
//! the connection healthy enough to keep receiving webhooks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use meridian_db::Database;

use crate::error::HealthError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationStatus {
    pub connection_id: Uuid,
    pub external_id: String,
    pub status: String,
    pub consecutive_registration_failures: i32,
    pub last_inbound_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_sync_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Reads the connection row for `(tenant_id, external_id)` and reports its
/// registration health. This is read-only — the failure counter itself is
/// mutated by `ConnectionRepo::record_registration_{failure,success}`,
/// called from the bootstrap registration routine (an external
/// collaborator, §1), not from here.
pub async fn registration_status(
    db: &Database,
    tenant_id: Uuid,
    external_id: &str,
) -> Result<RegistrationStatus, HealthError> {
    let connection = db
        .connection_repo()
        .find_by_tenant(tenant_id, external_id)
        .await?
        .ok_or(HealthError::ConnectionNotFound)?;

    Ok(RegistrationStatus {
        connection_id: connection.id,
        external_id: connection.external_id,
        status: connection.status,
        consecutive_registration_failures: connection.consecutive_registration_failures,
        last_inbound_at: connection.last_inbound_at,
        last_sync_at: connection.last_sync_at,
    })
}
