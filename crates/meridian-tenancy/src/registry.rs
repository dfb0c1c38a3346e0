//! Tenant Registry (§4.C): maps external identifiers to tenant identity,
//! resolves connections, and opens sealed credentials through a short-lived
//! in-process cache.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use meridian_crypto::CredentialSealer;
use meridian_db::{Database, DbConnection};
use meridian_types::TenantId;

use crate::error::TenancyError;

/// Default credential cache TTL (§6: "credential cache TTL ... defaulted").
/// `TenantRegistry::new` takes the configured value; this is only the
/// fallback `new_with_default_ttl` and tests use.
pub const DEFAULT_CREDENTIAL_CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct CachedCredentials {
    pub access_token: Vec<u8>,
    pub webhook_secret: Option<Vec<u8>>,
}

pub struct Resolved {
    pub tenant_id: TenantId,
    pub tenant_slug: String,
    pub connection: DbConnection,
}

/// `dashmap::DashMap<TenantId, (Instant, CachedCredentials)>` guarded by a
/// TTL check on read — concurrency-safe without an explicit mutex (§4.C).
pub struct TenantRegistry {
    db: Database,
    sealer: CredentialSealer,
    credential_cache: DashMap<TenantId, (Instant, CachedCredentials)>,
    credential_cache_ttl: Duration,
}

impl TenantRegistry {
    pub fn new(db: Database, sealer: CredentialSealer, credential_cache_ttl: Duration) -> Self {
        Self {
            db,
            sealer,
            credential_cache: DashMap::new(),
            credential_cache_ttl,
        }
    }

    pub fn new_with_default_ttl(db: Database, sealer: CredentialSealer) -> Self {
        Self::new(db, sealer, DEFAULT_CREDENTIAL_CACHE_TTL)
    }

    /// `resolveByShop`: the single active connection for an external source
    /// id, or `TenantNotFound`/`NotConnected`.
    pub async fn resolve_by_shop(&self, external_id: &str) -> Result<Resolved, TenancyError> {
        let connection = self
            .db
            .connection_repo()
            .find_active_by_external_id(external_id)
            .await?
            .ok_or(TenancyError::NotConnected)?;

        let tenant = self
            .db
            .tenant_repo()
            .require_active(connection.tenant_id)
            .await
            .map_err(|_| TenancyError::TenantNotActive)?;

        Ok(Resolved {
            tenant_id: TenantId::from_uuid(tenant.id),
            tenant_slug: tenant.slug,
            connection,
        })
    }

    /// `resolveByInboundAddress`: tenant + purpose for an inbound email
    /// address (lower-cased lookup is performed by the repo).
    pub async fn resolve_by_inbound_address(
        &self,
        address: &str,
    ) -> Result<(TenantId, String, meridian_db::DbInboundAddress), TenancyError> {
        let row = self
            .db
            .inbound_address_repo()
            .find_by_address(address)
            .await?
            .ok_or(TenancyError::TenantNotFound)?;

        let tenant = self
            .db
            .tenant_repo()
            .require_active(row.tenant_id)
            .await
            .map_err(|_| TenancyError::TenantNotActive)?;

        Ok((TenantId::from_uuid(tenant.id), tenant.slug, row))
    }

    pub async fn get_connection(&self, tenant_id: TenantId, external_id: &str) -> Result<DbConnection, TenancyError> {
        let conn = self
            .db
            .connection_repo()
            .find_by_tenant(tenant_id.0, external_id)
            .await?
            .filter(|c| c.status != "disconnected")
            .ok_or(TenancyError::NotConnected)?;
        Ok(conn)
    }

    /// Opens the sealed access token and webhook secret for a connection,
    /// serving from the 60s TTL cache when present and fresh.
    pub async fn get_sealed_credentials(&self, connection: &DbConnection) -> Result<CachedCredentials, TenancyError> {
        let tenant_id = TenantId::from_uuid(connection.tenant_id);

        if let Some(entry) = self.credential_cache.get(&tenant_id) {
            let (cached_at, creds) = entry.value();
            if cached_at.elapsed() < self.credential_cache_ttl {
                return Ok(creds.clone());
            }
        }

        let access_token = self.sealer.open(&meridian_crypto::SealedSecret::from_raw(
            connection.sealed_access_token.clone(),
        ))?;

        let webhook_secret = match &connection.sealed_webhook_secret {
            Some(sealed) => Some(self.sealer.open(&meridian_crypto::SealedSecret::from_raw(sealed.clone()))?),
            None => None,
        };

        let creds = CachedCredentials {
            access_token,
            webhook_secret,
        };

        self.credential_cache.insert(tenant_id, (Instant::now(), creds.clone()));

        Ok(creds)
    }

    fn invalidate_credentials(&self, tenant_id: TenantId) {
        self.credential_cache.remove(&tenant_id);
    }

    pub async fn upsert_connection(&self, connection: &DbConnection) -> Result<DbConnection, TenancyError> {
        let row = self.db.connection_repo().upsert(connection).await?;
        self.invalidate_credentials(TenantId::from_uuid(row.tenant_id));
        Ok(row)
    }

    pub async fn mark_connection_disconnected(&self, connection: &DbConnection) -> Result<(), TenancyError> {
        self.db.connection_repo().mark_disconnected(connection.id).await?;
        self.invalidate_credentials(TenantId::from_uuid(connection.tenant_id));
        Ok(())
    }

    pub async fn mark_connection_deleted(&self, connection: &DbConnection) -> Result<(), TenancyError> {
        self.db.connection_repo().mark_deleted(connection.id).await?;
        self.invalidate_credentials(TenantId::from_uuid(connection.tenant_id));
        Ok(())
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_entry_considered_stale_after_ttl() {
        let cached_at = Instant::now() - Duration::from_secs(61);
        assert!(cached_at.elapsed() >= DEFAULT_CREDENTIAL_CACHE_TTL);
    }
}
