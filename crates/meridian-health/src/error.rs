use thiserror::Error;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("event {0} not found")]
    EventNotFound(uuid::Uuid),
    #[error("connection not found for tenant")]
    ConnectionNotFound,
    #[error("storage error: {0}")]
    Storage(#[from] meridian_db::DbError),
    #[error("tenancy error: {0}")]
    Tenancy(#[from] meridian_tenancy::TenancyError),
}
