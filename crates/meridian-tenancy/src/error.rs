use thiserror::Error;

#[derive(Debug, Error)]
pub enum TenancyError {
    #[error("tenant not found")]
    TenantNotFound,
    #[error("tenant is not active")]
    TenantNotActive,
    #[error("no active connection")]
    NotConnected,
    #[error("credential seal error: {0}")]
    Seal(#[from] meridian_crypto::SealError),
    #[error("storage error: {0}")]
    Db(#[from] meridian_db::DbError),
}
