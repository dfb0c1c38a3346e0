use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    Failed(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<meridian_db::DbError> for HandlerError {
    fn from(e: meridian_db::DbError) -> Self {
        HandlerError::Storage(e.to_string())
    }
}

impl From<meridian_tenancy::TenancyError> for HandlerError {
    fn from(e: meridian_tenancy::TenancyError) -> Self {
        HandlerError::Storage(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatch deadline exceeded")]
    Deadline,
    #[error("enqueue channel closed")]
    ChannelClosed,
    #[error("storage error: {0}")]
    Storage(#[from] meridian_db::DbError),
}
