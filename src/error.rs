use rmcp::ErrorData as RpcError;

use thiserror::Error;
use tokio::io;

pub type ServiceResult<T> = core::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The caller handed over something that is not lesson text (or an unknown field path).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("api error: {0}")]
    ApiError(String),
    #[error("calendar parse error: {0}")]
    CalendarParse(String),
    #[error("draft not found: {0}")]
    DraftNotFound(String),
    #[error("{0}")]
    RpcError(#[from] RpcError),
    #[error("{0}")]
    IoError(#[from] io::Error),
    #[error("{0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl From<ServiceError> for RpcError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(msg) => RpcError::invalid_params(msg, None),
            ServiceError::DraftNotFound(id) => {
                RpcError::invalid_params(format!("draft not found: {id}"), None)
            }
            ServiceError::RpcError(inner) => inner,
            other => RpcError::internal_error(other.to_string(), None),
        }
    }
}
