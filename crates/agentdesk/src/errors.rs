use thiserror::Error;

pub const BAD_REQUEST: u16 = 400;
pub const INTERNAL_SERVER_ERROR: u16 = 500;
pub const BAD_GATEWAY: u16 = 502;
pub const SERVICE_UNAVAILABLE: u16 = 503;

/// The one error every operation reports. The variant records the cause,
/// `status_code` the transport status the boundary should answer with.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// A key or default identifier the server needs is not set.
    #[error("{0}")]
    NotConfigured(String),

    /// The caller sent something unusable.
    #[error("{0}")]
    InvalidRequest(String),

    /// A remote call failed or returned something unusable. `status` is the
    /// remote's own status when it answered with one, 502 otherwise.
    #[error("{message}")]
    Upstream { message: String, status: u16 },

    /// The blocking-call queue is full.
    #[error("{0}")]
    Busy(String),
}

impl ServiceError {
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::NotConfigured(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Upstream failure with no usable remote status.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            status: BAD_GATEWAY,
        }
    }

    pub fn upstream_status(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            status,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::NotConfigured(_) => INTERNAL_SERVER_ERROR,
            ServiceError::InvalidRequest(_) => BAD_REQUEST,
            ServiceError::Upstream { status, .. } => *status,
            ServiceError::Busy(_) => SERVICE_UNAVAILABLE,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
