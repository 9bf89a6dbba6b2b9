use thiserror::Error;

use super::OperationKind;
use crate::api::ApiError;

/// Returned synchronously when an operation is started while another is pending
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("a {0} request is already in flight")]
pub struct RequestInFlight(pub OperationKind);

#[derive(Error, Debug)]
pub enum LoginError {
    #[error("Login cancelled by user")]
    Cancelled,

    #[error("Login denied ({reason}): {description}")]
    Denied { reason: String, description: String },

    #[error("Login page failed: {0}")]
    Surface(String),

    #[error("Invalid login redirect: {0}")]
    InvalidRedirect(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl LoginError {
    pub fn domain(&self) -> &'static str {
        match self {
            LoginError::Cancelled | LoginError::Denied { .. } | LoginError::InvalidRedirect(_) => {
                "login"
            }
            LoginError::Surface(_) => "network",
            LoginError::Api(e) => e.domain(),
        }
    }

    /// Platform error code, when the platform rejected the login
    pub fn code(&self) -> Option<i64> {
        match self {
            LoginError::Api(e) => e.code(),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            LoginError::Denied { description, .. } => description.clone(),
            LoginError::Api(e) => e.message(),
            other => other.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum LogoutError {
    #[error("Failed to expire session: {0}")]
    Api(#[from] ApiError),

    #[error("Failed to clear stored session: {0}")]
    Store(String),
}

impl LogoutError {
    pub fn domain(&self) -> &'static str {
        match self {
            LogoutError::Api(e) => e.domain(),
            LogoutError::Store(_) => "storage",
        }
    }

    pub fn message(&self) -> String {
        match self {
            LogoutError::Api(e) => e.message(),
            LogoutError::Store(msg) => msg.clone(),
        }
    }
}
