use thiserror::Error;

/// Platform code for an invalid or expired session key
pub const SESSION_KEY_INVALID: i64 = 102;

/// Platform code for an invalid OAuth access token
pub const OAUTH_TOKEN_INVALID: i64 = 190;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Error reported by the platform in the response body
    #[error("Facebook error {code}: {message}")]
    Platform { code: i64, message: String },

    #[error("Unauthorized - session may be expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Platform error code, if the platform reported one
    pub fn code(&self) -> Option<i64> {
        match self {
            ApiError::Platform { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Coarse origin of the failure
    pub fn domain(&self) -> &'static str {
        match self {
            ApiError::Platform { .. } => "facebook",
            ApiError::Unauthorized | ApiError::AccessDenied(_) | ApiError::ServerError(_) => "http",
            ApiError::NetworkError(_) => "network",
            ApiError::InvalidResponse(_) => "response",
            ApiError::InvalidRequest(_) => "request",
        }
    }

    /// Human-readable message. Platform messages are returned verbatim.
    pub fn message(&self) -> String {
        match self {
            ApiError::Platform { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// True when the platform rejected the session credentials
    pub fn is_session_invalid(&self) -> bool {
        matches!(
            self.code(),
            Some(SESSION_KEY_INVALID) | Some(OAUTH_TOKEN_INVALID)
        ) || matches!(self, ApiError::Unauthorized)
    }
}
