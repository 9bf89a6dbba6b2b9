//! Endpoint and transport configuration for the API client.
//!
//! The defaults point at the production Facebook hosts. Tests and
//! alternative deployments override the URLs.

use serde::{Deserialize, Serialize};

/// REST endpoint for all API method calls
pub const DEFAULT_REST_URL: &str = "https://api.facebook.com/restserver.php";

/// Login page opened in the login surface
pub const DEFAULT_LOGIN_URL: &str = "https://www.facebook.com/login.php";

/// Redirect target after a successful login
pub const DEFAULT_SUCCESS_URL: &str = "https://www.facebook.com/connect/login_success.html";

/// Redirect target after a cancelled or denied login
pub const DEFAULT_CANCEL_URL: &str = "https://www.facebook.com/connect/login_failure.html";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub rest_url: String,
    pub login_url: String,
    pub success_url: String,
    pub cancel_url: String,
    pub timeout_secs: u64,
    /// Extended permissions requested at login (`req_perms`)
    pub permissions: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rest_url: DEFAULT_REST_URL.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            success_url: DEFAULT_SUCCESS_URL.to_string(),
            cancel_url: DEFAULT_CANCEL_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            permissions: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Point the REST endpoint at a different host, keeping the other defaults.
    pub fn with_rest_url(mut self, rest_url: impl Into<String>) -> Self {
        self.rest_url = rest_url.into();
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }
}
