//! Interactive login through a browser-like surface.
//!
//! The session hands the surface a login URL plus the two redirect prefixes
//! that end the flow. The surface reports the final redirect URL, or that
//! the user closed it. Extracting credentials from the redirect happens here.

use async_trait::async_trait;
use url::Url;

use super::SessionRecord;
use crate::config::ClientConfig;
use crate::session::LoginError;
use crate::utils::exists;

/// API version sent with login and REST calls
pub const API_VERSION: &str = "1.0";

/// What the login surface is asked to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    /// Page to open
    pub url: Url,
    /// A navigation starting with this prefix ends the flow successfully
    pub success_prefix: String,
    /// A navigation starting with this prefix ends the flow as cancelled/denied
    pub cancel_prefix: String,
}

impl LoginRequest {
    /// True once `url` is one of the redirects that ends the flow
    pub fn is_terminal(&self, url: &str) -> bool {
        url.starts_with(&self.success_prefix) || url.starts_with(&self.cancel_prefix)
    }
}

/// How the login surface finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The surface navigated to a terminal redirect
    Redirected(Url),
    /// The user closed the surface before a redirect happened
    Cancelled,
    /// The surface could not load the page
    Failed(String),
}

/// Browser-like UI that performs the interactive part of login
#[async_trait]
pub trait LoginSurface: Send + Sync {
    async fn present(&self, request: LoginRequest) -> LoginOutcome;
}

/// Surface used when none is configured. Every login it is asked to
/// present fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLoginSurface;

#[async_trait]
impl LoginSurface for NoLoginSurface {
    async fn present(&self, _request: LoginRequest) -> LoginOutcome {
        LoginOutcome::Failed("no login surface configured".to_string())
    }
}

/// Credentials carried by a successful redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginRedirect {
    /// Inline `session` JSON object
    Session(SessionRecord),
    /// Auth token to exchange through `auth.getSession`
    AuthToken(String),
}

/// Build the request handed to the login surface
pub fn login_request(config: &ClientConfig, api_key: &str) -> Result<LoginRequest, LoginError> {
    let mut url = Url::parse(&config.login_url)
        .map_err(|e| LoginError::InvalidRedirect(format!("bad login URL: {}", e)))?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("api_key", api_key)
            .append_pair("v", API_VERSION)
            .append_pair("fbconnect", "true")
            .append_pair("return_session", "true")
            .append_pair("session_key_only", "true")
            .append_pair("next", &config.success_url)
            .append_pair("cancel_url", &config.cancel_url);
        if !config.permissions.is_empty() {
            query.append_pair("req_perms", &config.permissions.join(","));
        }
    }

    Ok(LoginRequest {
        url,
        success_prefix: config.success_url.clone(),
        cancel_prefix: config.cancel_url.clone(),
    })
}

/// Extract credentials from the redirect that ended the login flow
pub fn parse_redirect(request: &LoginRequest, redirect: &Url) -> Result<LoginRedirect, LoginError> {
    let raw = redirect.as_str();
    let param = |name: &str| {
        redirect
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    if raw.starts_with(&request.cancel_prefix) {
        return match param("error_reason") {
            Some(reason) => Err(LoginError::Denied {
                description: param("error_description").unwrap_or_else(|| reason.clone()),
                reason,
            }),
            None => Err(LoginError::Cancelled),
        };
    }

    if !raw.starts_with(&request.success_prefix) {
        return Err(LoginError::InvalidRedirect(format!(
            "unexpected redirect target: {}",
            redirect.path()
        )));
    }

    if let Some(session) = param("session") {
        let record = SessionRecord::from_wire_json(&session)
            .map_err(|e| LoginError::InvalidRedirect(format!("malformed session: {}", e)))?;
        return Ok(LoginRedirect::Session(record));
    }

    match param("auth_token") {
        Some(token) if exists(Some(&token)) => return Ok(LoginRedirect::AuthToken(token)),
        _ => {}
    }

    Err(LoginError::InvalidRedirect(
        "redirect carried neither a session nor an auth token".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> LoginRequest {
        login_request(&ClientConfig::default(), "app-key").expect("login request")
    }

    #[test]
    fn test_login_request_parameters() {
        let config = ClientConfig::default().with_permissions(["offline_access", "read_stream"]);
        let req = login_request(&config, "app-key").expect("login request");

        let pairs: Vec<(String, String)> = req
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let get = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };

        assert!(req.url.as_str().starts_with(&config.login_url));
        assert_eq!(get("api_key"), Some("app-key"));
        assert_eq!(get("v"), Some("1.0"));
        assert_eq!(get("return_session"), Some("true"));
        assert_eq!(get("next"), Some(config.success_url.as_str()));
        assert_eq!(get("cancel_url"), Some(config.cancel_url.as_str()));
        assert_eq!(get("req_perms"), Some("offline_access,read_stream"));
    }

    #[test]
    fn test_login_request_without_permissions() {
        let req = request();
        assert!(!req.url.query_pairs().any(|(k, _)| k == "req_perms"));
        assert!(req.is_terminal("https://www.facebook.com/connect/login_success.html?x=1"));
        assert!(req.is_terminal("https://www.facebook.com/connect/login_failure.html"));
        assert!(!req.is_terminal("https://www.facebook.com/login.php?api_key=x"));
    }

    #[test]
    fn test_parse_inline_session() {
        let req = request();
        let redirect = Url::parse_with_params(
            &req.success_prefix,
            &[(
                "session",
                r#"{"session_key":"k-1","uid":99,"expires":0,"secret":"sec"}"#,
            )],
        )
        .expect("redirect url");

        match parse_redirect(&req, &redirect).expect("parse redirect") {
            LoginRedirect::Session(record) => {
                assert_eq!(record.session_key, "k-1");
                assert_eq!(record.session_secret, "sec");
                assert_eq!(record.uid, "99");
                assert_eq!(record.expires, None);
            }
            other => panic!("unexpected redirect: {:?}", other),
        }
    }

    #[test]
    fn test_parse_auth_token() {
        let req = request();
        let redirect = Url::parse_with_params(&req.success_prefix, &[("auth_token", "tok")])
            .expect("redirect url");
        assert_eq!(
            parse_redirect(&req, &redirect).expect("parse redirect"),
            LoginRedirect::AuthToken("tok".to_string())
        );
    }

    #[test]
    fn test_parse_cancel_and_denied() {
        let req = request();

        let cancelled = Url::parse(&req.cancel_prefix).expect("cancel url");
        assert!(matches!(
            parse_redirect(&req, &cancelled),
            Err(LoginError::Cancelled)
        ));

        let denied = Url::parse_with_params(
            &req.cancel_prefix,
            &[
                ("error_reason", "user_denied"),
                ("error_description", "The user denied your request."),
            ],
        )
        .expect("denied url");
        match parse_redirect(&req, &denied) {
            Err(LoginError::Denied {
                reason,
                description,
            }) => {
                assert_eq!(reason, "user_denied");
                assert_eq!(description, "The user denied your request.");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_or_empty_redirects() {
        let req = request();

        let elsewhere = Url::parse("https://example.com/somewhere").expect("url");
        assert!(matches!(
            parse_redirect(&req, &elsewhere),
            Err(LoginError::InvalidRedirect(_))
        ));

        let bare = Url::parse(&req.success_prefix).expect("url");
        assert!(matches!(
            parse_redirect(&req, &bare),
            Err(LoginError::InvalidRedirect(_))
        ));

        let empty_token =
            Url::parse_with_params(&req.success_prefix, &[("auth_token", "")]).expect("url");
        assert!(matches!(
            parse_redirect(&req, &empty_token),
            Err(LoginError::InvalidRedirect(_))
        ));

        let garbled =
            Url::parse_with_params(&req.success_prefix, &[("session", "{not json")]).expect("url");
        assert!(matches!(
            parse_redirect(&req, &garbled),
            Err(LoginError::InvalidRedirect(_))
        ));
    }
}
