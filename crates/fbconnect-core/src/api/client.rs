//! API client for the Facebook REST server.
//!
//! Every call is a form-encoded POST to `restserver.php` carrying the method
//! name, the application key, a call id, the session key when one is held,
//! and an MD5 signature over all of them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::{header, Client};
use serde_json::Value;
use tracing::debug;

use crate::auth::login::API_VERSION;
use crate::auth::SessionRecord;
use crate::config::ClientConfig;
use crate::models::{Credentials, MultiqueryEntry, MultiqueryResult};
use crate::utils::{hex_md5, url_encode_arguments};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Response format requested from the REST server
const RESPONSE_FORMAT: &str = "JSON";

/// Parameters the client sets itself; callers may not pass these
const RESERVED_PARAMS: &[&str] = &[
    "method",
    "api_key",
    "v",
    "format",
    "call_id",
    "session_key",
    "ss",
    "sig",
];

/// API client for the Facebook REST server.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    rest_url: String,
    api_key: String,
    app_secret: String,
    call_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("rest_url", &self.rest_url)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: &ClientConfig, api_key: &str, app_secret: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let seed = u64::try_from(Utc::now().timestamp_micros()).unwrap_or_default();

        Ok(Self {
            client,
            rest_url: config.rest_url.clone(),
            api_key: api_key.to_string(),
            app_secret: app_secret.to_string(),
            call_id: Arc::new(AtomicU64::new(seed)),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Call ids must strictly increase within a session
    fn next_call_id(&self) -> u64 {
        self.call_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Build the full, signed parameter set for a call.
    ///
    /// With a session key held the call is signed with the session secret
    /// and flagged `ss=1`; otherwise the application secret signs it.
    fn signed_params(
        &self,
        method: &str,
        arguments: &BTreeMap<String, String>,
        credentials: &Credentials,
        call_id: u64,
    ) -> Result<BTreeMap<String, String>, ApiError> {
        if let Some(reserved) = arguments
            .keys()
            .find(|k| RESERVED_PARAMS.contains(&k.as_str()))
        {
            return Err(ApiError::InvalidRequest(format!(
                "argument '{}' is set by the client",
                reserved
            )));
        }

        let mut params = arguments.clone();
        params.insert("method".to_string(), method.to_string());
        params.insert("api_key".to_string(), self.api_key.clone());
        params.insert("v".to_string(), API_VERSION.to_string());
        params.insert("format".to_string(), RESPONSE_FORMAT.to_string());
        params.insert("call_id".to_string(), call_id.to_string());

        let secret = match (&credentials.session_key, &credentials.session_secret) {
            (Some(key), Some(secret)) => {
                params.insert("session_key".to_string(), key.clone());
                params.insert("ss".to_string(), "1".to_string());
                secret.as_str()
            }
            _ => self.app_secret.as_str(),
        };

        let mut base: String = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        base.push_str(secret);
        params.insert("sig".to_string(), hex_md5(&base));

        Ok(params)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Parse a response body, turning an embedded platform error into `ApiError::Platform`
    fn parse_body(body: &str) -> Result<Value, ApiError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| ApiError::InvalidResponse(format!("malformed JSON: {}", e)))?;

        if let Some(code) = value.get("error_code") {
            let code = code
                .as_i64()
                .or_else(|| code.as_str().and_then(|s| s.parse().ok()))
                .ok_or_else(|| ApiError::InvalidResponse(format!("bad error_code: {}", code)))?;
            let message = value
                .get("error_msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(ApiError::Platform { code, message });
        }

        Ok(value)
    }

    /// Call an API method and return the parsed response body
    pub async fn call_method(
        &self,
        method: &str,
        arguments: &BTreeMap<String, String>,
        credentials: &Credentials,
    ) -> Result<Value, ApiError> {
        let params = self.signed_params(method, arguments, credentials, self.next_call_id())?;
        debug!(method, args = arguments.len(), "Calling API method");

        let response = self
            .client
            .post(&self.rest_url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::ACCEPT, "application/json")
            .body(url_encode_arguments(&params))
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        Self::parse_body(&text)
    }

    // ===== FQL =====

    /// Run a single FQL statement
    pub async fn fql_query(&self, query: &str, credentials: &Credentials) -> Result<Value, ApiError> {
        let mut args = BTreeMap::new();
        args.insert("query".to_string(), query.to_string());
        self.call_method("fql.query", &args, credentials).await
    }

    /// Run several named FQL statements in one call.
    /// The batch fails as a whole if the platform reports an error.
    pub async fn fql_multiquery(
        &self,
        queries: &BTreeMap<String, String>,
        credentials: &Credentials,
    ) -> Result<MultiqueryResult, ApiError> {
        let encoded = serde_json::to_string(queries)
            .map_err(|e| ApiError::InvalidRequest(format!("cannot encode queries: {}", e)))?;
        let mut args = BTreeMap::new();
        args.insert("queries".to_string(), encoded);

        let value = self.call_method("fql.multiquery", &args, credentials).await?;
        let entries: Vec<MultiqueryEntry> = serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("unexpected multiquery result: {}", e)))?;

        Ok(entries
            .into_iter()
            .map(|entry| (entry.name, entry.fql_result_set))
            .collect())
    }

    // ===== Auth =====

    /// Exchange an auth token from the login redirect for a session
    pub async fn get_session(&self, auth_token: &str) -> Result<SessionRecord, ApiError> {
        let mut args = BTreeMap::new();
        args.insert("auth_token".to_string(), auth_token.to_string());

        let value = self
            .call_method("auth.getSession", &args, &Credentials::default())
            .await?;
        SessionRecord::from_wire_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("unexpected session: {}", e)))
    }

    /// Invalidate the session key on the server. Returns the server's verdict.
    pub async fn expire_session(&self, credentials: &Credentials) -> Result<bool, ApiError> {
        let value = self
            .call_method("auth.expireSession", &BTreeMap::new(), credentials)
            .await?;
        Ok(match value {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_i64() == Some(1),
            Value::String(s) => s == "1" || s == "true",
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ClientConfig {
        ClientConfig::default().with_rest_url(format!("{}/restserver.php", server.uri()))
    }

    fn session_credentials() -> Credentials {
        Credentials {
            session_key: Some("sess-key".to_string()),
            session_secret: Some("sess-secret".to_string()),
            uid: Some("1234".to_string()),
            ..Credentials::default()
        }
    }

    #[test]
    fn test_signed_params_with_app_secret() {
        let api = ApiClient::new(&ClientConfig::default(), "app-key", "app-secret")
            .expect("client");
        let mut args = BTreeMap::new();
        args.insert("uids".to_string(), "1,2".to_string());

        let params = api
            .signed_params("users.getInfo", &args, &Credentials::default(), 7)
            .expect("params");

        assert_eq!(params.get("method").map(String::as_str), Some("users.getInfo"));
        assert_eq!(params.get("api_key").map(String::as_str), Some("app-key"));
        assert_eq!(params.get("call_id").map(String::as_str), Some("7"));
        assert!(!params.contains_key("session_key"));
        assert!(!params.contains_key("ss"));

        let expected = hex_md5(
            "api_key=app-keycall_id=7format=JSONmethod=users.getInfouids=1,2v=1.0app-secret",
        );
        assert_eq!(params.get("sig"), Some(&expected));
    }

    #[test]
    fn test_signed_params_with_session_secret() {
        let api = ApiClient::new(&ClientConfig::default(), "app-key", "app-secret")
            .expect("client");
        let params = api
            .signed_params("fql.query", &BTreeMap::new(), &session_credentials(), 1)
            .expect("params");

        assert_eq!(params.get("session_key").map(String::as_str), Some("sess-key"));
        assert_eq!(params.get("ss").map(String::as_str), Some("1"));

        let expected = hex_md5(
            "api_key=app-keycall_id=1format=JSONmethod=fql.querysession_key=sess-keyss=1v=1.0sess-secret",
        );
        assert_eq!(params.get("sig"), Some(&expected));
    }

    #[test]
    fn test_signed_params_rejects_reserved_arguments() {
        let api = ApiClient::new(&ClientConfig::default(), "k", "s").expect("client");
        let mut args = BTreeMap::new();
        args.insert("sig".to_string(), "forged".to_string());
        assert!(matches!(
            api.signed_params("fql.query", &args, &Credentials::default(), 1),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_call_ids_increase() {
        let api = ApiClient::new(&ClientConfig::default(), "k", "s").expect("client");
        let first = api.next_call_id();
        let second = api.clone().next_call_id();
        assert!(second > first);
    }

    #[test]
    fn test_parse_body_platform_error() {
        let err = ApiClient::parse_body(
            r#"{"error_code":190,"error_msg":"Invalid OAuth 2.0 Access Token","request_args":[]}"#,
        )
        .expect_err("platform error");
        assert_eq!(err.code(), Some(190));
        assert_eq!(err.message(), "Invalid OAuth 2.0 Access Token");

        let err = ApiClient::parse_body(r#"{"error_code":"102","error_msg":"Session key invalid"}"#)
            .expect_err("string error code");
        assert_eq!(err.code(), Some(102));
    }

    #[test]
    fn test_parse_body_malformed() {
        assert!(matches!(
            ApiClient::parse_body("<html>oops</html>"),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_fql_query_returns_result_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/restserver.php"))
            .and(body_string_contains("method=fql.query"))
            .and(body_string_contains("session_key=sess-key"))
            .and(body_string_contains("query=SELECT+name+FROM+user+WHERE+uid%3D1234"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "Owen"}])))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&config_for(&server), "app-key", "app-secret").expect("client");
        let result = api
            .fql_query("SELECT name FROM user WHERE uid=1234", &session_credentials())
            .await
            .expect("query result");

        assert_eq!(result, json!([{"name": "Owen"}]));
    }

    #[tokio::test]
    async fn test_call_method_platform_error_is_preserved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/restserver.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error_code": 190,
                "error_msg": "Invalid OAuth 2.0 Access Token",
                "request_args": []
            })))
            .mount(&server)
            .await;

        let api = ApiClient::new(&config_for(&server), "app-key", "app-secret").expect("client");
        let err = api
            .call_method("users.getLoggedInUser", &BTreeMap::new(), &session_credentials())
            .await
            .expect_err("platform error");

        match err {
            ApiError::Platform { code, message } => {
                assert_eq!(code, 190);
                assert_eq!(message, "Invalid OAuth 2.0 Access Token");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_failure_maps_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let api = ApiClient::new(&config_for(&server), "k", "s").expect("client");
        let err = api
            .fql_query("SELECT uid FROM user", &session_credentials())
            .await
            .expect_err("server error");
        assert!(matches!(err, ApiError::ServerError(ref body) if body == "maintenance"));
    }

    #[tokio::test]
    async fn test_fql_multiquery_keys_results_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/restserver.php"))
            .and(body_string_contains("method=fql.multiquery"))
            .and(body_string_contains("queries="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "a", "fql_result_set": [{"uid": 1}]},
                {"name": "b", "fql_result_set": []}
            ])))
            .mount(&server)
            .await;

        let api = ApiClient::new(&config_for(&server), "k", "s").expect("client");
        let mut queries = BTreeMap::new();
        queries.insert("a".to_string(), "SELECT uid FROM user WHERE uid=1".to_string());
        queries.insert("b".to_string(), "SELECT uid FROM user WHERE uid=2".to_string());

        let result = api
            .fql_multiquery(&queries, &session_credentials())
            .await
            .expect("multiquery result");

        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(result["a"], json!([{"uid": 1}]));
        assert_eq!(result["b"], json!([]));
    }

    #[tokio::test]
    async fn test_get_session_exchanges_auth_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("method=auth.getSession"))
            .and(body_string_contains("auth_token=tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "session_key": "k-2",
                "uid": 777,
                "expires": 0,
                "secret": "sec-2"
            })))
            .mount(&server)
            .await;

        let api = ApiClient::new(&config_for(&server), "k", "s").expect("client");
        let record = api.get_session("tok-1").await.expect("session");
        assert_eq!(record.session_key, "k-2");
        assert_eq!(record.session_secret, "sec-2");
        assert_eq!(record.uid, "777");
        assert_eq!(record.expires, None);
    }

    #[tokio::test]
    async fn test_expire_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("method=auth.expireSession"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
            .mount(&server)
            .await;

        let api = ApiClient::new(&config_for(&server), "k", "s").expect("client");
        assert!(api
            .expire_session(&session_credentials())
            .await
            .expect("expire"));
    }
}
