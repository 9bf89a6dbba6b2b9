//! Session state and the login/logout/query lifecycle.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::login::{login_request, parse_redirect};
use crate::auth::{
    FileStore, LoginOutcome, LoginRedirect, LoginSurface, MemoryStore, NoLoginSurface,
    SessionRecord, SessionStore,
};
use crate::config::ClientConfig;
use crate::models::{Credentials, MultiqueryResult};

use super::state::RequestGate;
use super::{
    LoginError, LogoutError, NoDelegate, OperationKind, RequestInFlight, RequestState,
    SessionDelegate,
};

/// Mutable identity of a session
#[derive(Debug, Default)]
struct SessionState {
    credentials: Credentials,
    using_saved_session: bool,
    storage_key: Option<String>,
}

struct Inner {
    api: ApiClient,
    config: ClientConfig,
    state: Mutex<SessionState>,
    gate: Arc<RequestGate>,
    store: Arc<dyn SessionStore>,
    surface: Arc<dyn LoginSurface>,
    delegate: Arc<dyn SessionDelegate>,
}

/// A session with the Facebook platform.
///
/// Clone is cheap and clones share state: a clone handed to a spawned task
/// sees the credentials applied by the operation it runs.
///
/// The operation methods spawn onto the current Tokio runtime and panic if
/// called outside one, like `tokio::spawn`.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("api", &self.inner.api)
            .field("uid", &self.uid())
            .field("has_session_key", &self.has_session_key())
            .field("request_state", &self.request_state())
            .finish_non_exhaustive()
    }
}

pub struct SessionBuilder {
    api_key: String,
    app_secret: String,
    config: ClientConfig,
    delegate: Arc<dyn SessionDelegate>,
    surface: Arc<dyn LoginSurface>,
    store: Option<Arc<dyn SessionStore>>,
    storage_key: Option<String>,
}

impl SessionBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn delegate<D: SessionDelegate + 'static>(mut self, delegate: D) -> Self {
        self.delegate = Arc::new(delegate);
        self
    }

    pub fn login_surface(mut self, surface: Arc<dyn LoginSurface>) -> Self {
        self.surface = surface;
        self
    }

    /// Backend for persisted sessions. Defaults to a `FileStore` in the
    /// platform data directory.
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }

    /// Build the session. No network I/O happens here.
    pub fn build(self) -> Result<Session, ApiError> {
        let api = ApiClient::new(&self.config, &self.api_key, &self.app_secret)?;

        let store: Arc<dyn SessionStore> = match self.store {
            Some(store) => store,
            None => match FileStore::default_location() {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    warn!(error = %e, "No data directory, persisted sessions kept in memory");
                    Arc::new(MemoryStore::new())
                }
            },
        };

        Ok(Session {
            inner: Arc::new(Inner {
                api,
                config: self.config,
                state: Mutex::new(SessionState {
                    storage_key: self.storage_key,
                    ..SessionState::default()
                }),
                gate: Arc::new(RequestGate::default()),
                store,
                surface: self.surface,
                delegate: self.delegate,
            }),
        })
    }
}

impl Session {
    pub fn builder(api_key: impl Into<String>, app_secret: impl Into<String>) -> SessionBuilder {
        SessionBuilder {
            api_key: api_key.into(),
            app_secret: app_secret.into(),
            config: ClientConfig::default(),
            delegate: Arc::new(NoDelegate),
            surface: Arc::new(NoLoginSurface),
            store: None,
            storage_key: None,
        }
    }

    /// Create a session with default endpoints. Call `start_login` before
    /// anything that needs a session key.
    pub fn new<D: SessionDelegate + 'static>(
        api_key: impl Into<String>,
        app_secret: impl Into<String>,
        delegate: D,
    ) -> Result<Self, ApiError> {
        Self::builder(api_key, app_secret).delegate(delegate).build()
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ===== Accessors =====

    /// Whether a session key is held. It may still have expired server-side.
    pub fn has_session_key(&self) -> bool {
        self.state().credentials.has_session_key()
    }

    /// Uid of the last user that logged in during this process, if any.
    /// Survives logout and session key invalidation.
    pub fn uid(&self) -> Option<String> {
        self.state().credentials.uid.clone()
    }

    /// Whether the current credentials came from the session store
    pub fn using_saved_session(&self) -> bool {
        self.state().using_saved_session
    }

    /// Snapshot of the credentials currently held
    pub fn credentials(&self) -> Credentials {
        self.state().credentials.clone()
    }

    pub fn api_key(&self) -> &str {
        self.inner.api.api_key()
    }

    pub fn request_state(&self) -> RequestState {
        self.inner.gate.current()
    }

    pub fn is_busy(&self) -> bool {
        self.request_state() != RequestState::Idle
    }

    // ===== Persistence =====

    /// Enable persisted sessions: `start_login` checks `key` first and a
    /// successful interactive login is saved under it.
    pub fn set_persistent_storage_key(&self, key: impl Into<String>) {
        self.state().storage_key = Some(key.into());
    }

    pub fn persistent_storage_key(&self) -> Option<String> {
        self.state().storage_key.clone()
    }

    /// Remove the record under the configured key. No-op without a key.
    pub fn clear_stored_session(&self) -> Result<()> {
        match self.persistent_storage_key() {
            Some(key) => {
                debug!(key = %key, "Clearing stored session");
                self.inner.store.remove(&key)
            }
            None => Ok(()),
        }
    }

    /// Usable record under the configured key. Expired records are
    /// removed and treated as absent.
    fn load_stored_session(&self) -> Option<SessionRecord> {
        let key = self.persistent_storage_key()?;
        match self.inner.store.load(&key) {
            Ok(Some(record)) if record.is_expired() => {
                debug!(key = %key, uid = %record.uid, "Ignoring expired stored session");
                if let Err(e) = self.inner.store.remove(&key) {
                    warn!(key = %key, error = %e, "Failed to remove expired stored session");
                }
                None
            }
            Ok(record) => record,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read stored session");
                None
            }
        }
    }

    fn save_stored_session(&self, record: &SessionRecord) {
        if let Some(key) = self.persistent_storage_key() {
            if let Err(e) = self.inner.store.save(&key, record) {
                warn!(key = %key, error = %e, "Failed to save session");
            }
        }
    }

    // ===== Login / logout =====

    /// Start logging in. Returns immediately; the delegate receives
    /// `login_completed` or `login_failed`.
    ///
    /// A usable stored session is adopted without any network traffic.
    /// Otherwise the login surface is shown.
    pub fn start_login(&self) -> Result<(), RequestInFlight> {
        let in_flight = self.inner.gate.begin(OperationKind::Login)?;
        let session = self.clone();

        tokio::spawn(async move {
            let result = session.run_login().await;
            drop(in_flight);

            match result {
                Ok(()) => session.inner.delegate.login_completed(&session),
                Err(e) => {
                    warn!(error = %e, "Login failed");
                    session.inner.delegate.login_failed(&session, e);
                }
            }
        });

        Ok(())
    }

    async fn run_login(&self) -> Result<(), LoginError> {
        if let Some(record) = self.load_stored_session() {
            info!(uid = %record.uid, "Using stored session");
            let mut state = self.state();
            state.credentials.adopt(&record);
            state.using_saved_session = true;
            return Ok(());
        }

        let request = login_request(&self.inner.config, self.api_key())?;
        debug!(url = %request.url, "Presenting login page");

        let redirect = match self.inner.surface.present(request.clone()).await {
            LoginOutcome::Redirected(url) => url,
            LoginOutcome::Cancelled => return Err(LoginError::Cancelled),
            LoginOutcome::Failed(reason) => return Err(LoginError::Surface(reason)),
        };

        let (record, auth_token) = match parse_redirect(&request, &redirect)? {
            LoginRedirect::Session(record) => (record, None),
            LoginRedirect::AuthToken(token) => {
                let record = self.inner.api.get_session(&token).await?;
                (record, Some(token))
            }
        };

        let saved = {
            let mut state = self.state();
            state.credentials.adopt(&record);
            state.credentials.auth_token = auth_token;
            state.using_saved_session = false;
            state.credentials.to_record()
        };
        if let Some(saved) = saved {
            self.save_stored_session(&saved);
        }

        info!(uid = %record.uid, "Login completed");
        Ok(())
    }

    /// Log out. Returns immediately; the delegate receives
    /// `logout_completed` or `logout_failed`.
    ///
    /// In-memory credentials and the stored record are cleared even when
    /// expiring the session on the server fails.
    pub fn logout(&self) -> Result<(), RequestInFlight> {
        let in_flight = self.inner.gate.begin(OperationKind::Logout)?;
        let session = self.clone();

        tokio::spawn(async move {
            let result = session.run_logout().await;
            drop(in_flight);

            match result {
                Ok(()) => session.inner.delegate.logout_completed(&session),
                Err(e) => {
                    warn!(error = %e, "Logout failed");
                    session.inner.delegate.logout_failed(&session, e);
                }
            }
        });

        Ok(())
    }

    async fn run_logout(&self) -> Result<(), LogoutError> {
        let credentials = {
            let mut state = self.state();
            let snapshot = state.credentials.clone();
            state.credentials.clear_session();
            state.using_saved_session = false;
            snapshot
        };

        let remote = if credentials.has_session_key() {
            match self.inner.api.expire_session(&credentials).await {
                Ok(expired) => {
                    debug!(expired, "Session expired on server");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        } else {
            Ok(())
        };

        self.clear_stored_session()
            .map_err(|e| LogoutError::Store(format!("{:#}", e)))?;

        remote.map_err(LogoutError::from)?;
        info!("Logged out");
        Ok(())
    }

    // ===== Queries =====

    /// Run `request` as the session's in-flight query and hand its result
    /// to `completion` once the session is idle again.
    fn dispatch<T, Fut, R, F>(&self, request: R, completion: F) -> Result<(), RequestInFlight>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        R: FnOnce(ApiClient, Credentials) -> Fut,
        F: FnOnce(Result<T, ApiError>) + Send + 'static,
    {
        let in_flight = self.inner.gate.begin(OperationKind::Query)?;
        let session = self.clone();
        let pending = request(self.inner.api.clone(), self.credentials());

        tokio::spawn(async move {
            let result = pending.await;
            if let Err(ref e) = result {
                session.handle_query_error(e);
            }
            drop(in_flight);
            completion(result);
        });

        Ok(())
    }

    /// Forget credentials the platform has rejected. `uid` is kept.
    fn handle_query_error(&self, error: &ApiError) {
        if !error.is_session_invalid() {
            return;
        }

        warn!(code = ?error.code(), "Session key rejected, clearing it");
        {
            let mut state = self.state();
            state.credentials.clear_session();
            state.using_saved_session = false;
        }
        if let Err(e) = self.clear_stored_session() {
            warn!(error = %e, "Failed to clear rejected stored session");
        }
    }

    /// Call an arbitrary API method. `completion` receives the parsed
    /// response body or the error, with platform codes preserved.
    pub fn call_method<F>(
        &self,
        name: &str,
        arguments: BTreeMap<String, String>,
        completion: F,
    ) -> Result<(), RequestInFlight>
    where
        F: FnOnce(Result<Value, ApiError>) + Send + 'static,
    {
        let name = name.to_string();
        self.dispatch(
            move |api, credentials| async move {
                api.call_method(&name, &arguments, &credentials).await
            },
            completion,
        )
    }

    /// Run a single FQL statement
    pub fn send_fql_query<F>(&self, query: &str, completion: F) -> Result<(), RequestInFlight>
    where
        F: FnOnce(Result<Value, ApiError>) + Send + 'static,
    {
        let query = query.to_string();
        self.dispatch(
            move |api, credentials| async move { api.fql_query(&query, &credentials).await },
            completion,
        )
    }

    /// Run several named FQL statements in one call. `completion` receives
    /// one result per name, or a single error for the whole batch.
    pub fn send_fql_multiquery<F>(
        &self,
        queries: BTreeMap<String, String>,
        completion: F,
    ) -> Result<(), RequestInFlight>
    where
        F: FnOnce(Result<MultiqueryResult, ApiError>) + Send + 'static,
    {
        self.dispatch(
            move |api, credentials| async move { api.fql_multiquery(&queries, &credentials).await },
            completion,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
