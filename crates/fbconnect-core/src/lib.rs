//! fbconnect-core - client-side session management for the Facebook REST API.
//!
//! This crate provides:
//! - `Session`: login (interactive or from a persisted record), logout, and
//!   dispatch of REST method calls, FQL queries and FQL multiqueries
//! - `ApiClient`: signed calls against `restserver.php`
//! - `SessionStore` implementations for persisting credentials between runs
//! - `LoginSurface`: the seam to a browser-like UI that performs the login

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod session;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{
    FileStore, KeyringStore, LoginOutcome, LoginRequest, LoginSurface, MemoryStore,
    NoLoginSurface, SessionRecord, SessionStore,
};
pub use config::ClientConfig;
pub use models::{Credentials, MultiqueryResult};
pub use session::{
    LoginError, LogoutError, NoDelegate, OperationKind, RequestInFlight, RequestState, Session,
    SessionBuilder, SessionDelegate, SessionEvent,
};
pub use url::Url;
