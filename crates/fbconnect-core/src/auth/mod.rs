//! Authentication module for login and persisted sessions.
//!
//! This module provides:
//! - `SessionRecord`: persisted session credentials with optional expiry
//! - `SessionStore`: the host key-value store seam, with `MemoryStore`,
//!   `FileStore` and the OS keychain-backed `KeyringStore`
//! - `LoginSurface`: the browser-like UI that performs interactive login,
//!   plus login URL construction and redirect parsing

pub mod credentials;
pub mod login;
pub mod record;
pub mod store;

pub use credentials::KeyringStore;
pub use login::{LoginOutcome, LoginRedirect, LoginRequest, LoginSurface, NoLoginSurface};
pub use record::SessionRecord;
pub use store::{FileStore, MemoryStore, SessionStore};
