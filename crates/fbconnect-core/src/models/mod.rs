//! Data models shared by the API client and the session manager.
//!
//! - `Credentials`: the identity a `Session` currently holds
//! - `MultiqueryResult`: name-keyed results of an FQL multiquery

pub mod credentials;
pub mod fql;

pub use credentials::Credentials;
pub use fql::{MultiqueryEntry, MultiqueryResult};
