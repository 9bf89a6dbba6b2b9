//! REST API client module for the Facebook platform.
//!
//! This module provides the `ApiClient` for signed calls against
//! `restserver.php`: arbitrary methods, FQL queries and FQL multiqueries,
//! plus the `auth.*` methods used by login and logout.
//!
//! Calls are signed with an MD5 digest over the sorted parameters and
//! either the session secret or the application secret.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
