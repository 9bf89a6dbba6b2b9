//! The session manager.
//!
//! A `Session` owns the application and session credentials, performs login
//! (from a persisted record or through a `LoginSurface`), and dispatches
//! REST calls and FQL queries. Every network operation is spawned onto the
//! Tokio runtime and reports back asynchronously. Only one may be in flight
//! per session; a second is rejected synchronously with `RequestInFlight`.

pub mod delegate;
pub mod error;
pub mod manager;
pub mod state;

pub use delegate::{NoDelegate, SessionDelegate, SessionEvent};
pub use error::{LoginError, LogoutError, RequestInFlight};
pub use manager::{Session, SessionBuilder};
pub use state::{OperationKind, RequestState};
