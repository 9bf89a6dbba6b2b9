use tokio::sync::mpsc;
use tracing::error;

use super::{LoginError, LogoutError, Session};

/// Receives the outcome of `Session::start_login` and `Session::logout`.
/// All methods are optional.
///
/// Methods are called from the Tokio task that ran the operation, after the
/// session has returned to idle, so a handler may start the next operation.
pub trait SessionDelegate: Send + Sync {
    /// The session now holds a session key and `uid()` is set
    fn login_completed(&self, _session: &Session) {}

    fn login_failed(&self, _session: &Session, _error: LoginError) {}

    fn logout_completed(&self, _session: &Session) {}

    fn logout_failed(&self, _session: &Session, _error: LogoutError) {}
}

/// Delegate that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelegate;

impl SessionDelegate for NoDelegate {}

/// Session events, for hosts that prefer a channel over callbacks
#[derive(Debug)]
pub enum SessionEvent {
    LoginCompleted {
        uid: Option<String>,
        from_saved_session: bool,
    },
    LoginFailed(LoginError),
    LogoutCompleted,
    LogoutFailed(LogoutError),
}

/// Helper to forward an event, logging if the receiver is gone
fn forward(tx: &mpsc::UnboundedSender<SessionEvent>, event: SessionEvent) {
    if let Err(e) = tx.send(event) {
        error!(event = ?e.0, "Failed to deliver session event - channel closed");
    }
}

impl SessionDelegate for mpsc::UnboundedSender<SessionEvent> {
    fn login_completed(&self, session: &Session) {
        forward(
            self,
            SessionEvent::LoginCompleted {
                uid: session.uid(),
                from_saved_session: session.using_saved_session(),
            },
        );
    }

    fn login_failed(&self, _session: &Session, error: LoginError) {
        forward(self, SessionEvent::LoginFailed(error));
    }

    fn logout_completed(&self, _session: &Session) {
        forward(self, SessionEvent::LogoutCompleted);
    }

    fn logout_failed(&self, _session: &Session, error: LogoutError) {
        forward(self, SessionEvent::LogoutFailed(error));
    }
}
