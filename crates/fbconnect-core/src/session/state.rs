use std::fmt;
use std::sync::{Arc, Mutex};

use super::RequestInFlight;

/// Kind of network operation a session can have in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Login,
    Logout,
    Query,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Login => "login",
            OperationKind::Logout => "logout",
            OperationKind::Query => "query",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Pending(OperationKind),
}

/// Single-slot gate admitting one operation at a time
#[derive(Debug, Default)]
pub(crate) struct RequestGate {
    state: Mutex<RequestState>,
}

impl RequestGate {
    pub(crate) fn current(&self) -> RequestState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move from `Idle` to `Pending(kind)`, or report what is already pending
    pub(crate) fn begin(self: &Arc<Self>, kind: OperationKind) -> Result<InFlight, RequestInFlight> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match *state {
            RequestState::Pending(pending) => Err(RequestInFlight(pending)),
            RequestState::Idle => {
                *state = RequestState::Pending(kind);
                Ok(InFlight {
                    gate: Arc::clone(self),
                })
            }
        }
    }

    fn finish(&self) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = RequestState::Idle;
    }
}

/// Held for the lifetime of an operation. Dropping it returns the gate to `Idle`.
#[derive(Debug)]
pub(crate) struct InFlight {
    gate: Arc<RequestGate>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.gate.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_admits_one_operation() {
        let gate = Arc::new(RequestGate::default());
        assert_eq!(gate.current(), RequestState::Idle);

        let held = gate.begin(OperationKind::Login).expect("first begin");
        assert_eq!(gate.current(), RequestState::Pending(OperationKind::Login));

        let rejected = gate.begin(OperationKind::Query).expect_err("second begin");
        assert_eq!(rejected, RequestInFlight(OperationKind::Login));
        assert_eq!(gate.current(), RequestState::Pending(OperationKind::Login));

        drop(held);
        assert_eq!(gate.current(), RequestState::Idle);
        assert!(gate.begin(OperationKind::Query).is_ok());
    }

    #[test]
    fn test_operation_kind_display() {
        assert_eq!(OperationKind::Login.to_string(), "login");
        assert_eq!(
            RequestInFlight(OperationKind::Query).to_string(),
            "a query request is already in flight"
        );
    }
}
