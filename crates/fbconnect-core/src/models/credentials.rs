use chrono::{DateTime, Utc};

use crate::auth::SessionRecord;

/// Session-level identity held in memory by a `Session`.
///
/// `uid` is deliberately not cleared by `clear_session`: it records the last
/// user that logged in, even once the key itself is gone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub session_key: Option<String>,
    pub session_secret: Option<String>,
    pub auth_token: Option<String>,
    pub uid: Option<String>,
    pub expires: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn has_session_key(&self) -> bool {
        self.session_key.is_some()
    }

    /// Replace the session-level fields with those of a record
    pub fn adopt(&mut self, record: &SessionRecord) {
        self.session_key = Some(record.session_key.clone());
        self.session_secret = Some(record.session_secret.clone());
        self.uid = Some(record.uid.clone());
        self.expires = record.expires;
    }

    /// Drop the session key, secret and auth token
    pub fn clear_session(&mut self) {
        self.session_key = None;
        self.session_secret = None;
        self.auth_token = None;
        self.expires = None;
    }

    /// Snapshot as a persistable record, if a full session is held
    pub fn to_record(&self) -> Option<SessionRecord> {
        Some(SessionRecord {
            session_key: self.session_key.clone()?,
            session_secret: self.session_secret.clone()?,
            uid: self.uid.clone()?,
            expires: self.expires,
        })
    }
}
