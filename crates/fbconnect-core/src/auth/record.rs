use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Persisted session credentials.
///
/// `expires` of `None` means the session does not expire (an
/// `offline_access` session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_key: String,
    pub session_secret: String,
    pub uid: String,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub expires: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn is_expired(&self) -> bool {
        self.expires.map(|at| Utc::now() >= at).unwrap_or(false)
    }

    /// Parse the `session` JSON object the login page hands back in its
    /// redirect, or the body of an `auth.getSession` response.
    pub fn from_wire_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<WireSession>(json).map(Into::into)
    }

    pub fn from_wire_value(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value::<WireSession>(value).map(Into::into)
    }
}

/// Session as serialized by the platform: `uid` may be a number and
/// `expires` is a unix timestamp with 0 meaning "never".
#[derive(Debug, Deserialize)]
struct WireSession {
    session_key: String,
    secret: String,
    #[serde(deserialize_with = "string_or_number")]
    uid: String,
    #[serde(default)]
    expires: i64,
}

impl From<WireSession> for SessionRecord {
    fn from(wire: WireSession) -> Self {
        let expires = if wire.expires > 0 {
            Utc.timestamp_opt(wire.expires, 0).single()
        } else {
            None
        };
        Self {
            session_key: wire.session_key,
            session_secret: wire.secret,
            uid: wire.uid,
            expires,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Uid {
        Text(String),
        Number(i64),
    }

    Ok(match Uid::deserialize(deserializer)? {
        Uid::Text(s) => s,
        Uid::Number(n) => n.to_string(),
    })
}
