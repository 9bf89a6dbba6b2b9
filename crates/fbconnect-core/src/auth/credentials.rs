use anyhow::{Context, Result};
use keyring::Entry;

use super::{SessionRecord, SessionStore};

const SERVICE_NAME: &str = "fbconnect";

/// Session store backed by the OS keychain.
/// Each storage key maps to one keychain entry holding the record as JSON.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(SERVICE_NAME)
    }
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

impl SessionStore for KeyringStore {
    fn load(&self, key: &str) -> Result<Option<SessionRecord>> {
        let entry = self.entry(key)?;
        match entry.get_password() {
            Ok(json) => {
                let record = serde_json::from_str(&json)
                    .context("Failed to parse session stored in keychain")?;
                Ok(Some(record))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve session from keychain"),
        }
    }

    fn save(&self, key: &str, record: &SessionRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        self.entry(key)?
            .set_password(&json)
            .context("Failed to store session in keychain")?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}
