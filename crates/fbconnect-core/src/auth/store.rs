use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};

use super::SessionRecord;

/// Application name used for the default data directory
const APP_NAME: &str = "fbconnect";

/// Sub-directory holding one file per persisted session
const SESSIONS_DIR: &str = "sessions";

/// Host key-value store holding persisted sessions, one record per key.
pub trait SessionStore: Send + Sync {
    /// Read the record stored under `key`, if any
    fn load(&self, key: &str) -> Result<Option<SessionRecord>>;

    /// Store `record` under `key`, replacing any previous value
    fn save(&self, key: &str, record: &SessionRecord) -> Result<()>;

    /// Remove the record under `key`. Removing a missing record is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store, used for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a single record
    pub fn with_record(key: &str, record: SessionRecord) -> Self {
        let store = Self::new();
        store
            .records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), record);
        store
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<SessionRecord>> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(key).cloned())
    }

    fn save(&self, key: &str, record: &SessionRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(key.to_string(), record.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.remove(key);
        Ok(())
    }
}

/// Stores each record as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Store under the platform data directory, e.g.
    /// `~/.local/share/fbconnect/sessions`
    pub fn default_location() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(Self::new(data_dir.join(APP_NAME).join(SESSIONS_DIR)))
    }

    fn record_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            bail!("Invalid session storage key: {:?}", key);
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl SessionStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<SessionRecord>> {
        let path = self.record_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;
        let record = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session file: {}", path.display()))?;
        Ok(Some(record))
    }

    fn save(&self, key: &str, record: &SessionRecord) -> Result<()> {
        let path = self.record_path(key)?;
        std::fs::create_dir_all(&self.dir).context("Failed to create session directory")?;
        let contents = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write session file: {}", path.display()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.record_path(key)?;
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove session file: {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record() -> SessionRecord {
        SessionRecord {
            session_key: "key".to_string(),
            session_secret: "secret".to_string(),
            uid: "1234".to_string(),
            expires: Some(Utc::now() + Duration::days(1)),
        }
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.load("main").expect("load").is_none());

        store.save("main", &record()).expect("save");
        assert!(store.contains("main"));
        assert_eq!(
            store.load("main").expect("load").map(|r| r.uid),
            Some("1234".to_string())
        );

        store.remove("main").expect("remove");
        store.remove("main").expect("second remove is a no-op");
        assert!(!store.contains("main"));
    }

    #[test]
    fn test_file_store_roundtrip_and_remove() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(tmp.path().join("sessions"));

        assert!(store.load("main").expect("load missing").is_none());

        let saved = record();
        store.save("main", &saved).expect("save");
        assert!(tmp.path().join("sessions").join("main.json").exists());

        let loaded = store.load("main").expect("load").expect("record present");
        assert_eq!(loaded.session_key, saved.session_key);
        assert_eq!(loaded.uid, saved.uid);
        assert_eq!(
            loaded.expires.map(|e| e.timestamp()),
            saved.expires.map(|e| e.timestamp())
        );

        store.remove("main").expect("remove");
        assert!(store.load("main").expect("load after remove").is_none());
        store.remove("main").expect("remove missing");
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(tmp.path().to_path_buf());
        assert!(store.save("../escape", &record()).is_err());
        assert!(store.load("a/b").is_err());
        assert!(store.remove("").is_err());
    }

    #[test]
    fn test_file_store_corrupt_record_is_an_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("main.json"), "not json").expect("write");
        let store = FileStore::new(tmp.path().to_path_buf());
        assert!(store.load("main").is_err());
    }
}
