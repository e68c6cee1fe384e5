use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::{debug, warn};

use crate::models::UserProfile;

const SERVICE_NAME: &str = "storefront";

/// File name for the file-backed store
const CREDENTIALS_FILE: &str = "credentials.json";

/// Durable key holding the bearer token
pub const TOKEN_KEY: &str = "token";

/// Durable key holding the serialized user profile
pub const USER_KEY: &str = "user";

/// Durable string key-value storage underneath the credential store.
pub trait CredentialBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;

    fn write(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Persist several keys as one step from the caller's point of view.
    fn write_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        for (key, value) in entries {
            self.write(key, value)?;
        }
        Ok(())
    }
}

/// OS keychain storage, one entry per key.
pub struct KeyringBackend;

impl KeyringBackend {
    fn entry(key: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, key).context("Failed to create keyring entry")
    }
}

impl CredentialBackend for KeyringBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match Self::entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to retrieve credential from keychain")),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        Self::entry(key)?
            .set_password(value)
            .context("Failed to store credential in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        match Self::entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete credential from keychain")),
        }
    }
}

/// A single JSON document on disk holding every key.
pub struct FileBackend {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            path: dir.join(CREDENTIALS_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read credentials file")?;
        serde_json::from_str(&contents).context("Failed to parse credentials file")
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if map.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).context("Failed to remove credentials file")?;
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, contents).context("Failed to write credentials file")
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        f(&mut map);
        self.write_map(&map)
    }
}

impl CredentialBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_map()?.remove(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|map| {
            map.remove(key);
        })
    }

    fn write_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        self.update(|map| {
            for (key, value) in entries {
                map.insert(key.to_string(), value.to_string());
            }
        })
    }
}

/// Process-local storage for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }

    fn write_all(&self, pairs: &[(&str, &str)]) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for (key, value) in pairs {
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

/// Persisted token and profile.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialRecord {
    pub token: String,
    pub user: UserProfile,
}

/// Token + profile persistence shared by the gateway and the session.
/// Clone is cheap - the backend sits behind an Arc.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn CredentialBackend>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn CredentialBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Store token and profile together
    pub fn save(&self, token: &str, user: &UserProfile) -> Result<()> {
        let user_json = serde_json::to_string(user).context("Failed to serialize user profile")?;
        self.backend
            .write_all(&[(TOKEN_KEY, token), (USER_KEY, user_json.as_str())])?;
        debug!("Credentials saved");
        Ok(())
    }

    /// Rewrite only the stored profile
    pub fn save_user(&self, user: &UserProfile) -> Result<()> {
        let user_json = serde_json::to_string(user).context("Failed to serialize user profile")?;
        self.backend.write(USER_KEY, &user_json)
    }

    /// Both halves of the record, or `None` when either is missing or the
    /// stored profile no longer parses. Only storage failures are errors.
    pub fn load(&self) -> Result<Option<CredentialRecord>> {
        let token = self.backend.read(TOKEN_KEY)?;
        let user = self.backend.read(USER_KEY)?;
        match (token, user) {
            (Some(token), Some(user)) => match serde_json::from_str::<UserProfile>(&user) {
                Ok(user) => Ok(Some(CredentialRecord { token, user })),
                Err(e) => {
                    warn!(error = %e, "Stored user profile is corrupt, ignoring it");
                    Ok(None)
                }
            },
            (Some(_), None) => {
                warn!("Stored token has no matching profile");
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    pub fn token(&self) -> Result<Option<String>> {
        self.backend.read(TOKEN_KEY)
    }

    pub fn user(&self) -> Result<Option<UserProfile>> {
        match self.backend.read(USER_KEY)? {
            Some(raw) => Ok(Some(
                serde_json::from_str(&raw).context("Failed to parse stored user profile")?,
            )),
            None => Ok(None),
        }
    }

    /// Remove both keys
    pub fn clear(&self) -> Result<()> {
        self.backend.remove(TOKEN_KEY)?;
        self.backend.remove(USER_KEY)?;
        debug!("Credentials cleared");
        Ok(())
    }

    /// Check if a token is stored
    pub fn has_credentials(&self) -> bool {
        matches!(self.token(), Ok(Some(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn admin() -> UserProfile {
        serde_json::from_value(json!({"id": 1, "role": "admin"})).unwrap()
    }

    fn round_trip(store: &CredentialStore) {
        assert_eq!(store.load().unwrap(), None);

        store.save("T1", &admin()).unwrap();
        assert_eq!(
            store.load().unwrap(),
            Some(CredentialRecord {
                token: "T1".to_string(),
                user: admin(),
            })
        );
        assert!(store.has_credentials());

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert!(!store.has_credentials());
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_memory_round_trip() {
        round_trip(&CredentialStore::in_memory());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FileBackend::new(dir.path().to_path_buf()));
        let store = CredentialStore::new(backend.clone());
        round_trip(&store);
        assert!(!backend.path().exists());
    }

    #[test]
    fn test_file_backend_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        CredentialStore::new(Arc::new(FileBackend::new(dir.path().to_path_buf())))
            .save("T1", &admin())
            .unwrap();

        let reopened = CredentialStore::new(Arc::new(FileBackend::new(dir.path().to_path_buf())));
        assert_eq!(reopened.token().unwrap().as_deref(), Some("T1"));
        assert_eq!(reopened.user().unwrap(), Some(admin()));
    }

    #[test]
    fn test_token_without_profile_is_absent() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write(TOKEN_KEY, "T1").unwrap();
        let store = CredentialStore::new(backend);
        assert_eq!(store.load().unwrap(), None);
        assert!(store.has_credentials());
    }

    #[test]
    fn test_corrupt_profile_is_ignored() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write_all(&[(TOKEN_KEY, "T1"), (USER_KEY, "{not json")]).unwrap();
        let store = CredentialStore::new(backend);
        assert_eq!(store.load().unwrap(), None);
        assert!(store.user().is_err());
    }

    #[test]
    fn test_save_user_keeps_token() {
        let store = CredentialStore::in_memory();
        store.save("T1", &admin()).unwrap();
        let renamed: UserProfile = serde_json::from_value(json!({"id": 1, "role": "admin", "name": "Ana"})).unwrap();
        store.save_user(&renamed).unwrap();
        let record = store.load().unwrap().unwrap();
        assert_eq!(record.token, "T1");
        assert_eq!(record.user.name(), Some("Ana"));
    }
}
