//! File-backed secret and preference stores
//!
//! Development stand-ins for a platform keychain. Values are hex encoded
//! inside a JSON map and the file is restricted to the owner, but nothing
//! is encrypted at rest.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use authgate_core::{
    AccessPolicy, AuthContext, AuthError, PreferenceStore, Result, SecretBytes, SecretKey,
    SecretStore,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

fn poisoned<T>(_: T) -> AuthError {
    AuthError::StoreUnavailable("lock poisoned".to_string())
}

/// Load a JSON map, empty if the file does not exist yet
fn load_map<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let contents = Zeroizing::new(fs::read_to_string(path)?);
    Ok(serde_json::from_str(&contents)?)
}

/// Write `value` as JSON via a temp file and rename, readable by the owner only
fn save_map<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let contents = Zeroizing::new(serde_json::to_string_pretty(value)?);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, contents.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct StoredEntry {
    /// Hex-encoded secret bytes
    value: String,
    #[zeroize(skip)]
    #[serde(default)]
    policy: AccessPolicy,
}

impl StoredEntry {
    fn new(value: &[u8], policy: AccessPolicy) -> Self {
        Self {
            value: hex::encode(value),
            policy,
        }
    }

    fn decode(&self, key: SecretKey) -> Result<SecretBytes> {
        hex::decode(&self.value)
            .map(Zeroizing::new)
            .map_err(|e| AuthError::InvalidInput(format!("{} is not valid hex: {}", key, e)))
    }
}

/// Secret store persisted to a single JSON file
pub struct FileSecretStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<SecretKey, StoredEntry>>,
}

impl FileSecretStore {
    /// Open the store at `path`, creating nothing until the first write
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries: BTreeMap<SecretKey, StoredEntry> = load_map(&path)?;
        debug!("Opened secret store at {:?} with {} entries", path, entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<SecretKey, StoredEntry>) -> Result<()> {
        save_map(&self.path, entries).map_err(|e| {
            error!("Failed to write secret store {:?}: {}", self.path, e);
            e
        })
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn create(&self, key: SecretKey, value: &[u8], policy: AccessPolicy) -> Result<bool> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        if entries.contains_key(&key) {
            return Ok(false);
        }
        entries.insert(key, StoredEntry::new(value, policy));
        if let Err(e) = self.persist(&entries) {
            entries.remove(&key);
            return Err(e);
        }
        Ok(true)
    }

    async fn read(&self, key: SecretKey, auth: Option<&AuthContext>) -> Result<Option<SecretBytes>> {
        let entries = self.entries.lock().map_err(poisoned)?;
        let Some(entry) = entries.get(&key) else {
            return Ok(None);
        };
        if entry.policy == AccessPolicy::BiometryCurrentSet && auth.is_none() {
            return Err(AuthError::AccessDenied(format!(
                "{} requires biometric authentication",
                key
            )));
        }
        entry.decode(key).map(Some)
    }

    async fn update(&self, key: SecretKey, value: &[u8]) -> Result<bool> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        let Some(policy) = entries.get(&key).map(|entry| entry.policy) else {
            return Ok(false);
        };
        let previous = entries.insert(key, StoredEntry::new(value, policy));
        if let Err(e) = self.persist(&entries) {
            if let Some(previous) = previous {
                entries.insert(key, previous);
            }
            return Err(e);
        }
        Ok(true)
    }

    async fn delete(&self, key: SecretKey) -> Result<bool> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        let Some(removed) = entries.remove(&key) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&entries) {
            entries.insert(key, removed);
            return Err(e);
        }
        Ok(true)
    }
}

/// Preference flags persisted to a JSON file
pub struct FilePreferenceStore {
    path: PathBuf,
    flags: Mutex<BTreeMap<String, bool>>,
}

impl FilePreferenceStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let flags = load_map(&path)?;
        Ok(Self {
            path,
            flags: Mutex::new(flags),
        })
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Result<Option<bool>> {
        let flags = self.flags.lock().map_err(poisoned)?;
        Ok(flags.get(key).copied())
    }

    fn set(&self, key: &str, value: bool) -> Result<()> {
        let mut flags = self.flags.lock().map_err(poisoned)?;
        if flags.get(key) == Some(&value) {
            return Ok(());
        }
        let previous = flags.insert(key.to_string(), value);
        if let Err(e) = save_map(&self.path, &*flags) {
            error!("Failed to write preferences {:?}: {}", self.path, e);
            match previous {
                Some(previous) => flags.insert(key.to_string(), previous),
                None => flags.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_path(dir: &TempDir) -> PathBuf {
        dir.path().join("secrets.json")
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);

        let store = FileSecretStore::open(&path).unwrap();
        assert!(store
            .create(SecretKey::Passcode, b"1234", AccessPolicy::WhenUnlocked)
            .await
            .unwrap());
        assert!(store.update(SecretKey::Passcode, b"5678").await.unwrap());
        drop(store);

        let reopened = FileSecretStore::open(&path).unwrap();
        let value = reopened.read(SecretKey::Passcode, None).await.unwrap().unwrap();
        assert_eq!(value.as_slice(), b"5678");
    }

    #[tokio::test]
    async fn test_absent_keys_report_false() {
        let dir = TempDir::new().unwrap();
        let store = FileSecretStore::open(store_path(&dir)).unwrap();

        assert!(store.read(SecretKey::SessionToken, None).await.unwrap().is_none());
        assert!(!store.update(SecretKey::SessionToken, b"x").await.unwrap());
        assert!(!store.delete(SecretKey::SessionToken).await.unwrap());
        assert!(!store_path(&dir).exists());
    }

    #[tokio::test]
    async fn test_create_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = FileSecretStore::open(store_path(&dir)).unwrap();

        store
            .create(SecretKey::Passcode, b"1234", AccessPolicy::WhenUnlocked)
            .await
            .unwrap();
        assert!(!store
            .create(SecretKey::Passcode, b"9999", AccessPolicy::WhenUnlocked)
            .await
            .unwrap());

        let value = store.read(SecretKey::Passcode, None).await.unwrap().unwrap();
        assert_eq!(value.as_slice(), b"1234");
    }

    #[tokio::test]
    async fn test_biometric_entry_requires_context() {
        let dir = TempDir::new().unwrap();
        let store = FileSecretStore::open(store_path(&dir)).unwrap();
        store
            .create(
                SecretKey::BiometricPasscode,
                b"1234",
                AccessPolicy::BiometryCurrentSet,
            )
            .await
            .unwrap();

        assert!(matches!(
            store.read(SecretKey::BiometricPasscode, None).await,
            Err(AuthError::AccessDenied(_))
        ));

        let context = AuthContext::biometric("test");
        let value = store
            .read(SecretKey::BiometricPasscode, Some(&context))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value.as_slice(), b"1234");
    }

    #[tokio::test]
    async fn test_file_layout_is_hex_json() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        let store = FileSecretStore::open(&path).unwrap();
        store
            .create(SecretKey::FailCounter, b"3", AccessPolicy::WhenUnlocked)
            .await
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["fail_counter"]["value"], "33");
        assert_eq!(json["fail_counter"]["policy"], "when_unlocked");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_store_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        let store = FileSecretStore::open(&path).unwrap();
        store
            .create(SecretKey::Passcode, b"1234", AccessPolicy::WhenUnlocked)
            .await
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupt_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            FileSecretStore::open(&path),
            Err(AuthError::Serialization(_))
        ));
    }

    #[test]
    fn test_preference_write_failure_keeps_old_value() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocked");
        let prefs = FilePreferenceStore::open(blocker.join("prefs.json")).unwrap();

        // A regular file where the parent directory should be
        fs::write(&blocker, "").unwrap();

        assert!(prefs.set("flag", true).is_err());
        assert_eq!(prefs.get("flag").unwrap(), None);
    }

    #[test]
    fn test_preferences_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");

        let prefs = FilePreferenceStore::open(&path).unwrap();
        assert_eq!(prefs.get("flag").unwrap(), None);
        prefs.set("flag", true).unwrap();

        let reopened = FilePreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.get("flag").unwrap(), Some(true));
    }
}
