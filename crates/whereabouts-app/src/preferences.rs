//! Durable "tracking enabled" preference with change notification
//!
//! The coordinator is the single writer. Readers (host UI, headless runner)
//! either read the current value or subscribe to changes through a
//! `tokio::sync::watch` receiver.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use whereabouts_core::prelude::*;
use whereabouts_core::TrackingPreference;

/// Fixed key of the persisted flag
pub const TRACKING_PREFERENCE_KEY: &str = "tracking_foreground_location";

const PREFERENCES_FILENAME: &str = "preferences.toml";

/// Storage behind a [`PreferenceStore`]
#[cfg_attr(test, mockall::automock)]
pub trait PreferenceBackend: Send + Sync {
    /// Read the stored flag. `None` when nothing was ever written.
    fn load(&self) -> Result<Option<bool>>;

    /// Durably store the flag. Must not return before the write is flushed.
    fn save(&self, enabled: bool) -> Result<()>;

    /// Forget the stored flag
    fn clear(&self) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// TOML file backend
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Serialize)]
struct PreferenceFile {
    #[serde(default, rename = "tracking_foreground_location")]
    tracking_enabled: Option<bool>,
}

/// Stores the preference in `<data_dir>/preferences.toml`
#[derive(Debug, Clone)]
pub struct TomlPreferenceFile {
    path: PathBuf,
}

impl TomlPreferenceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(PREFERENCES_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(PREFERENCES_FILENAME);
        self.path.with_file_name(format!(".{}.tmp", name))
    }
}

impl PreferenceBackend for TomlPreferenceFile {
    fn load(&self) -> Result<Option<bool>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let file: PreferenceFile = toml::from_str(&content)?;
        Ok(file.tracking_enabled)
    }

    fn save(&self, enabled: bool) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::preference(format!("Failed to create {:?}: {}", parent, e)))?;
        }

        let content = toml::to_string(&PreferenceFile {
            tracking_enabled: Some(enabled),
        })?;

        // Write under an exclusive lock and sync before the rename, so the
        // value survives a crash right after we report success.
        let temp_path = self.temp_path();
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| Error::preference(format!("Failed to open {:?}: {}", temp_path, e)))?;
        file.lock_exclusive()
            .map_err(|e| Error::preference(format!("Failed to lock {:?}: {}", temp_path, e)))?;
        file.write_all(content.as_bytes())
            .map_err(|e| Error::preference(format!("Failed to write preferences: {}", e)))?;
        file.sync_all()
            .map_err(|e| Error::preference(format!("Failed to flush preferences: {}", e)))?;

        std::fs::rename(&temp_path, &self.path)
            .map_err(|e| Error::preference(format!("Failed to rename temp file: {}", e)))?;

        debug!("Saved {}={} to {:?}", TRACKING_PREFERENCE_KEY, enabled, self.path);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ─────────────────────────────────────────────────────────────────────────────

/// Volatile backend for tests and hosts that persist elsewhere
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    value: Mutex<Option<bool>>,
    fail_writes: AtomicBool,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(enabled: bool) -> Self {
        Self {
            value: Mutex::new(Some(enabled)),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make subsequent writes fail, to exercise rollback paths
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<bool>>> {
        self.value
            .lock()
            .map_err(|_| Error::preference("preference lock poisoned"))
    }
}

impl PreferenceBackend for MemoryPreferences {
    fn load(&self) -> Result<Option<bool>> {
        Ok(*self.slot()?)
    }

    fn save(&self, enabled: bool) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::preference("write rejected"));
        }
        *self.slot()? = Some(enabled);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}

impl<T: PreferenceBackend + ?Sized> PreferenceBackend for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<bool>> {
        (**self).load()
    }

    fn save(&self, enabled: bool) -> Result<()> {
        (**self).save(enabled)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// The tracking preference plus its observers
pub struct PreferenceStore {
    backend: Box<dyn PreferenceBackend>,
    tx: watch::Sender<TrackingPreference>,
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("value", &*self.tx.borrow())
            .field("observers", &self.tx.receiver_count())
            .finish()
    }
}

impl PreferenceStore {
    /// Open a store, reading the current value from the backend.
    ///
    /// A failing read is logged and treated as "never written" (disabled).
    pub fn open(backend: impl PreferenceBackend + 'static) -> Self {
        let enabled = match backend.load() {
            Ok(value) => value.unwrap_or(false),
            Err(e) => {
                warn!("Failed to read tracking preference, assuming disabled: {}", e);
                false
            }
        };
        let (tx, _) = watch::channel(TrackingPreference { enabled });
        Self {
            backend: Box::new(backend),
            tx,
        }
    }

    pub fn in_memory() -> Self {
        Self::open(MemoryPreferences::new())
    }

    pub fn get(&self) -> TrackingPreference {
        *self.tx.borrow()
    }

    pub fn is_tracking_enabled(&self) -> bool {
        self.get().enabled
    }

    /// Persist the flag, then publish it.
    ///
    /// The backend write completes (flushed) before this returns. On failure
    /// the published value is left untouched.
    pub fn set_tracking_enabled(&self, enabled: bool) -> Result<()> {
        self.backend.save(enabled)?;
        let changed = self.tx.send_if_modified(|pref| {
            if pref.enabled == enabled {
                false
            } else {
                pref.enabled = enabled;
                true
            }
        });
        if changed {
            debug!("Tracking preference -> {}", enabled);
        }
        Ok(())
    }

    /// Observe changes. The receiver sees the current value immediately.
    pub fn subscribe(&self) -> watch::Receiver<TrackingPreference> {
        self.tx.subscribe()
    }

    /// Remove the stored value; readers observe "disabled".
    pub fn clear(&self) -> Result<()> {
        self.backend.clear()?;
        self.tx.send_if_modified(|pref| {
            let changed = pref.enabled;
            pref.enabled = false;
            changed
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_default_is_disabled() {
        let store = PreferenceStore::in_memory();
        assert!(!store.is_tracking_enabled());
    }

    #[test]
    fn test_set_and_get() {
        let store = PreferenceStore::in_memory();
        store.set_tracking_enabled(true).unwrap();
        assert!(store.is_tracking_enabled());
        store.set_tracking_enabled(false).unwrap();
        assert!(!store.is_tracking_enabled());
    }

    #[test]
    fn test_failed_write_keeps_published_value() {
        let backend = Arc::new(MemoryPreferences::new());
        let store = PreferenceStore::open(backend.clone());

        backend.set_fail_writes(true);
        assert!(store.set_tracking_enabled(true).is_err());
        assert!(!store.is_tracking_enabled());
        assert_eq!(backend.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_observers_notified_only_on_change() {
        let store = PreferenceStore::in_memory();
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        store.set_tracking_enabled(false).unwrap();
        assert!(!rx.has_changed().unwrap());

        store.set_tracking_enabled(true).unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().enabled);
    }

    #[test]
    fn test_write_is_flushed_before_returning() {
        let mut backend = MockPreferenceBackend::new();
        backend.expect_load().returning(|| Ok(Some(false)));
        backend
            .expect_save()
            .withf(|enabled| *enabled)
            .times(1)
            .returning(|_| Ok(()));

        let store = PreferenceStore::open(backend);
        store.set_tracking_enabled(true).unwrap();
        assert!(store.is_tracking_enabled());
    }

    #[test]
    fn test_unreadable_backend_opens_disabled() {
        let mut backend = MockPreferenceBackend::new();
        backend
            .expect_load()
            .returning(|| Err(Error::preference("corrupt")));

        let store = PreferenceStore::open(backend);
        assert!(!store.is_tracking_enabled());
    }

    #[test]
    fn test_toml_file_round_trip_and_restart() {
        let dir = tempdir().unwrap();
        {
            let store = PreferenceStore::open(TomlPreferenceFile::in_data_dir(dir.path()));
            assert!(!store.is_tracking_enabled());
            store.set_tracking_enabled(true).unwrap();
        }

        // Durable across "process restarts"
        let store = PreferenceStore::open(TomlPreferenceFile::in_data_dir(dir.path()));
        assert!(store.is_tracking_enabled());

        let content = std::fs::read_to_string(dir.path().join("preferences.toml")).unwrap();
        assert!(content.contains("tracking_foreground_location = true"));
        assert!(!dir.path().join(".preferences.toml.tmp").exists());
    }

    #[test]
    fn test_toml_file_missing_is_none() {
        let dir = tempdir().unwrap();
        let backend = TomlPreferenceFile::in_data_dir(dir.path());
        assert_eq!(backend.load().unwrap(), None);
    }

    #[test]
    fn test_toml_file_corrupt_is_error() {
        let dir = tempdir().unwrap();
        let backend = TomlPreferenceFile::in_data_dir(dir.path());
        std::fs::write(backend.path(), "tracking_foreground_location = \"maybe\"").unwrap();
        assert!(backend.load().is_err());
    }

    #[test]
    fn test_clear_resets_to_disabled() {
        let dir = tempdir().unwrap();
        let store = PreferenceStore::open(TomlPreferenceFile::in_data_dir(dir.path()));
        store.set_tracking_enabled(true).unwrap();

        store.clear().unwrap();
        assert!(!store.is_tracking_enabled());
        assert!(!dir.path().join("preferences.toml").exists());

        // Clearing twice is fine
        store.clear().unwrap();
    }
}
