use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use tempfile::Builder;

use crate::domain::Entry;
use crate::error::GlossaryError;

const ENTRIES_FILE: &str = "entries.json";
const SETTINGS_FILE: &str = "settings.json";

/// Durable table of entry records. Every call is one all-or-nothing
/// transaction; no handle is kept open between calls.
pub trait EntryTable: Send + Sync {
    /// Clears the table and writes `entries` in its place.
    fn replace_all(&self, entries: &[Entry]) -> Result<(), GlossaryError>;
    fn read_all(&self) -> Result<Vec<Entry>, GlossaryError>;
}

/// Small string settings store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, GlossaryError>;
    fn set(&self, key: &str, value: &str) -> Result<(), GlossaryError>;
    fn remove(&self, key: &str) -> Result<(), GlossaryError>;
}

/// File-backed cache directory holding the entry table and the settings.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
    settings_lock: Arc<Mutex<()>>,
}

impl Store {
    pub fn new() -> Result<Self, GlossaryError> {
        let root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("glossary-browser"))
                    .ok()
            })
            .ok_or_else(|| {
                GlossaryError::Filesystem("unable to resolve cache directory".to_string())
            })?;
        Ok(Self::new_with_root(root))
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self {
            root,
            settings_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn entries_path(&self) -> Utf8PathBuf {
        self.root.join(ENTRIES_FILE)
    }

    pub fn settings_path(&self) -> Utf8PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn ensure_root(&self) -> Result<(), GlossaryError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| GlossaryError::Storage(err.to_string()))
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), GlossaryError> {
        let parent = path
            .parent()
            .ok_or_else(|| GlossaryError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| GlossaryError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix(".glossary-write")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| GlossaryError::Filesystem(err.to_string()))?;
        temp.write_all(content)
            .map_err(|err| GlossaryError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| GlossaryError::Filesystem(err.to_string()))?;
        Ok(())
    }

    fn read_optional(path: &Utf8Path) -> Result<Option<String>, GlossaryError> {
        match fs::read_to_string(path.as_std_path()) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(GlossaryError::Storage(format!("read {path}: {err}"))),
        }
    }

    fn read_settings(&self) -> Result<BTreeMap<String, String>, GlossaryError> {
        let Some(content) = Self::read_optional(&self.settings_path())? else {
            return Ok(BTreeMap::new());
        };
        serde_json::from_str(&content)
            .map_err(|err| GlossaryError::Storage(format!("settings are corrupt: {err}")))
    }

    fn write_settings(&self, settings: &BTreeMap<String, String>) -> Result<(), GlossaryError> {
        let content = serde_json::to_vec_pretty(settings)
            .map_err(|err| GlossaryError::Storage(err.to_string()))?;
        Self::write_bytes_atomic(&self.settings_path(), &content)
            .map_err(|err| GlossaryError::Storage(err.to_string()))
    }

    fn update_settings<F>(&self, update: F) -> Result<(), GlossaryError>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _guard = self
            .settings_lock
            .lock()
            .map_err(|_| GlossaryError::Storage("settings lock poisoned".to_string()))?;
        let mut settings = self.read_settings()?;
        if update(&mut settings) {
            self.write_settings(&settings)?;
        }
        Ok(())
    }
}

impl EntryTable for Store {
    fn replace_all(&self, entries: &[Entry]) -> Result<(), GlossaryError> {
        let content =
            serde_json::to_vec(entries).map_err(|err| GlossaryError::Storage(err.to_string()))?;
        Self::write_bytes_atomic(&self.entries_path(), &content)
            .map_err(|err| GlossaryError::Storage(err.to_string()))
    }

    fn read_all(&self) -> Result<Vec<Entry>, GlossaryError> {
        let Some(content) = Self::read_optional(&self.entries_path())? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&content)
            .map_err(|err| GlossaryError::Storage(format!("entry cache is corrupt: {err}")))
    }
}

impl KeyValueStore for Store {
    fn get(&self, key: &str) -> Result<Option<String>, GlossaryError> {
        let _guard = self
            .settings_lock
            .lock()
            .map_err(|_| GlossaryError::Storage("settings lock poisoned".to_string()))?;
        Ok(self.read_settings()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), GlossaryError> {
        self.update_settings(|settings| {
            settings.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), GlossaryError> {
        self.update_settings(|settings| settings.remove(key).is_some())
    }
}
