//! Persisted settings: the single provider key.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credential::Credential;
use crate::error::Result;

/// Setting name under which the provider key is persisted.
pub const CREDENTIAL_SETTING: &str = "vworld_key";

/// Load/save access to the provider credential.
pub trait SettingsStore {
    /// Current credential; empty if never saved.
    fn load(&self) -> Result<Credential>;

    /// Persist a new credential. No format validation is done.
    fn save(&mut self, credential: &Credential) -> Result<()>;
}

/// Process-local store, forgotten on exit.
#[derive(Debug, Default, Clone)]
pub struct MemorySettings {
    credential: Credential,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `credential`.
    pub fn with_credential(credential: Credential) -> Self {
        Self { credential }
    }
}

impl SettingsStore for MemorySettings {
    fn load(&self) -> Result<Credential> {
        Ok(self.credential.clone())
    }

    fn save(&mut self, credential: &Credential) -> Result<()> {
        self.credential = credential.clone();
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsDocument {
    #[serde(rename = "vworld_key", default)]
    credential: Credential,
}

/// JSON file store: `{"vworld_key": "..."}`.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettings {
    fn load(&self) -> Result<Credential> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "settings file missing, no credential");
            return Ok(Credential::none());
        }
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Credential::none());
        }
        let doc: SettingsDocument = serde_json::from_str(&text)?;
        Ok(doc.credential)
    }

    fn save(&mut self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let doc = SettingsDocument {
            credential: credential.clone(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&doc)?)?;
        debug!(path = %self.path.display(), present = credential.is_present(), "settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_roundtrip() {
        let mut store = MemorySettings::new();
        assert_eq!(store.load().unwrap(), Credential::none());
        store.save(&Credential::new("abc-123")).unwrap();
        assert_eq!(store.load().unwrap().expose(), "abc-123");
    }

    #[test]
    fn test_file_load_before_save_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettings::new(dir.path().join("settings.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_roundtrip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut store = FileSettings::new(&path);

        store.save(&Credential::new("first")).unwrap();
        store.save(&Credential::new("second key")).unwrap();

        let reopened = FileSettings::new(&path);
        assert_eq!(reopened.load().unwrap().expose(), "second key");

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(CREDENTIAL_SETTING));
    }

    #[test]
    fn test_file_corrupt_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(FileSettings::new(&path).load().is_err());
    }
}
