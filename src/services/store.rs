use anyhow::{Context, Result};
use ini::Ini;
use std::path::{Path, PathBuf};

const SETTINGS_SECTION: &str = "settings";

/// Persisted key-value store for panel field values
///
/// Keys are the field names of the settings panel; values are plain strings.
/// A missing key is not an error, callers decide what absence means.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Store implementation backed by an INI file under the data directory
///
/// The file is the only state; every handle onto the same path sees the same
/// entries, and values survive service restarts.
#[derive(Clone, Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Ini> {
        if !self
            .path
            .try_exists()
            .context("failed to check if settings file exists")?
        {
            return Ok(Ini::new());
        }

        Ini::load_from_file(&self.path)
            .context(format!("failed to load settings file {:?}", self.path))
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let ini = self.load()?;

        Ok(ini
            .section(Some(SETTINGS_SECTION))
            .and_then(|section| section.get(key))
            .map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut ini = self.load()?;

        ini.with_section(Some(SETTINGS_SECTION)).set(key, value);

        ini.write_to_file(&self.path)
            .context(format!("failed to write settings file {:?}", self.path))
    }
}

/// In-memory store for tests
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Default)]
pub struct MemSettingsStore {
    entries: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

#[cfg(any(test, feature = "mock"))]
impl MemSettingsStore {
    pub fn snapshot(&self) -> std::collections::HashMap<String, String> {
        self.entries.lock().unwrap().clone()
    }
}

#[cfg(any(test, feature = "mock"))]
impl SettingsStore for MemSettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("settings.ini"));

        assert_eq!(store.get("wifiSsid").unwrap(), None);
    }

    #[test]
    fn values_survive_reopening_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.ini");

        let store = FileSettingsStore::new(&path);
        store.set("wifiSsid", "HomeNet").unwrap();
        store.set("mqttUri", "mqtt://broker:1883").unwrap();
        drop(store);

        let reopened = FileSettingsStore::new(&path);
        assert_eq!(
            reopened.get("wifiSsid").unwrap(),
            Some("HomeNet".to_string())
        );
        assert_eq!(
            reopened.get("mqttUri").unwrap(),
            Some("mqtt://broker:1883".to_string())
        );
    }

    #[test]
    fn set_overwrites_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("settings.ini"));

        store.set("wifiPass", "first").unwrap();
        store.set("wifiPass", "second").unwrap();

        assert_eq!(store.get("wifiPass").unwrap(), Some("second".to_string()));
    }

    #[test]
    fn empty_string_values_are_stored() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("settings.ini"));

        store.set("mqttUser", "").unwrap();

        assert_eq!(store.get("mqttUser").unwrap(), Some(String::new()));
    }
}
