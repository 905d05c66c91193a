// Credential storage. The upload protocol only needs to *read* a token,
// so it depends on the small `CredentialProvider` trait. `FileConfig`
// is the store the CLI uses: a JSON object of string keys and values in
// the user's home directory.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Key under which the bearer token is stored.
pub const TOKEN_KEY: &str = "token";

const CONFIG_FILE_NAME: &str = ".tape_config.json";

/// Read-only key-value lookup consulted once per authenticated call.
pub trait CredentialProvider {
    fn get(&self, key: &str) -> Option<String>;
}

impl CredentialProvider for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl<C: CredentialProvider + ?Sized> CredentialProvider for &C {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// JSON-file backed config store. Nothing is cached: every `get` reads
/// the file again, so a token written by another process is picked up.
#[derive(Clone, Debug)]
pub struct FileConfig {
    path: PathBuf,
}

impl FileConfig {
    /// Store located in the user's home directory (or the current
    /// directory when no home can be found).
    pub fn from_home() -> Self {
        let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::at(dir.join(CONFIG_FILE_NAME))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        FileConfig { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `value` under `key`, keeping the other entries.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), Value::String(value.to_string()));
        self.save(&entries)
    }

    /// Drop `key` from the store. Missing keys are not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }

    fn load(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if data.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    fn save(&self, entries: &Map<String, Value>) -> Result<()> {
        let data = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, data)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

impl CredentialProvider for FileConfig {
    fn get(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(entries) => entries.get(key).and_then(Value::as_str).map(str::to_string),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "ignoring unreadable config");
                None
            }
        }
    }
}
