// File-backed view state
// One JSON file per storage key under the storage directory

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use gridkit_engine::error::StoreError;
use gridkit_engine::store::ViewStatePort;

/// On-disk envelope: the key is kept so stored views can be listed
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredView {
    key: String,
    state: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File stem for a storage key: first 16 hex digits of its SHA-256
    fn hash_key(key: &str) -> String {
        let mut hex = format!("{:x}", Sha256::digest(key.as_bytes()));
        hex.truncate(16);
        hex
    }

    /// File that holds the view for `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::hash_key(key)))
    }

    /// Remove the stored view. Missing files are fine.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Storage keys of every readable stored view, sorted
    pub fn list_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();

        if let Ok(entries) = fs::read_dir(&self.dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                if let Ok(contents) = fs::read_to_string(&path) {
                    if let Ok(view) = serde_json::from_str::<StoredView>(&contents) {
                        keys.push(view.key);
                    }
                }
            }
        }

        keys.sort();
        keys
    }
}

impl ViewStatePort for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let contents = match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let view: StoredView = serde_json::from_str(&contents)?;
        if view.key != key {
            return Err(StoreError::Backend(format!(
                "hash collision: {} holds '{}'",
                self.path_for(key).display(),
                view.key
            )));
        }
        Ok(Some(serde_json::to_string(&view.state)?))
    }

    fn save(&self, key: &str, json: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let view = StoredView {
            key: key.to_string(),
            state: serde_json::from_str(json)?,
        };
        let contents = serde_json::to_string_pretty(&view)?;
        fs::write(self.path_for(key), contents)?;
        Ok(())
    }
}
