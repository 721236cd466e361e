//! Key/value snapshot persisted as a single pretty-printed JSON object.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

#[derive(thiserror::Error, Debug)]
/// Errors raised while persisting the state file.
pub enum StateError {
    /// Writing or replacing the state file failed.
    #[error("Failed to write state file {path}: {source}")]
    Io {
        /// Path of the state file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A value could not be converted to JSON.
    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug)]
/// Durable snapshot store that reports whether a value differs from the persisted one.
///
/// The whole map is rewritten on every change. Only one process may use a
/// state file at a time.
pub struct StateStore {
    path: PathBuf,
    state: Map<String, Value>,
}

impl StateStore {
    /// Load the store from `path`.
    ///
    /// A missing file starts an empty store. So does a file that is not a JSON
    /// object, after logging the problem.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = load(&path);
        Self { path, state }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw stored value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    /// Stored value for `key` decoded as `T`, or `default` when missing or of another shape.
    #[must_use]
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.state
            .get(key)
            .and_then(|value| T::deserialize(value).ok())
            .unwrap_or(default)
    }

    /// Store `value` under `key` and persist the whole map.
    ///
    /// # Errors
    ///
    /// Returns a [`StateError`] if the value cannot be serialized or the file cannot be written.
    /// On failure the in-memory map keeps its previous value for `key`, so the
    /// value still counts as changed.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StateError> {
        let value = serde_json::to_value(value)?;
        let previous = self.state.insert(key.to_owned(), value);

        if let Err(err) = self.save() {
            match previous {
                Some(previous) => self.state.insert(key.to_owned(), previous),
                None => self.state.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    /// Whether `new_value` differs from what is stored under `key`.
    ///
    /// A key that was never set counts as changed.
    pub fn has_changed<T: Serialize + ?Sized>(&self, key: &str, new_value: &T) -> bool {
        let new_value = match serde_json::to_value(new_value) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    key,
                    error = %err,
                    "Cannot serialize value for comparison, treating as changed"
                );
                return true;
            }
        };

        match self.state.get(key) {
            Some(old_value) if *old_value == new_value => {
                info!(key, value = %new_value, "State unchanged");
                false
            }
            Some(old_value) => {
                info!(key, old = %old_value, new = %new_value, "State changed");
                true
            }
            None => {
                info!(key, new = %new_value, "State changed (no previous value)");
                true
            }
        }
    }

    /// Remove every key and persist the empty map.
    ///
    /// # Errors
    ///
    /// Returns a [`StateError`] if the file cannot be written.
    pub fn clear(&mut self) -> Result<(), StateError> {
        self.state.clear();
        self.save()?;
        info!(path = %self.path.display(), "State cleared");
        Ok(())
    }

    fn save(&self) -> Result<(), StateError> {
        let mut text = serde_json::to_string_pretty(&self.state)?;
        text.push('\n');

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        let io_error = |source| StateError::Io {
            path: self.path.clone(),
            source,
        };
        fs::write(&staging, text).map_err(io_error)?;
        fs::rename(&staging, &self.path).map_err(io_error)?;

        info!(path = %self.path.display(), "Saved state");
        Ok(())
    }
}

fn load(path: &Path) -> Map<String, Value> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No existing state file found, starting fresh");
            return Map::new();
        }
        Err(err) => {
            error!(path = %path.display(), error = %err, "Error reading state file");
            return Map::new();
        }
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(state)) => {
            info!(path = %path.display(), keys = state.len(), "Loaded state");
            state
        }
        Ok(other) => {
            error!(
                path = %path.display(),
                found = %other,
                "State file is not a JSON object, starting fresh"
            );
            Map::new()
        }
        Err(err) => {
            error!(
                path = %path.display(),
                error = %err,
                "Error loading state file, starting fresh"
            );
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path().join("state.json"));

        assert!(store.get("last_display").is_none());
        assert_eq!(store.get_or("last_display", json!("fallback")), json!("fallback"));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let store = StateStore::open(&path);
        assert!(store.get("anything").is_none());
    }

    #[test]
    fn non_object_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let store = StateStore::open(&path);
        assert!(store.get("0").is_none());
    }

    #[test]
    fn set_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = StateStore::open(&path);
        store.set("count", &3).unwrap();
        store.set("last_display", &json!({"status": "success"})).unwrap();

        let reloaded = StateStore::open(&path);
        assert_eq!(reloaded.get_or("count", 0), 3);
        assert_eq!(reloaded.get("last_display"), Some(&json!({"status": "success"})));
    }

    #[test]
    fn unicode_round_trips_literally() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let payload = json!({"danish": "æøå", "emoji": "🗑️"});

        let mut store = StateStore::open(&path);
        store.set("data", &payload).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("æøå"));
        assert!(text.contains("🗑️"));
        assert!(!text.contains("\\u"));

        let reloaded = StateStore::open(&path);
        assert_eq!(reloaded.get("data"), Some(&payload));
    }

    #[test]
    fn file_is_pretty_printed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = StateStore::open(&path);
        store.set("key", "value").unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n  \"key\": \"value\"\n}\n");
    }

    #[test]
    fn has_changed_compares_deeply() {
        let dir = tempdir().unwrap();
        let mut store = StateStore::open(dir.path().join("state.json"));

        let snapshot = json!({"status": "success", "fractions": ["Glas", "Metal"]});
        assert!(store.has_changed("last_display", &snapshot));

        store.set("last_display", &snapshot).unwrap();
        assert!(!store.has_changed(
            "last_display",
            &json!({"fractions": ["Glas", "Metal"], "status": "success"})
        ));
        assert!(store.has_changed(
            "last_display",
            &json!({"status": "success", "fractions": ["Metal", "Glas"]})
        ));
    }

    #[test]
    fn has_changed_has_no_side_effect() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = StateStore::open(&path);

        assert!(store.has_changed("key", &1));
        assert!(store.has_changed("key", &1));
        assert!(!path.exists());
    }

    #[test]
    fn get_or_falls_back_on_shape_mismatch() {
        let dir = tempdir().unwrap();
        let mut store = StateStore::open(dir.path().join("state.json"));
        store.set("count", "three").unwrap();

        assert_eq!(store.get_or("count", 7_u32), 7);
    }

    #[test]
    fn clear_empties_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = StateStore::open(&path);
        store.set("key", &json!([1, 2])).unwrap();
        store.clear().unwrap();

        assert!(store.get("key").is_none());
        let reloaded = StateStore::open(&path);
        assert!(reloaded.get("key").is_none());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}\n");
    }

    #[test]
    fn set_fails_when_directory_is_missing() {
        let dir = tempdir().unwrap();
        let mut store = StateStore::open(dir.path().join("missing").join("state.json"));

        let result = store.set("key", &1);
        assert!(matches!(result, Err(StateError::Io { .. })));
    }

    #[test]
    fn failed_write_keeps_previous_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = StateStore::open(&path);
        store.set("last_display", &json!({"status": "no_data"})).unwrap();

        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        let updated = json!({"status": "success"});
        assert!(store.set("last_display", &updated).is_err());
        assert_eq!(store.get("last_display"), Some(&json!({"status": "no_data"})));
        assert!(store.has_changed("last_display", &updated));

        assert!(store.set("fresh", &1).is_err());
        assert!(store.get("fresh").is_none());
    }
}
