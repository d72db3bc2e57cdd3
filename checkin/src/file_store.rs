use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{SessionStore, StoreError};

/// Environment variable naming the directory that holds `state.json`.
pub const STATE_DIR_ENV: &str = "CHECKIN_STATE_DIR";

const STATE_FILE: &str = "state.json";

/// A session store backed by a single JSON object file.
///
/// The whole file is rewritten on every mutation. Writes go to a sibling
/// temporary file that is then renamed over the original, so a crash never
/// leaves a half-written state file behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(StoreError::backend(
                    anyhow::Error::new(err).context(format!("reading {}", path.display())),
                ));
            }
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "opened state file");
        Ok(Self { path, entries })
    }

    /// The default state file location.
    ///
    /// `$CHECKIN_STATE_DIR/state.json` when the variable is set, otherwise
    /// `checkin/state.json` under the platform's local data directory.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os(STATE_DIR_ENV)
            && !dir.is_empty()
        {
            return Some(PathBuf::from(dir).join(STATE_FILE));
        }
        dirs::data_local_dir().map(|dir| dir.join("checkin").join(STATE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        write_atomically(&self.path, &self.entries).map_err(StoreError::backend)
    }
}

fn write_atomically(path: &Path, entries: &BTreeMap<String, String>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(entries)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, text).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let previous = self.entries.insert(key.to_string(), value.to_string());
        if let Err(err) = self.flush() {
            match previous {
                Some(previous) => self.entries.insert(key.to_string(), previous),
                None => self.entries.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if let Some(previous) = self.entries.remove(key)
            && let Err(err) = self.flush()
        {
            self.entries.insert(key.to_string(), previous);
            return Err(err);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("state.json")).unwrap();
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut store = FileStore::open(&path).unwrap();
        store.set("phase_0:mode", "\"full\"").unwrap();
        store.set("phase_0:cursor:full", "3").unwrap();
        store.remove("phase_0:cursor:full").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("phase_0:mode").unwrap().as_deref(),
            Some("\"full\"")
        );
        assert!(reopened.get("phase_0:cursor:full").unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();

        let err = FileStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
    }
}
