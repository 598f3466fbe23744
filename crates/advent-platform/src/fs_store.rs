use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{KeyValueStore, Result};

/// [`KeyValueStore`] persisted as a single JSON object on disk.
///
/// The file is re-read on every access so writes from another process are
/// always observed. Writes go through a sibling temp file and a rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let encoded = serde_json::to_string_pretty(entries)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &self.path)?;
        debug!("store: wrote {} keys to {}", entries.len(), self.path.display());
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    /// Fails without touching the file when the existing contents can't be
    /// parsed, so keys that could not be read are never dropped.
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load().map_err(|err| {
            warn!(
                "store: refusing to overwrite unreadable {}: {err}",
                self.path.display()
            );
            err
        })?;
        entries.insert(key.to_owned(), value.to_owned());
        self.save(&entries)
    }
}
