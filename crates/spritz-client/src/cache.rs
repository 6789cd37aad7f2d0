use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::ClientResult;

/// Key/value store of small JSON documents kept in a single file.
///
/// Every write rewrites the file through a temporary sibling and a rename,
/// so a crash leaves either the old or the new contents.
#[derive(Debug)]
pub struct Cache {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl Cache {
    /// Open the cache at `path`. A missing file is an empty cache; a corrupt
    /// one is logged and discarded.
    pub fn open(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Map<String, Value>>(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Discarding unreadable cache {}: {}", path.display(), e);
                    Map::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when the key is absent or no longer matches `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.get(key)?.clone();
        serde_json::from_value(value).ok()
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> ClientResult<()> {
        self.entries.insert(key.to_string(), serde_json::to_value(value)?);
        self.flush()
    }

    pub fn remove(&mut self, key: &str) -> ClientResult<bool> {
        if self.entries.remove(key).is_none() {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    pub fn clear(&mut self) -> ClientResult<()> {
        self.entries.clear();
        self.flush()
    }

    fn flush(&self) -> ClientResult<()> {
        let dir = match self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                dir
            }
            None => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &self.entries)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Cache key for a wallet's calendar connection status.
pub fn calendar_status_key(address: &str) -> String {
    format!("calendar-status:{}", address.to_lowercase())
}

/// Cache key for a wallet's invite code list.
pub fn invites_key(address: &str) -> String {
    format!("invites:{}", address.to_lowercase())
}
