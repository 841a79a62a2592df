use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use super::state::StoredStatus;
use crate::error::WatchError;

/// The persisted StatusMap: order id → last stored status.
///
/// Loading never fails: a missing or unreadable file starts an empty map.
/// Every [`flush`](StatusStore::flush) rewrites the whole file through a
/// temporary sibling and a rename.
#[derive(Debug, Default)]
pub struct StatusStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, StoredStatus>,
}

impl StatusStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        debug!(path = %path.display(), entries = entries.len(), "status map loaded");
        Self {
            path: Some(path),
            entries,
        }
    }

    /// A store that is never written to disk.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, order_id: &str) -> Option<StoredStatus> {
        self.entries.get(order_id).copied()
    }

    pub fn set(&mut self, order_id: &str, status: StoredStatus) {
        self.entries.insert(order_id.to_string(), status);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn entries(&self) -> &BTreeMap<String, StoredStatus> {
        &self.entries
    }

    pub fn flush(&self) -> Result<(), WatchError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(&self.entries)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), entries = self.entries.len(), "status map flushed");
        Ok(())
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, StoredStatus> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return BTreeMap::new(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "status map unreadable, starting empty");
            return BTreeMap::new();
        }
    };

    let object = match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(object)) => object,
        Ok(_) => {
            warn!(path = %path.display(), "status map is not a JSON object, starting empty");
            return BTreeMap::new();
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "status map malformed, starting empty");
            return BTreeMap::new();
        }
    };

    object
        .into_iter()
        .filter_map(|(id, value)| match StoredStatus::try_from(value) {
            Ok(status) => Some((id, status)),
            Err(reason) => {
                warn!(order_id = %id, %reason, "skipping status map entry");
                None
            }
        })
        .collect()
}
