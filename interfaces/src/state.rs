use crate::defs::BoundaryError;
use crate::defs::BoundaryResult;
use crate::defs::PreferenceStore;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Preferences kept as one JSON object on disk, string values keyed by name.
pub struct FilePreferenceStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> BoundaryResult<BTreeMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(BoundaryError::Storage(e.to_string())),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            BoundaryError::Storage(format!("corrupt preference file {}: {}", self.path.display(), e))
        })
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> BoundaryResult<()> {
        let body = serde_json::to_string_pretty(values)
            .map_err(|e| BoundaryError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body).map_err(|e| BoundaryError::Storage(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| BoundaryError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self, key: &str) -> BoundaryResult<Option<String>> {
        let values = self.read_all()?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> BoundaryResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| BoundaryError::Storage(e.to_string()))?;
        let mut values = self.read_all()?;
        values.insert(key.to_owned(), value.to_owned());
        self.write_all(&values)?;
        debug!("Saved preference {} to {}", key, self.path.display());
        Ok(())
    }
}
