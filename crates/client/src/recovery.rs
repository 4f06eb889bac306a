//! Draft recovery on the local filesystem.

use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use formcraft_core::error::CoreError;
use formcraft_core::storage::RecoveryStore;

/// One JSON file per recovery key inside a directory.
///
/// Writes go to a temporary file that is then renamed over the entry, so a
/// crash mid-write leaves the previous snapshot in place.
#[derive(Debug, Clone)]
pub struct FileRecoveryStore {
    dir: PathBuf,
}

impl FileRecoveryStore {
    /// Use `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| io_error("create recovery directory", &dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `key`. Bytes outside `[A-Za-z0-9_-]` are percent-encoded
    /// so distinct keys never share a file.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len() + 5);
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                name.push(byte as char);
            } else {
                let _ = write!(name, "%{byte:02X}");
            }
        }
        name.push_str(".json");
        self.dir.join(name)
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> CoreError {
    CoreError::Internal(format!("Failed to {action} {}: {err}", path.display()))
}

impl RecoveryStore for FileRecoveryStore {
    fn save(&self, key: &str, snapshot: &str) -> Result<(), CoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, snapshot).map_err(|e| io_error("write", &tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_error("replace", &path, e))?;
        tracing::trace!(key, path = %path.display(), "Recovery snapshot written");
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, CoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &path, e)),
        }
    }

    fn clear(&self, key: &str) -> Result<(), CoreError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove", &path, e)),
        }
    }
}
