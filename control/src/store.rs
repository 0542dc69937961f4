use shotclock_common::capture;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Directory-backed capture store.
///
/// The directory listing is the source of truth: no index file, no cache.
/// Write paths create the directory on first use; read paths treat a
/// missing directory as empty.
pub struct RetentionStore {
    dir: PathBuf,
}

impl RetentionStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one capture. Exactly one file per successful call.
    pub fn write(&self, file_name: &str, png: &[u8]) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::CreateDir(self.dir.display().to_string(), e))?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, png)
            .map_err(|e| StoreError::Write(path.display().to_string(), e))?;
        debug!(path = %path.display(), bytes = png.len(), "capture persisted");
        Ok(path)
    }

    /// Enumerate capture files newest first.
    ///
    /// Ordered by modification time; ties fall back to the file name,
    /// which sorts chronologically by construction.
    pub fn list_newest_first(&self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut files: Vec<(SystemTime, String, PathBuf)> = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !capture::is_capture_file(name) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((modified, name.to_string(), path));
        }

        files.sort_by(|a, b| (&b.0, &b.1).cmp(&(&a.0, &a.1)));
        files.into_iter().map(|(_, _, path)| path).collect()
    }

    /// Delete every file in the store.
    ///
    /// Each deletion attempt is independent and best-effort. Returns true
    /// when nothing failed; an absent directory counts as success.
    pub fn purge(&self) -> bool {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return true,
            Err(e) => {
                warn!(error = %e, dir = %self.dir.display(), "retention directory unreadable");
                return false;
            }
        };

        let mut ok = true;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(error = %e, path = %path.display(), "failed to delete capture");
                ok = false;
            }
        }
        ok
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to create retention directory {0}: {1}")]
    CreateDir(String, std::io::Error),
    #[error("failed to write capture {0}: {1}")]
    Write(String, std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shotclock_common::capture::file_name;

    fn store_in(dir: &Path) -> RetentionStore {
        RetentionStore::new(dir.join("screenshots"))
    }

    #[test]
    fn write_creates_directory_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let name = file_name(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let path = store.write(&name, b"png-bytes").unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");
    }

    #[test]
    fn list_is_empty_for_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(store_in(tmp.path()).list_newest_first().is_empty());
    }

    #[test]
    fn list_orders_newest_first_and_ignores_strangers() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        for hour in 0..5 {
            let name = file_name(Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap());
            store.write(&name, b"x").unwrap();
        }
        std::fs::write(store.dir().join("notes.txt"), b"not a capture").unwrap();

        let listed = store.list_newest_first();
        assert_eq!(listed.len(), 5);
        let names: Vec<String> = listed
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        let mut sorted = names.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(names, sorted, "expected newest (lexicographically greatest) first");
        assert!(names.iter().all(|n| n.starts_with("screenshot_")));
    }

    #[test]
    fn purge_missing_directory_is_success() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(store_in(tmp.path()).purge());
    }

    #[test]
    fn purge_removes_every_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let name = file_name(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        store.write(&name, b"x").unwrap();
        std::fs::write(store.dir().join("stray.dat"), b"y").unwrap();

        assert!(store.purge());
        assert_eq!(std::fs::read_dir(store.dir()).unwrap().count(), 0);
        assert!(store.list_newest_first().is_empty());
    }
}
