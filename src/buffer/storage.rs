//! # Durable Storage
//!
//! Minimal write/read/remove interface for the buffer snapshot.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

/// Durable byte storage addressed by path
pub trait Storage: Send {
    /// Replaces the contents at `path` with `bytes`
    fn write(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Reads the contents at `path`, `None` if nothing is stored there
    fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>>;

    /// Removes the contents at `path`. Removing nothing is not an error.
    fn remove(&mut self, path: &Path) -> io::Result<()>;
}

/// Filesystem-backed storage.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so readers see either the old or the new snapshot.
#[derive(Debug, Clone, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for FsStorage {
    fn write(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn remove(&mut self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// In-memory storage for simulation and tests.
///
/// Clones share the same contents, so a test can keep a handle while the
/// buffer owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    writes: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with `io::ErrorKind::Other`
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().ok()?.get(path).cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.contents(path).is_some()
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<PathBuf, Vec<u8>>>> {
        self.files
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "storage lock poisoned"))
    }
}

impl Storage for MemoryStorage {
    fn write(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "simulated write failure"));
        }
        self.lock()?.insert(path.to_path_buf(), bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(path).cloned())
    }

    fn remove(&mut self, path: &Path) -> io::Result<()> {
        self.lock()?.remove(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.json");
        let mut storage = FsStorage::new();

        storage.write(&path, b"{\"readings\":[]}").unwrap();
        assert_eq!(storage.read(&path).unwrap().unwrap(), b"{\"readings\":[]}");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_write_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.json");
        let mut storage = FsStorage::new();

        storage.write(&path, b"first").unwrap();
        storage.write(&path, b"second").unwrap();
        assert_eq!(storage.read(&path).unwrap().unwrap(), b"second");
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("buffer").join("snap.json");
        let mut storage = FsStorage::new();

        storage.write(&path, b"x").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = FsStorage::new();
        assert!(storage.read(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.json");
        let mut storage = FsStorage::new();

        storage.write(&path, b"x").unwrap();
        storage.remove(&path).unwrap();
        assert!(!path.exists());
        storage.remove(&path).unwrap();
    }

    #[test]
    fn test_memory_storage_shares_contents() {
        let handle = MemoryStorage::new();
        let mut owned = handle.clone();
        let path = Path::new("/buffer.json");

        owned.write(path, b"abc").unwrap();
        assert_eq!(handle.contents(path).unwrap(), b"abc");
        assert_eq!(handle.write_count(), 1);

        owned.remove(path).unwrap();
        assert!(!handle.contains(path));
    }

    #[test]
    fn test_memory_storage_write_failure() {
        let mut storage = MemoryStorage::new();
        storage.set_fail_writes(true);
        assert!(storage.write(Path::new("/x"), b"1").is_err());
        assert_eq!(storage.write_count(), 0);
    }
}
