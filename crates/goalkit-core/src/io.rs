use crate::error::{file_access, GoalkitError, Result};
use crate::paths;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

const LEASE_POLL: Duration = Duration::from_millis(25);

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Readers see either the old content or the new content, never a prefix.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(file_access(dir))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(file_access(dir))?;
    tmp.write_all(data).map_err(file_access(path))?;
    tmp.as_file().sync_all().map_err(file_access(path))?;
    tmp.persist(path).map_err(|e| file_access(path)(e.error))?;
    Ok(())
}

/// Read `path` as UTF-8, returning `None` when the file does not exist.
/// Any other failure is [`GoalkitError::FileAccess`] naming `path`.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(file_access(path)(e)),
    }
}

// ---------------------------------------------------------------------------
// WriteLease
// ---------------------------------------------------------------------------

/// Exclusive single-writer lease on one file, held as a sibling `.lock` file.
///
/// The lease file is created with `create_new`, so only one holder exists at a
/// time across processes. It is removed when the lease is dropped.
#[derive(Debug)]
pub struct WriteLease {
    lock_path: PathBuf,
}

impl WriteLease {
    /// Wait up to `timeout` for the lease guarding `target`.
    pub fn acquire(target: &Path, timeout: Duration) -> Result<Self> {
        let lock_path = paths::lock_path(target);
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(file_access(parent))?;
        }
        let started = Instant::now();
        loop {
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut f) => {
                    // Holder pid helps when someone has to clear a stale lease by hand.
                    let _ = writeln!(f, "{}", std::process::id());
                    tracing::debug!(path = %lock_path.display(), "acquired write lease");
                    return Ok(Self { lock_path });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if started.elapsed() >= timeout {
                        return Err(GoalkitError::LockTimeout(lock_path));
                    }
                    std::thread::sleep(LEASE_POLL);
                }
                Err(e) => return Err(file_access(&lock_path)(e)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for WriteLease {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            tracing::warn!(path = %self.lock_path.display(), error = %e, "failed to release write lease");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.yaml");
        atomic_write(&path, b"[]").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c/history.yaml");
        atomic_write(&path, b"data").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn read_optional_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_optional(&dir.path().join("nope.yaml"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn read_optional_failure_names_the_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.yaml");
        std::fs::create_dir_all(&path).unwrap();
        let err = read_optional(&path).unwrap_err();
        assert!(matches!(err, GoalkitError::FileAccess { .. }), "{err}");
        assert_eq!(err.path(), Some(path.as_path()));
        assert!(err.to_string().contains("history.yaml"));
    }

    #[test]
    fn lease_timeout_explains_stale_lock() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("history.yaml");
        std::fs::write(paths::lock_path(&target), "4242\n").unwrap();
        let err = WriteLease::acquire(&target, Duration::from_millis(30)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("history.yaml.lock"), "{msg}");
        assert!(msg.contains("delete this file"), "{msg}");
    }

    #[test]
    fn lease_is_exclusive_and_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("history.yaml");

        let lease = WriteLease::acquire(&target, Duration::from_millis(100)).unwrap();
        assert!(lease.path().exists());

        let second = WriteLease::acquire(&target, Duration::from_millis(60));
        assert!(matches!(second, Err(GoalkitError::LockTimeout(_))));

        let lock = lease.path().to_path_buf();
        drop(lease);
        assert!(!lock.exists());
        WriteLease::acquire(&target, Duration::from_millis(100)).unwrap();
    }
}
