use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use crate::error::{PipelineError, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: Option<u32>,
    pub acquired_at: DateTime<Utc>,
}

/// Single-flight guard across processes. The lock file is created with
/// create-new semantics and removed when the guard drops.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: &Path, stale_after: Duration) -> Result<Self, PipelineError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| io_error(path, source))?;
        }

        match Self::create(path) {
            Ok(lock) => return Ok(lock),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(io_error(path, e).into()),
        }

        // Released between our attempt and the inspection
        let Some(holder) = Self::inspect(path)? else {
            return Self::create_or_busy(path);
        };

        if Utc::now() - holder.acquired_at < stale_after {
            return Err(PipelineError::RunInProgress {
                path: path.to_path_buf(),
                pid: holder.pid,
                since: holder.acquired_at,
            });
        }

        warn!(
            path = ?path,
            since = %holder.acquired_at,
            pid = ?holder.pid,
            "Taking over stale run lock"
        );
        Self::take_over(path, &holder)
    }

    /// Move the stale lock aside under a per-process name, then check that
    /// what moved is still the stale holder. A concurrent takeover may have
    /// replaced it with a live lock in between; that one is linked back.
    fn take_over(path: &Path, stale: &LockInfo) -> Result<Self, PipelineError> {
        let claimed = path.with_extension(format!("stale-{}", std::process::id()));
        match std::fs::rename(path, &claimed) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Self::create_or_busy(path),
            Err(e) => return Err(io_error(path, e).into()),
        }

        let moved = Self::inspect(&claimed)?;
        if moved.as_ref() != Some(stale) {
            if let Err(e) = std::fs::hard_link(&claimed, path) {
                warn!(path = ?path, error = %e, "Failed to restore a live run lock");
            }
            Self::clear(&claimed)?;
            let holder = moved.unwrap_or_else(|| stale.clone());
            return Err(PipelineError::RunInProgress {
                path: path.to_path_buf(),
                pid: holder.pid,
                since: holder.acquired_at,
            });
        }

        Self::clear(&claimed)?;
        Self::create_or_busy(path)
    }

    fn create_or_busy(path: &Path) -> Result<Self, PipelineError> {
        Self::create(path).map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                PipelineError::RunInProgress {
                    path: path.to_path_buf(),
                    pid: None,
                    since: Utc::now(),
                }
            } else {
                io_error(path, e).into()
            }
        })
    }

    fn create(path: &Path) -> std::io::Result<Self> {
        let info = LockInfo {
            pid: Some(std::process::id()),
            acquired_at: Utc::now(),
        };
        let encoded = serde_json::to_vec(&info).map_err(|e| std::io::Error::new(ErrorKind::Other, e))?;
        Self::create_with(path, |file| file.write_all(&encoded))
    }

    fn create_with(
        path: &Path,
        write: impl FnOnce(&mut File) -> std::io::Result<()>,
    ) -> std::io::Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        if let Err(e) = write(&mut file) {
            // Nobody would release a half-written lock before it goes stale
            drop(file);
            if let Err(cleanup) = std::fs::remove_file(path) {
                warn!(path = ?path, error = %cleanup, "Failed to remove unwritten run lock");
            }
            return Err(e);
        }
        debug!(path = ?path, "Acquired run lock");
        Ok(Self { path: path.to_path_buf() })
    }

    /// Who holds the lock, if anyone. An unreadable lock body falls back to
    /// the file's modification time.
    pub fn inspect(path: &Path) -> Result<Option<LockInfo>, StoreError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(path, e)),
        };

        if let Ok(info) = serde_json::from_str::<LockInfo>(&contents) {
            return Ok(Some(info));
        }

        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| io_error(path, e))?;
        Ok(Some(LockInfo {
            pid: None,
            acquired_at: DateTime::<Utc>::from(modified),
        }))
    }

    /// Remove a lock file regardless of holder. Returns whether one existed.
    pub fn clear(path: &Path) -> Result<bool, StoreError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = ?self.path, error = %e, "Failed to release run lock");
        } else {
            debug!(path = ?self.path, "Released run lock");
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watchnotify.lock");

        let lock = RunLock::acquire(&path, Duration::minutes(30)).unwrap();
        let second = RunLock::acquire(&path, Duration::minutes(30));
        assert!(matches!(second, Err(PipelineError::RunInProgress { .. })));

        drop(lock);
        assert!(!path.exists());
        assert!(RunLock::acquire(&path, Duration::minutes(30)).is_ok());
    }

    #[test]
    fn test_stale_lock_is_taken_over() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watchnotify.lock");
        let stale = LockInfo {
            pid: Some(1),
            acquired_at: Utc::now() - Duration::hours(2),
        };
        std::fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

        let lock = RunLock::acquire(&path, Duration::minutes(30)).unwrap();
        let holder = RunLock::inspect(lock.path()).unwrap().unwrap();
        assert_eq!(holder.pid, Some(std::process::id()));
    }

    #[test]
    fn test_failed_write_leaves_no_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watchnotify.lock");

        let result = RunLock::create_with(&path, |_| Err(std::io::Error::new(ErrorKind::Other, "disk full")));
        assert!(result.is_err());
        assert!(!path.exists());
        assert!(RunLock::acquire(&path, Duration::minutes(30)).is_ok());
    }

    #[test]
    fn test_takeover_keeps_a_lock_that_was_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watchnotify.lock");
        let stale = LockInfo {
            pid: Some(1),
            acquired_at: Utc::now() - Duration::hours(2),
        };
        // Another process took over after we read the stale holder
        let live = LockInfo {
            pid: Some(2),
            acquired_at: Utc::now(),
        };
        std::fs::write(&path, serde_json::to_string(&live).unwrap()).unwrap();

        let result = RunLock::take_over(&path, &stale);
        assert!(matches!(result, Err(PipelineError::RunInProgress { pid: Some(2), .. })));
        assert_eq!(RunLock::inspect(&path).unwrap(), Some(live));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_takeover_after_lock_vanished() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watchnotify.lock");
        let stale = LockInfo {
            pid: Some(1),
            acquired_at: Utc::now() - Duration::hours(2),
        };

        let lock = RunLock::take_over(&path, &stale).unwrap();
        assert_eq!(RunLock::inspect(lock.path()).unwrap().unwrap().pid, Some(std::process::id()));
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watchnotify.lock");
        std::fs::write(&path, "garbage").unwrap();

        assert!(RunLock::inspect(&path).unwrap().is_some());
        assert!(RunLock::clear(&path).unwrap());
        assert!(!RunLock::clear(&path).unwrap());
        assert!(RunLock::inspect(&path).unwrap().is_none());
    }
}
