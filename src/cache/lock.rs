//! Per-key writer lock
//!
//! A lock is the file `<cache_root>/<key>.lock`, created with
//! `create_new` so acquisition is atomic across processes. Acquisition never
//! waits: if the marker already exists another writer owns the key and the
//! caller skips caching.
//!
//! The marker is removed when the guard is released or dropped.

use crate::cache::{CacheKey, LOCK_SUFFIX};
use crate::error::{HoardError, HoardResult};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Exclusive write lock on one cache key
#[derive(Debug)]
pub struct CacheLock {
    lock_path: PathBuf,
    released: bool,
}

impl CacheLock {
    /// Try to take the lock for `key` without blocking
    ///
    /// Returns `Ok(None)` when another writer holds it. Creates the cache root
    /// if needed.
    pub fn try_acquire(cache_root: &Path, key: &CacheKey) -> HoardResult<Option<Self>> {
        fs::create_dir_all(cache_root).map_err(|e| {
            HoardError::io(format!("creating cache root {}", cache_root.display()), e)
        })?;

        let lock_path = cache_root.join(format!("{}{}", key, LOCK_SUFFIX));
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("Lock held by another writer: {}", lock_path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(HoardError::io(
                    format!("creating lock {}", lock_path.display()),
                    e,
                ))
            }
        };

        // Owner info is diagnostic only; the marker's existence is the lock.
        if let Err(e) = writeln!(file, "{} {}", std::process::id(), Utc::now().to_rfc3339()) {
            debug!("Could not record lock owner: {}", e);
        }

        debug!("Acquired lock {}", lock_path.display());
        Ok(Some(Self {
            lock_path,
            released: false,
        }))
    }

    /// Whether a lock marker currently exists for `key`
    pub fn is_held(cache_root: &Path, key: &CacheKey) -> bool {
        cache_root
            .join(format!("{}{}", key, LOCK_SUFFIX))
            .exists()
    }

    /// Release the lock; calling it again is a no-op
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match fs::remove_file(&self.lock_path) {
            Ok(()) => debug!("Released lock {}", self.lock_path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove lock {}: {}", self.lock_path.display(), e),
        }
    }

    /// Get the lock file path
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn acquire_creates_marker() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("cache");
        let key = CacheKey::from("abc12345");

        let lock = CacheLock::try_acquire(&root, &key).unwrap().unwrap();

        assert!(lock.path().exists());
        assert_eq!(lock.path(), root.join("abc12345.lock"));
        assert!(CacheLock::is_held(&root, &key));
    }

    #[test]
    fn second_acquire_is_contended() {
        let temp = TempDir::new().unwrap();
        let key = CacheKey::from("abc12345");

        let _held = CacheLock::try_acquire(temp.path(), &key).unwrap().unwrap();
        let second = CacheLock::try_acquire(temp.path(), &key).unwrap();

        assert!(second.is_none());
    }

    #[test]
    fn different_keys_do_not_contend() {
        let temp = TempDir::new().unwrap();

        let _a = CacheLock::try_acquire(temp.path(), &CacheKey::from("a"))
            .unwrap()
            .unwrap();
        let b = CacheLock::try_acquire(temp.path(), &CacheKey::from("b")).unwrap();

        assert!(b.is_some());
    }

    #[test]
    fn release_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let key = CacheKey::from("abc12345");

        let mut lock = CacheLock::try_acquire(temp.path(), &key).unwrap().unwrap();
        lock.release();
        lock.release();

        assert!(!CacheLock::is_held(temp.path(), &key));
    }

    #[test]
    fn drop_releases() {
        let temp = TempDir::new().unwrap();
        let key = CacheKey::from("abc12345");

        {
            let _lock = CacheLock::try_acquire(temp.path(), &key).unwrap().unwrap();
        }

        assert!(CacheLock::try_acquire(temp.path(), &key).unwrap().is_some());
    }

    #[test]
    fn concurrent_acquire_has_one_winner() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let contenders = 8;
        let start = Arc::new(Barrier::new(contenders));
        let done = Arc::new(Barrier::new(contenders));

        let handles: Vec<_> = (0..contenders)
            .map(|_| {
                let root = root.clone();
                let start = Arc::clone(&start);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    start.wait();
                    let lock = CacheLock::try_acquire(&root, &CacheKey::from("shared")).unwrap();
                    let won = lock.is_some();
                    // Hold the lock until every contender has tried.
                    done.wait();
                    won
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
    }
}
