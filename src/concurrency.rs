//! Per-location locking for store handles
//!
//! Every handle opened against the same store location shares one reentrant
//! lock, so tree operations from different handles never interleave. Handles
//! on different locations never block each other. The registry is an explicit
//! object shared between handles; nothing here is process-global.

use crate::error::FsError;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Shared lock for one store location
pub struct PathLock {
    key: String,
    mutex: ReentrantMutex<()>,
}

impl PathLock {
    fn new(key: String) -> Self {
        Self {
            key,
            mutex: ReentrantMutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Block until the lock is held. Reentrant on the same thread.
    pub fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.mutex.lock()
    }
}

struct LockEntry {
    lock: Arc<PathLock>,
    refs: usize,
}

/// Reference-counted map from location key to [`PathLock`]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, LockEntry>>,
    anonymous: AtomicU64,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            anonymous: AtomicU64::new(0),
        }
    }

    /// Convenience for callers that want one registry per process
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Get or create the lock for `key`, incrementing its reference count.
    pub fn acquire(&self, key: &str) -> Arc<PathLock> {
        let mut map = self.locks.lock();
        let entry = map.entry(key.to_string()).or_insert_with(|| LockEntry {
            lock: Arc::new(PathLock::new(key.to_string())),
            refs: 0,
        });
        entry.refs += 1;
        debug!(key, refs = entry.refs, "path lock acquired");
        entry.lock.clone()
    }

    /// Drop one reference. The entry is removed when the count reaches zero.
    ///
    /// Returns false if the lock is not (or no longer) registered.
    pub fn release(&self, lock: &Arc<PathLock>) -> bool {
        let mut map = self.locks.lock();
        let Some(entry) = map.get_mut(lock.key()) else {
            return false;
        };
        if !Arc::ptr_eq(&entry.lock, lock) {
            return false;
        }
        entry.refs -= 1;
        debug!(key = lock.key(), refs = entry.refs, "path lock released");
        if entry.refs == 0 {
            map.remove(lock.key());
        }
        true
    }

    pub fn ref_count(&self, key: &str) -> usize {
        self.locks.lock().get(key).map(|e| e.refs).unwrap_or(0)
    }

    /// Number of locations with at least one open handle
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unique key for a location that has no filesystem path (in-memory stores)
    pub fn anonymous_key(&self) -> String {
        let n = self.anonymous.fetch_add(1, Ordering::Relaxed);
        format!(":memory:{}", n)
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a store location to an absolute path.
///
/// The file itself may not exist yet; its parent directory must.
pub fn normalize_location(location: &Path) -> Result<PathBuf, FsError> {
    let file_name = location.file_name().ok_or_else(|| FsError::CannotOpen {
        location: location.display().to_string(),
        reason: "location has no file name".to_string(),
    })?;
    let parent = match location.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let parent = dunce::canonicalize(&parent).map_err(|e| FsError::CannotOpen {
        location: location.display().to_string(),
        reason: format!("cannot resolve parent directory: {}", e),
    })?;
    Ok(parent.join(file_name))
}

/// Registry key for a normalized location
pub fn location_key(normalized: &Path) -> String {
    let digest = blake3::hash(normalized.to_string_lossy().as_bytes());
    hex::encode(digest.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_same_key_shares_lock() {
        let registry = LockRegistry::new();
        let a = registry.acquire("k");
        let b = registry.acquire("k");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.ref_count("k"), 2);

        assert!(registry.release(&a));
        assert_eq!(registry.ref_count("k"), 1);
        assert!(registry.release(&b));
        assert_eq!(registry.ref_count("k"), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_release_after_removal_is_rejected() {
        let registry = LockRegistry::new();
        let a = registry.acquire("k");
        assert!(registry.release(&a));
        assert!(!registry.release(&a));

        // A fresh lock under the same key is a different instance.
        let b = registry.acquire("k");
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!registry.release(&a));
        assert_eq!(registry.ref_count("k"), 1);
    }

    #[test]
    fn test_lock_is_reentrant() {
        let registry = LockRegistry::new();
        let lock = registry.acquire("k");
        let _outer = lock.lock();
        let _inner = lock.lock();
    }

    #[test]
    fn test_same_location_excludes() {
        let registry = Arc::new(LockRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for _ in 0..5 {
            let registry = registry.clone();
            let counter = counter.clone();
            handles.push(thread::spawn(move || {
                let lock = registry.acquire("shared");
                {
                    let _guard = lock.lock();
                    let current = counter.load(Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(2));
                    counter.store(current + 1, Ordering::SeqCst);
                }
                registry.release(&lock);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_different_locations_dont_block() {
        let registry = Arc::new(LockRegistry::new());
        let held = registry.acquire("one");
        let _guard = held.lock();

        let other = registry.clone();
        let handle = thread::spawn(move || {
            let lock = other.acquire("two");
            let _guard = lock.lock();
            true
        });
        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_location_key_is_stable() {
        let temp = tempfile::tempdir().unwrap();
        let a = normalize_location(&temp.path().join("store.db")).unwrap();
        let b = normalize_location(&temp.path().join(".").join("store.db")).unwrap();
        assert_eq!(a, b);
        assert_eq!(location_key(&a), location_key(&b));
        assert_eq!(location_key(&a).len(), 64);
    }

    #[test]
    fn test_missing_parent_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let err = normalize_location(&temp.path().join("nope").join("store.db")).unwrap_err();
        assert!(matches!(err, FsError::CannotOpen { .. }));
    }

    #[test]
    fn test_anonymous_keys_are_unique() {
        let registry = LockRegistry::new();
        assert_ne!(registry.anonymous_key(), registry.anonymous_key());
    }
}
