use sqlfs::{LockRegistry, SqlFs};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A store file in a fresh temporary directory
pub struct TestStore {
    pub dir: TempDir,
    pub registry: Arc<LockRegistry>,
}

impl TestStore {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            registry: LockRegistry::shared(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("store.db")
    }

    pub fn open(&self) -> SqlFs {
        SqlFs::open(self.path(), &self.registry).unwrap()
    }
}
