//! Per-destination mutual exclusion
//!
//! A transfer holds the lock for its destination path from the size probe
//! until its terminal state, so no second writer can change the local size
//! between reconcile and the last appended chunk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<PathBuf, Arc<AsyncMutex<()>>>;

/// Registry of in-flight destination paths
#[derive(Debug, Clone, Default)]
pub struct PathLocks {
    inner: Arc<Mutex<LockMap>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other transfer writes `path`, then claims it
    pub async fn acquire(&self, path: &Path) -> PathGuard {
        let lock = {
            let mut map = self.map();
            Arc::clone(map.entry(path.to_path_buf()).or_default())
        };

        let guard = lock.lock_owned().await;
        PathGuard {
            guard: Some(guard),
            path: path.to_path_buf(),
            locks: self.clone(),
        }
    }

    /// Number of paths currently claimed or awaited
    pub fn in_flight(&self) -> usize {
        self.map().len()
    }

    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Claim on one destination path, released on drop
#[derive(Debug)]
pub struct PathGuard {
    guard: Option<OwnedMutexGuard<()>>,
    path: PathBuf,
    locks: PathLocks,
}

impl PathGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        let mut map = self.locks.map();
        // Release before inspecting so waiters see the lock free
        self.guard.take();

        // Only the map still references the lock: nobody is waiting on it
        if let Some(lock) = map.get(&self.path) {
            if Arc::strong_count(lock) == 1 {
                map.remove(&self.path);
            }
        }
    }
}
