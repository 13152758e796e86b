use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use dashmap::DashMap;

use crate::{SaveResult, node::Node, save::SaveOptions};

/// One mutex per target path, for callers that need saves to the same file to
/// happen one at a time. Paths are compared as given, not canonicalized.
///
/// An entry lives only while some caller holds or waits on its lock, so the
/// registry does not grow with every path ever saved.
#[derive(Debug, Clone, Default)]
pub struct PathLocks {
    locks: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `path`.
    pub fn with_lock<P, F, R>(&self, path: P, f: F) -> R
    where
        P: AsRef<Path>,
        F: FnOnce(&Path) -> R,
    {
        let path = path.as_ref();
        let lock = Arc::clone(self.locks.entry(path.to_path_buf()).or_default().value());
        let result = {
            // the mutex guards no data, a panicked holder leaves nothing inconsistent
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f(path)
        };
        drop(lock);

        // new holders clone under the shard lock, so a count of one means nobody else is waiting
        self.locks.remove_if(path, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    pub fn save<P>(&self, path: P, value: &Node, options: &SaveOptions) -> SaveResult<()>
    where
        P: AsRef<Path>,
    {
        self.with_lock(path, |path| crate::save::json(path, value, options))
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
