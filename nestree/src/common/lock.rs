use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A handle to one named read-write lock that can be stored and reused.
///
/// Structural tree operations hold the write side for their whole duration.
#[derive(Clone)]
pub struct LockHandle {
    lock: Arc<RwLock<()>>,
}

impl LockHandle {
    /// Creates a new, unregistered lock handle.
    pub fn new() -> Self {
        LockHandle {
            lock: Arc::new(RwLock::new(())),
        }
    }

    /// Acquires a read lock
    pub fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read()
    }

    /// Acquires a write lock
    pub fn write(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write()
    }

    /// Acquires a write lock, giving up after `timeout`.
    ///
    /// Returns `None` when the lock could not be taken in time.
    pub fn write_for(&self, timeout: Duration) -> Option<RwLockWriteGuard<'_, ()>> {
        self.lock.try_write_for(timeout)
    }

    /// Returns `true` if some thread currently holds the write side.
    pub fn is_write_locked(&self) -> bool {
        self.lock.is_locked_exclusive()
    }
}

impl Default for LockHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry for managing named read-write locks.
///
/// Every tree bound to the same store shares one entry, keyed by the store's
/// lock key, so two handles on the same table never interleave structural
/// operations. Uses `parking_lot`'s poison-free locks.
///
/// # Examples
///
/// ```
/// use nestree::common::LockRegistry;
/// let lock_registry = LockRegistry::new();
/// let lock = lock_registry.get_lock("tree_node");
/// {
///     let _write_guard = lock.write();
/// }
/// assert_eq!(lock_registry.lock_count(), 1);
/// ```
#[derive(Clone)]
pub struct LockRegistry {
    locks: Arc<RwLock<HashMap<String, Arc<RwLock<()>>>>>,
}

impl LockRegistry {
    /// Creates a new empty lock registry.
    pub fn new() -> Self {
        LockRegistry {
            locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Gets the lock registered under `name`, creating it on first use.
    pub fn get_lock(&self, name: &str) -> LockHandle {
        let lock = {
            let mut locks = self.locks.write();
            locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(())))
                .clone()
        };
        LockHandle { lock }
    }

    /// Removes a lock from the registry.
    ///
    /// Handles already handed out keep working; later `get_lock` calls
    /// create a fresh lock.
    pub fn remove_lock(&self, name: &str) -> bool {
        let mut locks = self.locks.write();
        locks.remove(name).is_some()
    }

    /// Returns the number of locks currently registered.
    pub fn lock_count(&self) -> usize {
        let locks = self.locks.read();
        locks.len()
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new()
    }
}
