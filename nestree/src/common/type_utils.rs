use std::sync::Arc;

use parking_lot::RwLock;

/// Shared, lock-guarded state: committed store tables, listener maps and
/// the mutable parts of a tree configuration.
pub(crate) type Atomic<T> = Arc<RwLock<T>>;

pub(crate) fn atomic<T>(t: T) -> Atomic<T> {
    Arc::new(RwLock::new(t))
}

/// Scoped access to an [`Atomic`], releasing the guard before returning.
pub(crate) trait Guarded<T> {
    fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R;

    fn write_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R;
}

impl<T> Guarded<T> for Atomic<T> {
    fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.read();
        f(&*guard)
    }

    fn write_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.write();
        f(&mut *guard)
    }
}
