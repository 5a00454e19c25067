use crate::errors::TreeResult;
use crate::node::{Bound, Node, NodeId};
use std::ops::Deref;
use std::sync::Arc;

/// Read side of the interval store.
///
/// Implementations return owned rows; ordering guarantees are part of the
/// contract because the engine relies on them.
pub trait NodeReader {
    /// Point read by id.
    fn get_by_id(&self, id: NodeId) -> TreeResult<Option<Node>>;

    /// Direct children of `parent_id`, ordered by `position` ascending.
    fn get_children(&self, parent_id: NodeId) -> TreeResult<Vec<Node>>;

    /// Rows with `left >= left_bound AND right <= right_bound`, ordered by `left`.
    fn get_range(&self, left_bound: Bound, right_bound: Bound) -> TreeResult<Vec<Node>>;

    /// Rows with `left < left_bound AND right > right_bound`, ordered by `left`.
    ///
    /// For the bounds of an existing node these are exactly its ancestors.
    fn get_enclosing(&self, left_bound: Bound, right_bound: Bound) -> TreeResult<Vec<Node>>;

    /// Every row, ordered by `left`.
    fn all(&self) -> TreeResult<Vec<Node>>;

    /// Number of rows.
    fn size(&self) -> TreeResult<u64>;
}

/// Write side of the interval store, only reachable inside a transaction.
pub trait NodeWriter: NodeReader {
    /// Allocates a fresh id that no committed or pending row uses.
    fn next_id(&mut self) -> TreeResult<NodeId>;

    /// Inserts a new row. Fails with `StoreFailure` if the id is taken.
    fn insert(&mut self, node: Node) -> TreeResult<()>;

    /// Replaces an existing row. Fails with `StoreFailure` if the id is unknown.
    fn update(&mut self, node: Node) -> TreeResult<()>;

    /// Deletes one row, returning it if it existed.
    fn delete(&mut self, id: NodeId) -> TreeResult<Option<Node>>;

    /// Deletes every row whose bounds lie inside `[left_bound, right_bound]`.
    fn delete_range(&mut self, left_bound: Bound, right_bound: Bound) -> TreeResult<Vec<Node>>;

    /// `SET left = left + delta WHERE left > threshold`; returns the rows touched.
    fn shift_left_bounds_above(&mut self, threshold: Bound, delta: Bound) -> TreeResult<u64>;

    /// `SET right = right + delta WHERE right > threshold`; returns the rows touched.
    fn shift_right_bounds_above(&mut self, threshold: Bound, delta: Bound) -> TreeResult<u64>;

    /// Parks the subtree `[left_bound, right_bound]` at non-positive bounds.
    ///
    /// `SET left = -(left - left_bound), right = -(right - left_bound),
    /// level = level + level_delta WHERE left >= left_bound AND right <= right_bound`.
    /// A parked row always has `right < 0`.
    fn detach_range(&mut self, left_bound: Bound, right_bound: Bound, level_delta: i64) -> TreeResult<u64>;

    /// Brings every parked row back at `offset`.
    ///
    /// `SET left = -left + offset, right = -right + offset WHERE right < 0`,
    /// and `parent_id = new_parent_id` for `root_id` only.
    fn attach_detached(&mut self, offset: Bound, root_id: NodeId, new_parent_id: NodeId) -> TreeResult<u64>;
}

/// Lifecycle of a store transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    /// Transaction is accepting reads and writes
    Active,
    /// Commit started, not yet complete
    PartiallyCommitted,
    /// All changes are visible to readers
    Committed,
    /// Commit was rejected; nothing became visible
    Failed,
    /// Transaction was rolled back or dropped uncommitted
    Aborted,
}

/// One unit of work against the store.
///
/// Dropping a transaction without committing discards every pending write.
pub trait StoreTransaction: NodeWriter + Send {
    /// Publishes all pending writes atomically.
    ///
    /// Fails with `ConcurrencyConflict` when another transaction committed
    /// first and the store cannot serialize the two.
    fn commit(self: Box<Self>) -> TreeResult<()>;

    /// Discards all pending writes.
    fn rollback(self: Box<Self>) -> TreeResult<()>;

    fn state(&self) -> TransactionState;
}

/// A record store bound to one table / tenant.
///
/// # Thread Safety
/// Implementers must be `Send + Sync`; the same provider is shared by every
/// clone of a tree handle.
pub trait IntervalStoreProvider: Send + Sync {
    /// The table / tenant this store is bound to.
    fn name(&self) -> String;

    /// Key used to pick this store's tree lock from the lock registry.
    ///
    /// Two providers that share rows must return the same key.
    fn lock_key(&self) -> String;

    /// Starts a transaction.
    fn begin(&self) -> TreeResult<Box<dyn StoreTransaction>>;

    /// A read-only view of the last committed state.
    fn snapshot(&self) -> TreeResult<Box<dyn NodeReader>>;

    fn is_closed(&self) -> bool;

    fn close(&self) -> TreeResult<()>;
}

/// Shared handle to a store provider.
///
/// Cloning is cheap; every clone talks to the same provider.
#[derive(Clone)]
pub struct IntervalStore {
    inner: Arc<dyn IntervalStoreProvider>,
}

impl Deref for IntervalStore {
    type Target = Arc<dyn IntervalStoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl IntervalStore {
    pub fn new<T: IntervalStoreProvider + 'static>(inner: T) -> Self {
        IntervalStore { inner: Arc::new(inner) }
    }

    /// Runs `op` inside one transaction.
    ///
    /// Commits when `op` returns `Ok`, rolls back when it returns `Err`. If
    /// `op` panics the transaction is dropped uncommitted.
    pub fn execute_in_transaction<R>(
        &self,
        op: impl FnOnce(&mut dyn StoreTransaction) -> TreeResult<R>,
    ) -> TreeResult<R> {
        let mut tx = self.inner.begin()?;
        match op(&mut *tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    log::error!(
                        "Rollback on store {} failed after '{}': {}",
                        self.inner.name(),
                        err,
                        rollback_err
                    );
                }
                Err(err)
            }
        }
    }

    /// Runs `op` against one committed snapshot.
    pub fn read<R>(&self, op: impl FnOnce(&dyn NodeReader) -> TreeResult<R>) -> TreeResult<R> {
        let snapshot = self.inner.snapshot()?;
        op(snapshot.as_ref())
    }
}
