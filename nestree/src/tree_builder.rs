use crate::errors::{TreeError, TreeResult};
use crate::nested_tree::NestedTree;
use crate::store::memory::{InMemoryIntervalStore, InMemoryStoreConfig};
use crate::store::IntervalStore;
use crate::tree_config::TreeConfig;
use std::time::Duration;

/// Fluent builder for [`NestedTree`].
///
/// The first invalid setting is remembered and returned from `open`, so a
/// chain of setters never needs intermediate error handling.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use nestree::nested_tree::NestedTree;
/// use nestree::store::memory::InMemoryStoreConfig;
/// use nestree::store::IntervalStoreProvider;
///
/// let tree = NestedTree::builder()
///     .lock_timeout(Duration::from_secs(2))
///     .retry_on_conflict(true)
///     .open_in_memory(InMemoryStoreConfig::new().table_name("t_req_1"))
///     .unwrap();
/// assert_eq!(tree.store().name(), "t_req_1");
/// ```
#[derive(Default)]
pub struct TreeBuilder {
    error: Option<TreeError>,
    tree_config: TreeConfig,
}

impl TreeBuilder {
    pub fn new() -> Self {
        TreeBuilder {
            error: None,
            tree_config: TreeConfig::new(),
        }
    }

    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.tree_config.set_lock_timeout(timeout) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn retry_on_conflict(mut self, retry: bool) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.tree_config.set_retry_on_conflict(retry) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn verify_after_write(mut self, verify: bool) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.tree_config.set_verify_after_write(verify) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Opens a tree on an existing store handle.
    ///
    /// Trees opened on handles to the same provider share one tree lock.
    pub fn open(self, store: IntervalStore) -> TreeResult<NestedTree> {
        if let Some(error) = self.error {
            return Err(error);
        }
        NestedTree::new(store, self.tree_config)
    }

    /// Opens a tree on a fresh in-memory store.
    pub fn open_in_memory(self, store_config: InMemoryStoreConfig) -> TreeResult<NestedTree> {
        self.open(IntervalStore::new(InMemoryIntervalStore::new(store_config)))
    }
}
