use crate::common::{atomic, Atomic, Guarded, LockHandle};
use crate::errors::{ErrorKind, TreeError, TreeResult};
use crate::node::{Node, NodeId, Payload};
use crate::store::{IntervalStore, IntervalStoreProvider, NodeReader, StoreTransaction};
use crate::tree::engine::{self, require};
use crate::tree::validate;
use crate::tree::{
    NodeSearch, SearchPage, SubscriberRef, TreeEventInfo, TreeEventListener, TreeEvents,
};
use crate::tree_builder::TreeBuilder;
use crate::tree_config::TreeConfig;
use crate::TREE_LOCKS;
use indexmap::IndexMap;
use parking_lot::RwLockWriteGuard;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A hierarchy stored as nested intervals in one interval store.
///
/// Every structural operation (`create_root`, `insert_child`, `delete`,
/// `move_node`, `copy_node`, `update_payload`, `import`) runs under the
/// tree lock inside a single store transaction: it either commits as a
/// whole or leaves the store untouched. Reads take no lock; each one sees a
/// single committed snapshot.
///
/// `NestedTree` is cheap to clone, and all clones share the same store,
/// lock and listeners.
///
/// # Examples
///
/// ```rust
/// use nestree::nested_tree::NestedTree;
/// use nestree::store::memory::InMemoryStoreConfig;
///
/// let tree = NestedTree::builder()
///     .open_in_memory(InMemoryStoreConfig::new())
///     .unwrap();
/// let root = tree.create_root("root").unwrap();
/// let docs = tree.insert_child(root.id, "docs", None).unwrap();
/// tree.insert_child(docs.id, "readme", None).unwrap();
///
/// assert_eq!(tree.descendants(root.id).unwrap().len(), 2);
/// assert_eq!(tree.ancestors(docs.id).unwrap()[0].id, root.id);
/// ```
#[derive(Clone)]
pub struct NestedTree {
    inner: Arc<NestedTreeInner>,
}

impl NestedTree {
    pub fn builder() -> TreeBuilder {
        TreeBuilder::new()
    }

    pub(crate) fn new(store: IntervalStore, tree_config: TreeConfig) -> TreeResult<Self> {
        if store.is_closed() {
            log::error!("Cannot open a tree on closed store {}", store.name());
            return Err(TreeError::new(
                &format!("Store {} is closed", store.name()),
                ErrorKind::StoreFailure,
            ));
        }
        tree_config.freeze();
        let lock = TREE_LOCKS.get_lock(&store.lock_key());
        log::debug!("Opened tree on store {}", store.name());
        Ok(NestedTree {
            inner: Arc::new(NestedTreeInner {
                store,
                tree_config,
                lock,
                listeners: atomic(IndexMap::new()),
                next_subscriber: AtomicU64::new(1),
            }),
        })
    }

    pub fn store(&self) -> &IntervalStore {
        &self.inner.store
    }

    pub fn config(&self) -> &TreeConfig {
        &self.inner.tree_config
    }

    /// Creates the root node. Fails with `InvalidOperation` unless the
    /// store is empty.
    pub fn create_root(&self, payload: impl Into<Payload>) -> TreeResult<Node> {
        let payload = payload.into();
        let root = self
            .inner
            .write("create root", |tx| engine::create_root(tx, payload.clone()))?;
        self.inner.publish(TreeEvents::RootCreated, vec![root.id]);
        Ok(root)
    }

    /// Adds a leaf under `parent_id`, appended or at an explicit sibling
    /// position.
    pub fn insert_child(
        &self,
        parent_id: NodeId,
        payload: impl Into<Payload>,
        position: Option<u32>,
    ) -> TreeResult<Node> {
        let payload = payload.into();
        let node = self.inner.write("insert child", |tx| {
            engine::insert_child(tx, parent_id, payload.clone(), position)
        })?;
        self.inner.publish(TreeEvents::Inserted, vec![node.id]);
        Ok(node)
    }

    /// Removes a node with its whole subtree and returns the removed rows
    /// in document order. Deleting the root empties the tree.
    pub fn delete(&self, node_id: NodeId) -> TreeResult<Vec<Node>> {
        let removed = self
            .inner
            .write("delete", |tx| engine::delete(tx, node_id))?;
        self.inner
            .publish(TreeEvents::Deleted, removed.iter().map(|n| n.id).collect());
        Ok(removed)
    }

    /// Moves a subtree under `new_parent_id`. Moving within the same parent
    /// reorders siblings.
    pub fn move_node(
        &self,
        node_id: NodeId,
        new_parent_id: NodeId,
        position: Option<u32>,
    ) -> TreeResult<Node> {
        let moved = self.inner.write("move", |tx| {
            engine::move_node(tx, node_id, new_parent_id, position)
        })?;
        self.inner.publish(TreeEvents::Moved, vec![moved.id]);
        Ok(moved)
    }

    /// Duplicates a subtree under `target_parent_id` and returns the root
    /// of the copy.
    pub fn copy_node(
        &self,
        node_id: NodeId,
        target_parent_id: NodeId,
        position: Option<u32>,
    ) -> TreeResult<Node> {
        let copy = self.inner.write("copy", |tx| {
            engine::copy_node(tx, node_id, target_parent_id, position)
        })?;
        self.inner.publish(TreeEvents::Copied, vec![copy.id]);
        Ok(copy)
    }

    pub fn update_payload(&self, node_id: NodeId, payload: impl Into<Payload>) -> TreeResult<Node> {
        let payload = payload.into();
        let node = self.inner.write("update payload", |tx| {
            engine::update_payload(tx, node_id, payload.clone())
        })?;
        self.inner.publish(TreeEvents::Updated, vec![node.id]);
        Ok(node)
    }

    /// Restores a full snapshot (for instance the output of
    /// [`all_nodes`](Self::all_nodes)) into an empty store.
    ///
    /// The rows are validated first; any invariant violation fails with
    /// `ValidationError` and nothing is written.
    pub fn import(&self, nodes: Vec<Node>) -> TreeResult<u64> {
        let ids = nodes.iter().map(|n| n.id).collect();
        let count = self
            .inner
            .write("import", |tx| engine::import(tx, nodes.clone()))?;
        self.inner.publish(TreeEvents::Imported, ids);
        Ok(count)
    }

    pub fn get(&self, node_id: NodeId) -> TreeResult<Node> {
        self.inner.store.read(|reader| require(reader, node_id))
    }

    /// Direct children ordered by position.
    pub fn children(&self, parent_id: NodeId) -> TreeResult<Vec<Node>> {
        self.inner.store.read(|reader| {
            require(reader, parent_id)?;
            reader.get_children(parent_id)
        })
    }

    /// Every node strictly inside `node_id`'s interval, in document order.
    pub fn descendants(&self, node_id: NodeId) -> TreeResult<Vec<Node>> {
        self.inner.store.read(|reader| {
            let node = require(reader, node_id)?;
            if node.is_leaf() {
                return Ok(vec![]);
            }
            reader.get_range(node.left + 1, node.right - 1)
        })
    }

    /// Every node whose interval strictly contains `node_id`'s, root first.
    pub fn ancestors(&self, node_id: NodeId) -> TreeResult<Vec<Node>> {
        self.inner.store.read(|reader| {
            let node = require(reader, node_id)?;
            reader.get_enclosing(node.left, node.right)
        })
    }

    /// Every node in document order.
    pub fn all_nodes(&self) -> TreeResult<Vec<Node>> {
        self.inner.store.read(|reader| reader.all())
    }

    pub fn size(&self) -> TreeResult<u64> {
        self.inner.store.read(|reader| reader.size())
    }

    pub fn search(&self, search: &NodeSearch) -> TreeResult<SearchPage> {
        self.inner.store.read(|reader| search.apply(reader.all()?))
    }

    /// Number of nodes matching `search`, ignoring its paging.
    pub fn count(&self, search: &NodeSearch) -> TreeResult<u64> {
        self.inner
            .store
            .read(|reader| Ok(search.count(&reader.all()?)))
    }

    /// Checks the committed rows against every tree invariant.
    pub fn verify(&self) -> TreeResult<()> {
        self.inner
            .store
            .read(|reader| validate::check_invariants(&reader.all()?))
    }

    pub fn subscribe(&self, listener: TreeEventListener) -> SubscriberRef {
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .write_with(|listeners| listeners.insert(id, listener));
        SubscriberRef::new(id)
    }

    pub fn unsubscribe(&self, subscriber: SubscriberRef) -> TreeResult<()> {
        let removed = self
            .inner
            .listeners
            .write_with(|listeners| listeners.shift_remove(&subscriber.id()));
        match removed {
            Some(_) => Ok(()),
            None => {
                log::error!("No subscriber with id {}", subscriber.id());
                Err(TreeError::new(
                    &format!("No subscriber with id {}", subscriber.id()),
                    ErrorKind::NotFound,
                ))
            }
        }
    }

    /// Closes the underlying store. Every clone of this tree stops working.
    pub fn close(&self) -> TreeResult<()> {
        let _guard = self.inner.lock.write();
        self.inner.store.close()?;
        TREE_LOCKS.remove_lock(&self.inner.store.lock_key());
        self.inner.listeners.write_with(|listeners| listeners.clear());
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.store.is_closed()
    }
}

struct NestedTreeInner {
    store: IntervalStore,
    tree_config: TreeConfig,
    lock: LockHandle,
    listeners: Atomic<IndexMap<u64, TreeEventListener>>,
    next_subscriber: AtomicU64,
}

impl NestedTreeInner {
    fn acquire_lock(&self, operation: &str) -> TreeResult<RwLockWriteGuard<'_, ()>> {
        match self.tree_config.lock_timeout() {
            None => Ok(self.lock.write()),
            Some(timeout) => self.lock.write_for(timeout).ok_or_else(|| {
                log::error!(
                    "Timed out after {:?} waiting for tree lock on {} ({})",
                    timeout,
                    self.store.name(),
                    operation
                );
                TreeError::new(
                    &format!(
                        "Timed out waiting for tree lock on {} after {:?}",
                        self.store.name(),
                        timeout
                    ),
                    ErrorKind::ConcurrencyConflict,
                )
            }),
        }
    }

    /// Runs one structural operation under the tree lock.
    ///
    /// Each attempt is its own transaction. A store conflict is retried once
    /// from a fresh read when the configuration allows it; a lock timeout is
    /// never retried.
    fn write<R>(
        &self,
        operation: &str,
        mut op: impl FnMut(&mut dyn StoreTransaction) -> TreeResult<R>,
    ) -> TreeResult<R> {
        let _guard = self.acquire_lock(operation)?;
        let max_attempts = if self.tree_config.retry_on_conflict() { 2 } else { 1 };
        let verify = self.tree_config.verify_after_write();

        let mut attempt = 1;
        loop {
            let result = self.store.execute_in_transaction(|tx| {
                let value = op(tx)?;
                if verify {
                    validate::check_invariants(&tx.all()?)?;
                }
                Ok(value)
            });

            match result {
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    log::warn!(
                        "{} on {} hit a conflict, retrying: {}",
                        operation,
                        self.store.name(),
                        err
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Notifies listeners of a committed change. Listener failures are
    /// logged and never affect the operation.
    fn publish(&self, event: TreeEvents, node_ids: Vec<NodeId>) {
        let listeners: Vec<TreeEventListener> = self
            .listeners
            .read_with(|listeners| listeners.values().cloned().collect());
        if listeners.is_empty() {
            return;
        }

        let info = TreeEventInfo::new(event, node_ids, self.store.name());
        for listener in listeners {
            if let Err(err) = listener.notify(info.clone()) {
                log::error!("Tree event listener failed on {:?}: {}", info.event_type(), err);
            }
        }
    }
}
