use super::rows::NodeRows;
use super::transaction::InMemoryTransaction;
use crate::common::{atomic, Atomic, Guarded};
use crate::errors::{ErrorKind, TreeError, TreeResult};
use crate::node::NodeId;
use crate::store::memory::config::InMemoryStoreConfig;
use crate::store::{IntervalStoreProvider, NodeReader, StoreTransaction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// In-memory implementation of the interval store.
///
/// # Characteristics
/// - **Snapshot reads**: readers get an O(1) clone of the committed table and
///   never observe a half-applied operation
/// - **Optimistic commit**: a transaction publishes only if no other
///   transaction committed since it began, otherwise `ConcurrencyConflict`
/// - **No persistence**: all rows are lost when the last handle is dropped
///
/// # Usage
/// ```text
/// let store = IntervalStore::new(InMemoryIntervalStore::new(InMemoryStoreConfig::new()));
/// let size = store.read(|reader| reader.size())?;
/// ```
#[derive(Clone)]
pub struct InMemoryIntervalStore {
    inner: Arc<InMemoryStoreInner>,
}

impl InMemoryIntervalStore {
    pub fn new(store_config: InMemoryStoreConfig) -> InMemoryIntervalStore {
        InMemoryIntervalStore {
            inner: Arc::new(InMemoryStoreInner::new(store_config)),
        }
    }

    /// Number of commits published so far.
    pub fn version(&self) -> u64 {
        self.inner.state.read_with(|state| state.version)
    }

    pub fn config(&self) -> &InMemoryStoreConfig {
        &self.inner.store_config
    }

    pub(crate) fn committed(&self) -> Atomic<CommittedState> {
        self.inner.state.clone()
    }
}

impl IntervalStoreProvider for InMemoryIntervalStore {
    fn name(&self) -> String {
        self.inner.store_config.get_table_name().to_string()
    }

    fn lock_key(&self) -> String {
        self.inner.lock_key.clone()
    }

    fn begin(&self) -> TreeResult<Box<dyn StoreTransaction>> {
        self.inner.check_opened()?;
        let (rows, version, next_id) = self
            .inner
            .state
            .read_with(|state| (state.rows.clone(), state.version, state.next_id));
        Ok(Box::new(InMemoryTransaction::new(
            self.clone(),
            rows,
            version,
            next_id,
        )))
    }

    fn snapshot(&self) -> TreeResult<Box<dyn NodeReader>> {
        self.inner.check_opened()?;
        let rows = self.inner.state.read_with(|state| state.rows.clone());
        Ok(Box::new(rows))
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn close(&self) -> TreeResult<()> {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            log::debug!("In-memory store {} closed", self.name());
        }
        Ok(())
    }
}

/// The last committed table plus the bookkeeping optimistic commits need.
pub(crate) struct CommittedState {
    pub(crate) rows: NodeRows,
    pub(crate) version: u64,
    pub(crate) next_id: NodeId,
}

impl CommittedState {
    /// Publishes `rows` if nothing was committed since `base_version`.
    pub(crate) fn publish(&mut self, base_version: u64, rows: NodeRows, next_id: NodeId) -> TreeResult<()> {
        if self.version != base_version {
            log::error!(
                "Commit rejected: store moved from version {} to {}",
                base_version,
                self.version
            );
            return Err(TreeError::new(
                &format!(
                    "Store was modified concurrently (version {} != {})",
                    self.version, base_version
                ),
                ErrorKind::ConcurrencyConflict,
            ));
        }
        self.rows = rows;
        self.next_id = self.next_id.max(next_id);
        self.version += 1;
        Ok(())
    }
}

struct InMemoryStoreInner {
    store_config: InMemoryStoreConfig,
    lock_key: String,
    state: Atomic<CommittedState>,
    closed: AtomicBool,
}

impl InMemoryStoreInner {
    fn new(store_config: InMemoryStoreConfig) -> InMemoryStoreInner {
        let lock_key = format!("{}:{}", store_config.get_table_name(), Uuid::new_v4());
        InMemoryStoreInner {
            store_config,
            lock_key,
            state: atomic(CommittedState {
                rows: NodeRows::default(),
                version: 0,
                next_id: 1,
            }),
            closed: AtomicBool::new(false),
        }
    }

    fn check_opened(&self) -> TreeResult<()> {
        if self.closed.load(Ordering::Acquire) {
            log::error!("Store {} is closed", self.store_config.get_table_name());
            return Err(TreeError::new(
                &format!("Store {} is closed", self.store_config.get_table_name()),
                ErrorKind::StoreFailure,
            ));
        }
        Ok(())
    }
}
