use super::rows::NodeRows;
use super::store::InMemoryIntervalStore;
use crate::common::Guarded;
use crate::errors::{ErrorKind, TreeError, TreeResult};
use crate::node::{Bound, Node, NodeId};
use crate::store::{IntervalStoreProvider, NodeReader, NodeWriter, StoreTransaction, TransactionState};

/// A transaction on an [`InMemoryIntervalStore`].
///
/// Works on a private copy of the committed table taken at `begin`. Commit
/// swaps the copy in if the store version has not moved; dropping the
/// transaction without committing discards the copy.
pub struct InMemoryTransaction {
    store: InMemoryIntervalStore,
    base_version: u64,
    rows: NodeRows,
    next_id: NodeId,
    state: TransactionState,
}

impl InMemoryTransaction {
    pub(crate) fn new(
        store: InMemoryIntervalStore,
        rows: NodeRows,
        base_version: u64,
        next_id: NodeId,
    ) -> InMemoryTransaction {
        InMemoryTransaction {
            store,
            base_version,
            rows,
            next_id,
            state: TransactionState::Active,
        }
    }

    fn check_active(&self) -> TreeResult<()> {
        if self.state != TransactionState::Active {
            log::error!("Transaction on {} is {:?}", self.store.name(), self.state);
            return Err(TreeError::new(
                &format!("Transaction is not active: {:?}", self.state),
                ErrorKind::StoreFailure,
            ));
        }
        Ok(())
    }
}

impl NodeReader for InMemoryTransaction {
    fn get_by_id(&self, id: NodeId) -> TreeResult<Option<Node>> {
        self.check_active()?;
        self.rows.get_by_id(id)
    }

    fn get_children(&self, parent_id: NodeId) -> TreeResult<Vec<Node>> {
        self.check_active()?;
        self.rows.get_children(parent_id)
    }

    fn get_range(&self, left_bound: Bound, right_bound: Bound) -> TreeResult<Vec<Node>> {
        self.check_active()?;
        self.rows.get_range(left_bound, right_bound)
    }

    fn get_enclosing(&self, left_bound: Bound, right_bound: Bound) -> TreeResult<Vec<Node>> {
        self.check_active()?;
        self.rows.get_enclosing(left_bound, right_bound)
    }

    fn all(&self) -> TreeResult<Vec<Node>> {
        self.check_active()?;
        self.rows.all()
    }

    fn size(&self) -> TreeResult<u64> {
        self.check_active()?;
        Ok(self.rows.len() as u64)
    }
}

fn id_after(id: NodeId) -> TreeResult<NodeId> {
    id.checked_add(1).ok_or_else(|| {
        log::error!("Node id space exhausted at {}", id);
        TreeError::new(
            &format!("Node id {} leaves no room for further ids", id),
            ErrorKind::ValidationError,
        )
    })
}

impl NodeWriter for InMemoryTransaction {
    fn next_id(&mut self) -> TreeResult<NodeId> {
        self.check_active()?;
        let id = self.next_id;
        self.next_id = id_after(id)?;
        Ok(id)
    }

    fn insert(&mut self, node: Node) -> TreeResult<()> {
        self.check_active()?;
        // ids supplied from outside (import) must never be handed out again
        self.next_id = self.next_id.max(id_after(node.id)?);
        self.rows.insert(node)
    }

    fn update(&mut self, node: Node) -> TreeResult<()> {
        self.check_active()?;
        self.rows.update(node)
    }

    fn delete(&mut self, id: NodeId) -> TreeResult<Option<Node>> {
        self.check_active()?;
        Ok(self.rows.delete(id))
    }

    fn delete_range(&mut self, left_bound: Bound, right_bound: Bound) -> TreeResult<Vec<Node>> {
        self.check_active()?;
        Ok(self.rows.delete_range(left_bound, right_bound))
    }

    fn shift_left_bounds_above(&mut self, threshold: Bound, delta: Bound) -> TreeResult<u64> {
        self.check_active()?;
        self.rows.shift_left_bounds_above(threshold, delta)
    }

    fn shift_right_bounds_above(&mut self, threshold: Bound, delta: Bound) -> TreeResult<u64> {
        self.check_active()?;
        self.rows.shift_right_bounds_above(threshold, delta)
    }

    fn detach_range(&mut self, left_bound: Bound, right_bound: Bound, level_delta: i64) -> TreeResult<u64> {
        self.check_active()?;
        self.rows.detach_range(left_bound, right_bound, level_delta)
    }

    fn attach_detached(&mut self, offset: Bound, root_id: NodeId, new_parent_id: NodeId) -> TreeResult<u64> {
        self.check_active()?;
        self.rows.attach_detached(offset, root_id, new_parent_id)
    }
}

impl StoreTransaction for InMemoryTransaction {
    fn commit(mut self: Box<Self>) -> TreeResult<()> {
        self.check_active()?;
        self.state = TransactionState::PartiallyCommitted;

        let rows = std::mem::take(&mut self.rows);
        let (base_version, next_id) = (self.base_version, self.next_id);
        let result = self
            .store
            .committed()
            .write_with(|state| state.publish(base_version, rows, next_id));

        self.state = match result {
            Ok(_) => TransactionState::Committed,
            Err(_) => TransactionState::Failed,
        };
        result
    }

    fn rollback(mut self: Box<Self>) -> TreeResult<()> {
        self.check_active()?;
        self.state = TransactionState::Aborted;
        Ok(())
    }

    fn state(&self) -> TransactionState {
        self.state
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if self.state == TransactionState::Active {
            log::debug!(
                "Discarding uncommitted transaction on {}",
                self.store.name()
            );
            self.state = TransactionState::Aborted;
        }
    }
}
