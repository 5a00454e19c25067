use crate::errors::{ErrorKind, TreeError, TreeResult};
use crate::node::{Bound, Node, NodeId};
use crate::store::NodeReader;
use im::OrdMap;

/// The row table of the in-memory store.
///
/// Backed by a persistent ordered map, so cloning the table for a snapshot
/// or a transaction is O(1) and writes never disturb earlier clones.
#[derive(Clone, Default)]
pub(crate) struct NodeRows {
    rows: OrdMap<NodeId, Node>,
}

#[inline]
fn shifted(bound: Bound, delta: Bound) -> TreeResult<Bound> {
    bound.checked_add(delta).ok_or_else(|| {
        log::error!("Bound {} overflowed when shifted by {}", bound, delta);
        TreeError::new(
            &format!("Bound {} overflowed when shifted by {}", bound, delta),
            ErrorKind::InternalError,
        )
    })
}

fn ordered_by_left(mut nodes: Vec<Node>) -> Vec<Node> {
    nodes.sort_by_key(|node| node.left);
    nodes
}

impl NodeRows {
    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    fn select(&self, predicate: impl Fn(&Node) -> bool) -> Vec<Node> {
        self.rows
            .values()
            .filter(|node| predicate(node))
            .cloned()
            .collect()
    }

    fn ids_where(&self, predicate: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        self.rows
            .values()
            .filter(|node| predicate(node))
            .map(|node| node.id)
            .collect()
    }

    fn modify(&mut self, ids: &[NodeId], f: impl Fn(&mut Node) -> TreeResult<()>) -> TreeResult<u64> {
        for id in ids {
            if let Some(node) = self.rows.get_mut(id) {
                f(node)?;
            }
        }
        Ok(ids.len() as u64)
    }

    pub(crate) fn insert(&mut self, node: Node) -> TreeResult<()> {
        if self.rows.contains_key(&node.id) {
            log::error!("Duplicate node id {}", node.id);
            return Err(TreeError::new(
                &format!("Node id {} already exists", node.id),
                ErrorKind::StoreFailure,
            ));
        }
        self.rows.insert(node.id, node);
        Ok(())
    }

    pub(crate) fn update(&mut self, node: Node) -> TreeResult<()> {
        if !self.rows.contains_key(&node.id) {
            log::error!("Update of unknown node id {}", node.id);
            return Err(TreeError::new(
                &format!("Cannot update node {}: no such row", node.id),
                ErrorKind::StoreFailure,
            ));
        }
        self.rows.insert(node.id, node);
        Ok(())
    }

    pub(crate) fn delete(&mut self, id: NodeId) -> Option<Node> {
        self.rows.remove(&id)
    }

    pub(crate) fn delete_range(&mut self, left_bound: Bound, right_bound: Bound) -> Vec<Node> {
        let ids = self.ids_where(|node| node.left >= left_bound && node.right <= right_bound);
        let removed = ids.iter().filter_map(|id| self.rows.remove(id)).collect();
        ordered_by_left(removed)
    }

    pub(crate) fn shift_left_bounds_above(&mut self, threshold: Bound, delta: Bound) -> TreeResult<u64> {
        let ids = self.ids_where(|node| node.left > threshold);
        self.modify(&ids, |node| {
            node.left = shifted(node.left, delta)?;
            Ok(())
        })
    }

    pub(crate) fn shift_right_bounds_above(&mut self, threshold: Bound, delta: Bound) -> TreeResult<u64> {
        let ids = self.ids_where(|node| node.right > threshold);
        self.modify(&ids, |node| {
            node.right = shifted(node.right, delta)?;
            Ok(())
        })
    }

    pub(crate) fn detach_range(&mut self, left_bound: Bound, right_bound: Bound, level_delta: i64) -> TreeResult<u64> {
        let ids = self.ids_where(|node| node.left >= left_bound && node.right <= right_bound);
        self.modify(&ids, |node| {
            node.left = -(node.left - left_bound);
            node.right = -(node.right - left_bound);
            node.level = u32::try_from(i64::from(node.level) + level_delta)?;
            Ok(())
        })
    }

    pub(crate) fn attach_detached(&mut self, offset: Bound, root_id: NodeId, new_parent_id: NodeId) -> TreeResult<u64> {
        let ids = self.ids_where(|node| node.right < 0);
        self.modify(&ids, |node| {
            node.left = shifted(-node.left, offset)?;
            node.right = shifted(-node.right, offset)?;
            if node.id == root_id {
                node.parent_id = new_parent_id;
            }
            Ok(())
        })
    }
}

impl NodeReader for NodeRows {
    fn get_by_id(&self, id: NodeId) -> TreeResult<Option<Node>> {
        Ok(self.rows.get(&id).cloned())
    }

    fn get_children(&self, parent_id: NodeId) -> TreeResult<Vec<Node>> {
        let mut children = self.select(|node| node.parent_id == parent_id);
        children.sort_by_key(|node| (node.position, node.left));
        Ok(children)
    }

    fn get_range(&self, left_bound: Bound, right_bound: Bound) -> TreeResult<Vec<Node>> {
        Ok(ordered_by_left(self.select(|node| {
            node.left >= left_bound && node.right <= right_bound
        })))
    }

    fn get_enclosing(&self, left_bound: Bound, right_bound: Bound) -> TreeResult<Vec<Node>> {
        Ok(ordered_by_left(self.select(|node| {
            node.left < left_bound && node.right > right_bound
        })))
    }

    fn all(&self) -> TreeResult<Vec<Node>> {
        Ok(ordered_by_left(self.rows.values().cloned().collect()))
    }

    fn size(&self) -> TreeResult<u64> {
        Ok(self.rows.len() as u64)
    }
}
