//! Nested-set tree algebra.
//!
//! Every function here runs inside one store transaction and reads only
//! what it needs from that transaction. Nothing is cached between calls, so
//! a retried operation always starts from a fresh read.

use super::reconciler;
use super::validate;
use crate::common::{LEAF_WIDTH, NO_PARENT, ROOT_ID, ROOT_LEFT};
use crate::errors::{ErrorKind, TreeError, TreeResult};
use crate::node::{Bound, Node, NodeId, Payload};
use crate::store::{NodeReader, NodeWriter};
use chrono::Utc;
use std::collections::HashMap;

/// Reads `id` or fails with `NotFound`.
pub(crate) fn require<R: NodeReader + ?Sized>(reader: &R, id: NodeId) -> TreeResult<Node> {
    match reader.get_by_id(id)? {
        Some(node) => Ok(node),
        None => {
            log::error!("Node {} not found", id);
            Err(TreeError::new(
                &format!("Node {} not found", id),
                ErrorKind::NotFound,
            ))
        }
    }
}

fn invalid(message: String) -> TreeError {
    log::error!("{}", message);
    TreeError::new(&message, ErrorKind::InvalidOperation)
}

/// The bound a new block of rows starts at under `parent`.
///
/// Appending lands just inside the parent's right bound. An explicit position
/// lands on the left bound of the sibling that currently holds it, so the
/// sibling and everything after it slide right.
fn insertion_point(parent: &Node, siblings: &[Node], requested: Option<u32>) -> Bound {
    match requested.and_then(|position| siblings.get(position as usize)) {
        Some(sibling) => sibling.left,
        None => parent.right,
    }
}

/// Makes `width` free bounds starting at `at`.
fn open_gap<W: NodeWriter + ?Sized>(tx: &mut W, at: Bound, width: Bound) -> TreeResult<()> {
    tx.shift_left_bounds_above(at - 1, width)?;
    tx.shift_right_bounds_above(at - 1, width)?;
    Ok(())
}

/// Removes the `width` bounds that ended at `right`.
fn close_gap<W: NodeWriter + ?Sized>(tx: &mut W, right: Bound, width: Bound) -> TreeResult<()> {
    tx.shift_left_bounds_above(right, -width)?;
    tx.shift_right_bounds_above(right, -width)?;
    Ok(())
}

fn new_node(id: NodeId, parent: Option<&Node>, left: Bound, position: u32, payload: Payload) -> Node {
    Node {
        id,
        parent_id: parent.map(|p| p.id).unwrap_or(NO_PARENT),
        left,
        right: left + LEAF_WIDTH - 1,
        level: parent.map(|p| p.level + 1).unwrap_or(0),
        position,
        payload,
        created_at: Utc::now(),
    }
}

pub(crate) fn create_root<W: NodeWriter + ?Sized>(tx: &mut W, payload: Payload) -> TreeResult<Node> {
    let size = tx.size()?;
    if size > 0 {
        return Err(invalid(format!(
            "Cannot create a root: the store already holds {} nodes",
            size
        )));
    }

    let root = new_node(ROOT_ID, None, ROOT_LEFT, 0, payload);
    tx.insert(root.clone())?;
    log::debug!("Created root {}", root.id);
    Ok(root)
}

pub(crate) fn insert_child<W: NodeWriter + ?Sized>(
    tx: &mut W,
    parent_id: NodeId,
    payload: Payload,
    position: Option<u32>,
) -> TreeResult<Node> {
    let parent = require(&*tx, parent_id)?;
    let siblings = reconciler::siblings(&*tx, parent_id, None)?;
    reconciler::check_position(parent_id, position, siblings.len())?;

    let at = insertion_point(&parent, &siblings, position);
    open_gap(tx, at, LEAF_WIDTH)?;
    let position = reconciler::make_room(tx, parent_id, position, None)?;

    let id = tx.next_id()?;
    let node = new_node(id, Some(&parent), at, position, payload);
    tx.insert(node.clone())?;
    log::debug!(
        "Inserted node {} under {} at [{}, {}] position {}",
        node.id,
        parent_id,
        node.left,
        node.right,
        node.position
    );
    Ok(node)
}

/// Removes `node_id` and its whole subtree, returning the removed rows
/// ordered by `left`.
pub(crate) fn delete<W: NodeWriter + ?Sized>(tx: &mut W, node_id: NodeId) -> TreeResult<Vec<Node>> {
    let node = require(&*tx, node_id)?;
    let width = node.width();

    let removed = if node.is_leaf() {
        tx.delete(node.id)?.into_iter().collect()
    } else {
        tx.delete_range(node.left, node.right)?
    };

    if !node.is_root() {
        close_gap(tx, node.right, width)?;
        reconciler::compact(tx, &node)?;
    }

    log::debug!(
        "Deleted node {} and {} descendants",
        node.id,
        removed.len().saturating_sub(1)
    );
    Ok(removed)
}

/// Relocates the subtree rooted at `node_id` under `new_parent_id`.
///
/// The subtree is parked at non-positive bounds while the rest of the tree
/// is relabeled, then brought back at the new insertion point. Widths never
/// change, so the root's interval is the same before and after.
pub(crate) fn move_node<W: NodeWriter + ?Sized>(
    tx: &mut W,
    node_id: NodeId,
    new_parent_id: NodeId,
    position: Option<u32>,
) -> TreeResult<Node> {
    let node = require(&*tx, node_id)?;
    if node.is_root() {
        return Err(invalid(format!("Cannot move the root node {}", node_id)));
    }
    if new_parent_id == node_id {
        return Err(invalid(format!("Cannot move node {} under itself", node_id)));
    }
    let new_parent = require(&*tx, new_parent_id)?;
    if node.is_ancestor_of(&new_parent) {
        return Err(invalid(format!(
            "Cannot move node {} under its own descendant {}",
            node_id, new_parent_id
        )));
    }
    let target_siblings = reconciler::siblings(&*tx, new_parent_id, Some(node_id))?;
    reconciler::check_position(new_parent_id, position, target_siblings.len())?;

    let width = node.width();
    let level_delta = i64::from(new_parent.level) + 1 - i64::from(node.level);

    reconciler::compact(tx, &node)?;

    // 1. park the subtree
    tx.detach_range(node.left, node.right, level_delta)?;
    // 2. close the hole it left
    close_gap(tx, node.right, width)?;
    // 3. open space at the insertion point, computed after the closure
    let new_parent = require(&*tx, new_parent_id)?;
    let target_siblings = reconciler::siblings(&*tx, new_parent_id, Some(node_id))?;
    let at = insertion_point(&new_parent, &target_siblings, position);
    open_gap(tx, at, width)?;
    // 4. bring it back
    tx.attach_detached(at, node_id, new_parent_id)?;

    let position = reconciler::make_room(tx, new_parent_id, position, Some(node_id))?;
    let mut moved = require(&*tx, node_id)?;
    moved.position = position;
    tx.update(moved.clone())?;

    log::debug!(
        "Moved node {} from parent {} to parent {} at [{}, {}] position {}",
        node_id,
        node.parent_id,
        new_parent_id,
        moved.left,
        moved.right,
        moved.position
    );
    Ok(moved)
}

/// Duplicates the subtree rooted at `node_id` under `target_parent_id` and
/// returns the copy's root.
///
/// The source rows are read once, before anything is written, so copying a
/// node into its own subtree copies the original shape exactly once.
pub(crate) fn copy_node<W: NodeWriter + ?Sized>(
    tx: &mut W,
    node_id: NodeId,
    target_parent_id: NodeId,
    position: Option<u32>,
) -> TreeResult<Node> {
    let source = require(&*tx, node_id)?;
    if target_parent_id == node_id {
        return Err(invalid(format!("Cannot copy node {} into itself", node_id)));
    }
    require(&*tx, target_parent_id)?;

    let subtree = tx.get_range(source.left, source.right)?;
    let root_copy = insert_child(tx, target_parent_id, source.payload.clone(), position)?;

    let mut translated: HashMap<NodeId, NodeId> = HashMap::with_capacity(subtree.len());
    translated.insert(source.id, root_copy.id);

    for original in subtree.iter().filter(|n| n.id != source.id) {
        let parent_copy = match translated.get(&original.parent_id) {
            Some(id) => *id,
            None => {
                log::error!(
                    "Parent {} of node {} was not copied before its child",
                    original.parent_id,
                    original.id
                );
                return Err(TreeError::new(
                    &format!(
                        "Subtree of node {} is inconsistent at node {}",
                        node_id, original.id
                    ),
                    ErrorKind::InternalError,
                ));
            }
        };
        let copy = insert_child(tx, parent_copy, original.payload.clone(), None)?;
        translated.insert(original.id, copy.id);
    }

    log::debug!(
        "Copied {} nodes from {} under {} as {}",
        subtree.len(),
        node_id,
        target_parent_id,
        root_copy.id
    );
    require(&*tx, root_copy.id)
}

pub(crate) fn update_payload<W: NodeWriter + ?Sized>(
    tx: &mut W,
    node_id: NodeId,
    payload: Payload,
) -> TreeResult<Node> {
    let mut node = require(&*tx, node_id)?;
    node.payload = payload;
    tx.update(node.clone())?;
    Ok(node)
}

/// Restores a complete tree into an empty store.
pub(crate) fn import<W: NodeWriter + ?Sized>(tx: &mut W, nodes: Vec<Node>) -> TreeResult<u64> {
    let size = tx.size()?;
    if size > 0 {
        return Err(invalid(format!(
            "Cannot import into a store that already holds {} nodes",
            size
        )));
    }
    validate::check_invariants(&nodes)?;

    let count = nodes.len() as u64;
    for node in nodes {
        tx.insert(node)?;
    }
    log::debug!("Imported {} nodes", count);
    Ok(count)
}
