use crate::common::{NO_PARENT, ROOT_ID, ROOT_LEFT};
use crate::errors::{ErrorKind, TreeError, TreeResult};
use crate::node::{Bound, Node, NodeId};
use itertools::Itertools;
use std::collections::{HashMap, HashSet};

fn violation(message: String) -> TreeError {
    log::error!("Tree invariant violated: {}", message);
    TreeError::new(&message, ErrorKind::ValidationError)
}

/// Checks a complete set of rows against the nested-set invariants.
///
/// Reports the first violation found as a `ValidationError`:
/// - no node uses the reserved id `NO_PARENT`
/// - exactly one root, with id `ROOT_ID`, at `left = 1`, level 0, position 0
/// - every child strictly inside its parent's interval
/// - `level` equal to the parent's level plus one
/// - sibling positions exactly `0..n`, with intervals disjoint and ordered
///   by position
/// - every bound used once and each interval exactly wide enough for its
///   subtree, so the nodes inside an interval are exactly its descendants
///
/// An empty set of rows is a valid (empty) tree.
pub(crate) fn check_invariants(nodes: &[Node]) -> TreeResult<()> {
    if nodes.is_empty() {
        return Ok(());
    }

    let mut by_id: HashMap<NodeId, &Node> = HashMap::with_capacity(nodes.len());
    for node in nodes {
        if node.id == NO_PARENT {
            return Err(violation(format!(
                "Node id {} is reserved for \"no parent\"",
                NO_PARENT
            )));
        }
        if by_id.insert(node.id, node).is_some() {
            return Err(violation(format!("Node id {} appears more than once", node.id)));
        }
        if node.left >= node.right {
            return Err(violation(format!(
                "Node {} has left {} not below right {}",
                node.id, node.left, node.right
            )));
        }
    }

    let mut bounds: HashSet<Bound> = HashSet::with_capacity(nodes.len() * 2);
    for node in nodes {
        if !bounds.insert(node.left) || !bounds.insert(node.right) {
            return Err(violation(format!("Node {} shares a bound with another node", node.id)));
        }
    }

    let roots = nodes.iter().filter(|n| n.parent_id == NO_PARENT).collect_vec();
    let root = match roots.as_slice() {
        [root] => *root,
        [] => return Err(violation("Tree has no root".to_string())),
        _ => {
            return Err(violation(format!(
                "Tree has {} roots: {:?}",
                roots.len(),
                roots.iter().map(|r| r.id).collect_vec()
            )))
        }
    };
    if root.id != ROOT_ID {
        return Err(violation(format!(
            "Root has id {} but the root id is {}",
            root.id, ROOT_ID
        )));
    }
    if root.left != ROOT_LEFT || root.level != 0 || root.position != 0 {
        return Err(violation(format!(
            "Root {} must start at left {} with level 0 and position 0",
            root.id, ROOT_LEFT
        )));
    }

    for node in nodes.iter().filter(|n| n.parent_id != NO_PARENT) {
        let parent = match by_id.get(&node.parent_id) {
            Some(parent) => *parent,
            None => {
                return Err(violation(format!(
                    "Node {} references missing parent {}",
                    node.id, node.parent_id
                )))
            }
        };
        if !(parent.left < node.left && node.right < parent.right) {
            return Err(violation(format!(
                "Node {} [{}, {}] is not inside its parent {} [{}, {}]",
                node.id, node.left, node.right, parent.id, parent.left, parent.right
            )));
        }
        if node.level != parent.level + 1 {
            return Err(violation(format!(
                "Node {} has level {} under parent {} at level {}",
                node.id, node.level, parent.id, parent.level
            )));
        }
    }

    let families = nodes
        .iter()
        .filter(|n| n.parent_id != NO_PARENT)
        .into_group_map_by(|n| n.parent_id);
    for (parent_id, children) in families.iter().sorted_by_key(|(id, _)| **id) {
        let ordered = children.iter().sorted_by_key(|c| c.position).collect_vec();
        for (expected, child) in ordered.iter().enumerate() {
            if child.position as usize != expected {
                return Err(violation(format!(
                    "Children of {} are not densely positioned: node {} has position {}, expected {}",
                    parent_id, child.id, child.position, expected
                )));
            }
        }
        for (before, after) in ordered.iter().tuple_windows() {
            if before.right >= after.left {
                return Err(violation(format!(
                    "Siblings {} and {} under {} overlap or are out of order",
                    before.id, after.id, parent_id
                )));
            }
        }
    }

    // levels strictly increase down every parent chain, so folding deepest
    // first sees each subtree complete before its root
    let mut subtree_size: HashMap<NodeId, u64> = nodes.iter().map(|n| (n.id, 1)).collect();
    for node in nodes.iter().sorted_by_key(|n| std::cmp::Reverse(n.level)) {
        let size = subtree_size.get(&node.id).copied().unwrap_or(1);
        let expected_width = (size * 2) as Bound;
        if node.width() != expected_width {
            return Err(violation(format!(
                "Node {} spans [{}, {}] but has {} nodes in its subtree",
                node.id, node.left, node.right, size
            )));
        }
        if node.parent_id != NO_PARENT {
            if let Some(parent_size) = subtree_size.get_mut(&node.parent_id) {
                *parent_size += size;
            }
        }
    }

    Ok(())
}
