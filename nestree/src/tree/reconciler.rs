//! Dense, zero-based sibling positions.
//!
//! Positions are bookkeeping next to the bounds: the engine relabels
//! intervals, the reconciler keeps `position` equal to each child's rank
//! under its parent.

use crate::errors::{ErrorKind, TreeError, TreeResult};
use crate::node::{Node, NodeId};
use crate::store::{NodeReader, NodeWriter};

/// Children of `parent_id` in position order, without `exclude`.
pub(crate) fn siblings<R: NodeReader + ?Sized>(
    reader: &R,
    parent_id: NodeId,
    exclude: Option<NodeId>,
) -> TreeResult<Vec<Node>> {
    let mut children = reader.get_children(parent_id)?;
    if let Some(excluded) = exclude {
        children.retain(|child| child.id != excluded);
    }
    Ok(children)
}

/// Fails with `InvalidOperation` unless `requested <= sibling_count`.
pub(crate) fn check_position(parent_id: NodeId, requested: Option<u32>, sibling_count: usize) -> TreeResult<()> {
    match requested {
        Some(position) if position as usize > sibling_count => {
            log::error!(
                "Position {} out of range for parent {} with {} children",
                position,
                parent_id,
                sibling_count
            );
            Err(TreeError::new(
                &format!(
                    "Position {} is out of range: parent {} has {} children",
                    position, parent_id, sibling_count
                ),
                ErrorKind::InvalidOperation,
            ))
        }
        _ => Ok(()),
    }
}

/// Frees a slot under `parent_id` and returns the position the incoming
/// child must take.
///
/// Appending returns the sibling count. An explicit `requested` position
/// shifts every sibling at or after it up by one.
pub(crate) fn make_room<W: NodeWriter + ?Sized>(
    tx: &mut W,
    parent_id: NodeId,
    requested: Option<u32>,
    exclude: Option<NodeId>,
) -> TreeResult<u32> {
    let children = siblings(&*tx, parent_id, exclude)?;
    check_position(parent_id, requested, children.len())?;

    match requested {
        Some(position) => {
            for mut sibling in children.into_iter().filter(|s| s.position >= position) {
                sibling.position += 1;
                tx.update(sibling)?;
            }
            Ok(position)
        }
        None => Ok(u32::try_from(children.len())?),
    }
}

/// Closes the position gap `removed` left under its parent.
pub(crate) fn compact<W: NodeWriter + ?Sized>(tx: &mut W, removed: &Node) -> TreeResult<()> {
    let children = siblings(&*tx, removed.parent_id, Some(removed.id))?;
    for mut sibling in children
        .into_iter()
        .filter(|s| s.position > removed.position)
    {
        sibling.position -= 1;
        tx.update(sibling)?;
    }
    Ok(())
}
