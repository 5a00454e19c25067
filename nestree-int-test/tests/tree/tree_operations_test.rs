use nestree::common::ROOT_ID;
use nestree::errors::{ErrorKind, TreeResult};
use nestree::node::{NodeKind, Payload};
use nestree_int_test::test_util::{
    cleanup, create_rooted_test_context, create_test_context, ids, root_width, run_test,
};

fn kind<T>(result: TreeResult<T>) -> ErrorKind {
    match result {
        Ok(_) => panic!("operation should have failed"),
        Err(err) => err.kind().clone(),
    }
}

#[test]
fn test_first_child_of_root() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let a = tree.insert_child(ROOT_ID, "A", None)?;
            assert_eq!((a.left, a.right, a.level, a.position), (2, 3, 1, 0));
            let root = tree.get(ROOT_ID)?;
            assert_eq!((root.left, root.right), (1, 4));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_second_child_is_appended() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            tree.insert_child(ROOT_ID, "A", None)?;
            let b = tree.insert_child(ROOT_ID, "B", None)?;
            assert_eq!((b.left, b.right, b.position), (4, 5, 1));
            assert_eq!(tree.get(ROOT_ID)?.right, 6);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_grandchild_widens_ancestors() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let a = tree.insert_child(ROOT_ID, "A", None)?;
            let b = tree.insert_child(ROOT_ID, "B", None)?;
            let c = tree.insert_child(a.id, "C", None)?;

            let a = tree.get(a.id)?;
            let b = tree.get(b.id)?;
            assert_eq!((a.left, a.right), (2, 5));
            assert_eq!((c.left, c.right, c.level), (3, 4, 2));
            assert_eq!((b.left, b.right), (6, 7));
            assert_eq!(tree.get(ROOT_ID)?.right, 8);
            assert_eq!(tree.descendants(ROOT_ID)?.len(), 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_subtree_compacts_siblings() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let a = tree.insert_child(ROOT_ID, "A", None)?;
            let b = tree.insert_child(ROOT_ID, "B", None)?;
            let c = tree.insert_child(a.id, "C", None)?;

            let removed = tree.delete(a.id)?;
            assert_eq!(ids(&removed), vec![a.id, c.id]);

            let root = tree.get(ROOT_ID)?;
            let b = tree.get(b.id)?;
            assert_eq!((root.left, root.right), (1, 4));
            assert_eq!((b.left, b.right, b.position), (2, 3, 0));
            assert_eq!(tree.get(c.id).unwrap_err().kind(), &ErrorKind::NotFound);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_move_under_new_folder() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let a = tree.insert_child(ROOT_ID, "A", None)?;
            let b = tree.insert_child(ROOT_ID, "B", None)?;
            let d = tree.insert_child(ROOT_ID, Payload::new("D").with_kind(NodeKind::Folder), None)?;
            let width = root_width(&tree)?;

            let moved = tree.move_node(b.id, d.id, None)?;
            assert_eq!(moved.parent_id, d.id);
            assert_eq!(moved.level, 2);
            assert_eq!(ids(&tree.children(ROOT_ID)?), vec![a.id, d.id]);
            assert_eq!(ids(&tree.children(d.id)?), vec![b.id]);
            assert_eq!(tree.get(d.id)?.position, 1);
            assert_eq!(root_width(&tree)?, width);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_copy_three_node_subtree() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let a = tree.insert_child(ROOT_ID, "A", None)?;
            let a1 = tree.insert_child(a.id, "A1", None)?;
            let a2 = tree.insert_child(a.id, "A2", None)?;
            let target = tree.insert_child(ROOT_ID, "target", None)?;
            let source_before = tree.descendants(a.id)?;

            let copy = tree.copy_node(a.id, target.id, None)?;
            let copied = tree.descendants(copy.id)?;
            let mut all_copy_ids = vec![copy.id];
            all_copy_ids.extend(ids(&copied));

            assert_eq!(all_copy_ids.len(), 3);
            assert!(all_copy_ids.iter().all(|id| ![a.id, a1.id, a2.id].contains(id)));
            assert_eq!(copy.title(), "A");
            assert_eq!(
                copied.iter().map(|n| (n.title(), n.level - copy.level, n.parent_id)).collect::<Vec<_>>(),
                vec![("A1", 1, copy.id), ("A2", 1, copy.id)]
            );
            assert_eq!(tree.descendants(a.id)?, source_before);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_copy_at_explicit_position() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let a = tree.insert_child(ROOT_ID, "A", None)?;
            let b = tree.insert_child(ROOT_ID, "B", None)?;
            tree.insert_child(b.id, "B1", None)?;

            let copy = tree.copy_node(b.id, ROOT_ID, Some(0))?;
            assert_eq!(ids(&tree.children(ROOT_ID)?), vec![copy.id, a.id, b.id]);
            assert_eq!(tree.children(copy.id)?[0].title(), "B1");
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_reorder_within_parent() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let a = tree.insert_child(ROOT_ID, "A", None)?;
            let b = tree.insert_child(ROOT_ID, "B", None)?;
            let c = tree.insert_child(ROOT_ID, "C", None)?;
            tree.insert_child(a.id, "A1", None)?;

            tree.move_node(a.id, ROOT_ID, Some(2))?;
            assert_eq!(ids(&tree.children(ROOT_ID)?), vec![b.id, c.id, a.id]);
            tree.move_node(c.id, ROOT_ID, Some(0))?;
            assert_eq!(ids(&tree.children(ROOT_ID)?), vec![c.id, b.id, a.id]);
            assert_eq!(tree.children(a.id)?[0].title(), "A1");
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_requests_are_rejected() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let a = tree.insert_child(ROOT_ID, "A", None)?;
            let c = tree.insert_child(a.id, "C", None)?;
            let before = tree.all_nodes()?;

            assert_eq!(kind(tree.move_node(a.id, c.id, None)), ErrorKind::InvalidOperation);
            assert_eq!(kind(tree.move_node(a.id, a.id, None)), ErrorKind::InvalidOperation);
            assert_eq!(kind(tree.move_node(ROOT_ID, a.id, None)), ErrorKind::InvalidOperation);
            assert_eq!(kind(tree.move_node(a.id, 404, None)), ErrorKind::NotFound);
            assert_eq!(kind(tree.copy_node(a.id, a.id, None)), ErrorKind::InvalidOperation);
            assert_eq!(kind(tree.copy_node(404, a.id, None)), ErrorKind::NotFound);
            assert_eq!(kind(tree.insert_child(a.id, "x", Some(2))), ErrorKind::InvalidOperation);
            assert_eq!(kind(tree.create_root("second")), ErrorKind::InvalidOperation);

            assert_eq!(tree.all_nodes()?, before);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_root_then_recreate() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let a = tree.insert_child(ROOT_ID, "A", None)?;
            tree.insert_child(a.id, "C", None)?;

            assert_eq!(tree.delete(ROOT_ID)?.len(), 3);
            assert_eq!(tree.size()?, 0);
            let root = tree.create_root("again")?;
            assert_eq!((root.id, root.left, root.right), (ROOT_ID, 1, 2));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_export_into_fresh_tree() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let a = tree.insert_child(ROOT_ID, "A", None)?;
            tree.insert_child(a.id, Payload::new("C").with_attribute("color", "red"), None)?;
            tree.insert_child(ROOT_ID, "B", Some(0))?;
            let rows = tree.all_nodes()?;

            let other = create_test_context()?;
            other.tree().import(rows.clone())?;
            assert_eq!(other.tree().all_nodes()?, rows);
            cleanup(other)?;
            Ok(())
        },
        cleanup,
    )
}
