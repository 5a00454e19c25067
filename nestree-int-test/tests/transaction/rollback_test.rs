use nestree::common::{NO_PARENT, ROOT_ID};
use nestree::errors::{ErrorKind, TreeResult};
use nestree::nested_tree::NestedTree;
use nestree::node::Node;
use nestree_int_test::test_util::{cleanup, create_rooted_test_context, run_test, TestContext};

struct Fixture {
    a: Node,
    b: Node,
}

fn fixture(tree: &NestedTree) -> TreeResult<Fixture> {
    let a = tree.insert_child(ROOT_ID, "A", None)?;
    tree.insert_child(a.id, "A1", None)?;
    tree.insert_child(a.id, "A2", None)?;
    let b = tree.insert_child(ROOT_ID, "B", None)?;
    tree.insert_child(b.id, "B1", None)?;
    Ok(Fixture { a, b })
}

/// Fails the 1st, 2nd, ... write of `op` until it gets through, checking
/// that every failed attempt left the tree untouched.
fn fail_every_write<R>(ctx: &TestContext, op: impl Fn(&NestedTree) -> TreeResult<R>) -> TreeResult<R> {
    let tree = ctx.tree();
    for n in 1..64 {
        let before = tree.all_nodes()?;
        let rollbacks = ctx.faults().rollbacks();
        ctx.faults().fail_write_after(n);

        match op(&tree) {
            Ok(value) => {
                ctx.faults().reset();
                tree.verify()?;
                return Ok(value);
            }
            Err(err) => {
                ctx.faults().reset();
                assert_eq!(err.kind(), &ErrorKind::StoreFailure);
                assert_eq!(tree.all_nodes()?, before, "write {} left partial changes", n);
                assert_eq!(ctx.faults().rollbacks(), rollbacks + 1);
            }
        }
    }
    panic!("operation never got past injected write failures");
}

#[test]
fn test_insert_rolls_back() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let f = fixture(&ctx.tree())?;
            let node = fail_every_write(&ctx, |tree| tree.insert_child(f.a.id, "late", Some(1)))?;
            assert_eq!(ctx.tree().children(f.a.id)?[1].id, node.id);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_rolls_back() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let f = fixture(&ctx.tree())?;
            let removed = fail_every_write(&ctx, |tree| tree.delete(f.a.id))?;
            assert_eq!(removed.len(), 3);
            assert_eq!(ctx.tree().get(f.b.id)?.position, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_move_rolls_back() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let f = fixture(&ctx.tree())?;
            let moved = fail_every_write(&ctx, |tree| tree.move_node(f.a.id, f.b.id, Some(0)))?;
            assert_eq!((moved.parent_id, moved.level, moved.position), (f.b.id, 2, 0));
            assert_eq!(ctx.tree().descendants(moved.id)?.len(), 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_copy_rolls_back() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let f = fixture(&ctx.tree())?;
            let size = ctx.tree().size()?;
            let copy = fail_every_write(&ctx, |tree| tree.copy_node(f.a.id, f.b.id, None))?;
            assert_eq!(ctx.tree().size()?, size + 3);
            assert_eq!(ctx.tree().descendants(copy.id)?.len(), 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_import_rolls_back() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            fixture(&ctx.tree())?;
            let rows = ctx.tree().all_nodes()?;
            ctx.tree().delete(ROOT_ID)?;
            let count = fail_every_write(&ctx, |tree| tree.import(rows.clone()))?;
            assert_eq!(count, rows.len() as u64);
            assert_eq!(ctx.tree().all_nodes()?, rows);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_import_writes_nothing() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            fixture(&tree)?;
            let rows = tree.all_nodes()?;
            tree.delete(ROOT_ID)?;

            let mut widened = rows.clone();
            widened[2].right += 1;
            let err = tree.import(widened).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);

            // the root keeps its reserved id and no row may claim "no parent" as its id
            let mut renumbered = rows.clone();
            for row in renumbered.iter_mut() {
                row.id += 10;
                if row.parent_id != NO_PARENT {
                    row.parent_id += 10;
                }
            }
            let err = tree.import(renumbered).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);

            let mut zero = rows.clone();
            let last = zero.len() - 1;
            zero[last].id = NO_PARENT;
            let err = tree.import(zero).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);

            assert_eq!(tree.size()?, 0);
            tree.create_root("root")?;
            Ok(())
        },
        cleanup,
    )
}
