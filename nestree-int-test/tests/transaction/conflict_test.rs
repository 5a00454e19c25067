use nestree::common::ROOT_ID;
use nestree::errors::ErrorKind;
use nestree::nested_tree::NestedTree;
use nestree_int_test::test_util::{
    cleanup, create_rooted_test_context, fault_injecting_store, run_test, TestContext,
};
use std::thread;
use std::time::Duration;

#[test]
fn test_single_conflict_is_retried() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let commits = ctx.faults().commits();
            ctx.faults().inject_conflicts(1);

            let node = tree.insert_child(ROOT_ID, "retried", None)?;
            assert_eq!(tree.get(node.id)?.title(), "retried");
            assert_eq!(ctx.faults().commits(), commits + 1);
            assert_eq!(tree.size()?, 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_repeated_conflict_is_reported() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let before = tree.all_nodes()?;
            ctx.faults().inject_conflicts(2);

            let err = tree.insert_child(ROOT_ID, "lost", None).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ConcurrencyConflict);
            assert!(err.is_retryable());
            assert_eq!(tree.all_nodes()?, before);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_conflict_without_retry() {
    run_test(
        || {
            let (store, faults) = fault_injecting_store();
            let tree = NestedTree::builder()
                .retry_on_conflict(false)
                .verify_after_write(true)
                .open(store)?;
            tree.create_root("root")?;
            Ok(TestContext::new(tree, faults))
        },
        |ctx| {
            let tree = ctx.tree();
            ctx.faults().inject_conflicts(1);

            let err = tree.insert_child(ROOT_ID, "lost", None).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ConcurrencyConflict);
            assert_eq!(tree.size()?, 1);

            tree.insert_child(ROOT_ID, "next", None)?;
            assert_eq!(tree.size()?, 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_lock_timeout_is_a_conflict() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let impatient = NestedTree::builder()
                .lock_timeout(Duration::from_millis(50))
                .open(tree.store().clone())?;

            ctx.faults().delay_begin(Duration::from_millis(600));
            let slow = {
                let tree = tree.clone();
                thread::spawn(move || tree.insert_child(ROOT_ID, "slow", None))
            };
            thread::sleep(Duration::from_millis(150));

            let err = impatient.insert_child(ROOT_ID, "fast", None).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ConcurrencyConflict);

            slow.join().expect("writer panicked")?;
            ctx.faults().reset();
            assert_eq!(tree.size()?, 2);

            // reads never take the tree lock
            assert_eq!(impatient.children(ROOT_ID)?[0].title(), "slow");
            Ok(())
        },
        cleanup,
    )
}
