use nestree::common::ROOT_ID;
use nestree::errors::{ErrorKind, TreeError};
use nestree::store::IntervalStoreProvider;
use nestree::tree::{TreeEventInfo, TreeEventListener, TreeEvents};
use nestree_int_test::test_util::{cleanup, create_rooted_test_context, run_test};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn wait_for_event<F: Fn() -> bool>(timeout_ms: u64, check: F) {
    awaitility::at_most(Duration::from_millis(timeout_ms)).until(check);
}

fn recorder() -> (TreeEventListener, Arc<Mutex<Vec<TreeEventInfo>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let listener = TreeEventListener::new(move |info: TreeEventInfo| {
        seen_clone.lock().unwrap().push(info);
        Ok(())
    });
    (listener, seen)
}

#[test]
fn test_structural_events_in_order() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let (listener, seen) = recorder();
            tree.subscribe(listener);

            let a = tree.insert_child(ROOT_ID, "A", None)?;
            let b = tree.insert_child(ROOT_ID, "B", None)?;
            tree.move_node(b.id, a.id, None)?;
            let copy = tree.copy_node(a.id, ROOT_ID, None)?;
            tree.update_payload(copy.id, "A copy")?;
            let removed = tree.delete(a.id)?;

            wait_for_event(1000, || seen.lock().unwrap().len() == 6);
            let seen = seen.lock().unwrap();
            assert_eq!(
                seen.iter().map(|e| e.event_type()).collect::<Vec<_>>(),
                vec![
                    TreeEvents::Inserted,
                    TreeEvents::Inserted,
                    TreeEvents::Moved,
                    TreeEvents::Copied,
                    TreeEvents::Updated,
                    TreeEvents::Deleted,
                ]
            );
            assert_eq!(seen[2].node_ids(), &[b.id]);
            assert_eq!(seen[3].node_ids(), &[copy.id]);
            assert_eq!(seen[5].node_ids(), removed.iter().map(|n| n.id).collect::<Vec<_>>().as_slice());
            assert!(seen.iter().all(|e| e.originator() == tree.store().name()));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failed_operation_publishes_nothing() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let (listener, seen) = recorder();
            tree.subscribe(listener);

            assert!(tree.insert_child(404, "orphan", None).is_err());
            assert!(tree.move_node(ROOT_ID, ROOT_ID, None).is_err());
            tree.insert_child(ROOT_ID, "ok", None)?;

            wait_for_event(1000, || !seen.lock().unwrap().is_empty());
            assert_eq!(seen.lock().unwrap().len(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_events_from_other_threads() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let (listener, seen) = recorder();
            tree.subscribe(listener);

            let handles = (0..4)
                .map(|n| {
                    let tree = tree.clone();
                    thread::spawn(move || tree.insert_child(ROOT_ID, format!("worker {}", n), None))
                })
                .collect::<Vec<_>>();
            for handle in handles {
                handle.join().expect("worker panicked")?;
            }

            wait_for_event(5000, || seen.lock().unwrap().len() == 4);
            assert!(seen
                .lock()
                .unwrap()
                .iter()
                .all(|e| e.event_type() == TreeEvents::Inserted));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failing_listener_does_not_fail_the_write() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            tree.subscribe(TreeEventListener::new(|_info: TreeEventInfo| {
                Err(TreeError::new("listener broke", ErrorKind::InternalError))
            }));
            let (listener, seen) = recorder();
            tree.subscribe(listener);

            let node = tree.insert_child(ROOT_ID, "still written", None)?;
            assert_eq!(tree.get(node.id)?.title(), "still written");
            wait_for_event(1000, || seen.lock().unwrap().len() == 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unsubscribe_stops_delivery() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            let tree = ctx.tree();
            let (listener, seen) = recorder();
            let subscriber = tree.subscribe(listener);

            tree.insert_child(ROOT_ID, "first", None)?;
            tree.unsubscribe(subscriber)?;
            tree.insert_child(ROOT_ID, "second", None)?;

            assert_eq!(seen.lock().unwrap().len(), 1);
            let err = tree.unsubscribe(subscriber).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::NotFound);
            Ok(())
        },
        cleanup,
    )
}
