use nestree::common::{SortOrder, ROOT_ID};
use nestree::errors::{ErrorKind, TreeResult};
use nestree::node::{NodeKind, Payload};
use nestree::tree::{NodeSearch, SortField};
use nestree_int_test::test_util::{cleanup, create_rooted_test_context, ids, run_test, TestContext};

fn populate(ctx: &TestContext) -> TreeResult<()> {
    let tree = ctx.tree();
    let docs = tree.insert_child(ROOT_ID, Payload::new("Documents").with_kind(NodeKind::Folder), None)?;
    tree.insert_child(docs.id, "Budget 2024", None)?;
    tree.insert_child(docs.id, "budget draft", None)?;
    let archive = tree.insert_child(ROOT_ID, Payload::new("Archive").with_kind(NodeKind::Folder), None)?;
    for n in 0..12 {
        tree.insert_child(archive.id, format!("entry {:02}", n), None)?;
    }
    Ok(())
}

#[test]
fn test_reads_around_a_subtree() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            populate(&ctx)?;
            let tree = ctx.tree();
            let docs = tree.search(&NodeSearch::new().title("documents"))?.nodes[0].clone();

            let children = tree.children(docs.id)?;
            assert_eq!(children.len(), 2);
            assert_eq!(tree.descendants(docs.id)?, children);
            assert!(tree.descendants(children[0].id)?.is_empty());

            let ancestors = tree.ancestors(children[1].id)?;
            assert_eq!(ids(&ancestors), vec![ROOT_ID, docs.id]);
            assert!(tree.ancestors(ROOT_ID)?.is_empty());

            assert_eq!(tree.children(999).unwrap_err().kind(), &ErrorKind::NotFound);
            assert_eq!(tree.size()?, 17);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_search_filters_and_ordering() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            populate(&ctx)?;
            let tree = ctx.tree();

            let budgets = tree.search(
                &NodeSearch::new()
                    .search_string(" BUDGET ")
                    .order_by(SortField::Title, SortOrder::Ascending),
            )?;
            assert_eq!(
                budgets.nodes.iter().map(|n| n.title()).collect::<Vec<_>>(),
                vec!["Budget 2024", "budget draft"]
            );

            let folders = NodeSearch::new().kind(NodeKind::Folder).level(1);
            assert_eq!(tree.count(&folders)?, 2);
            assert_eq!(tree.count(&NodeSearch::new().level(2))?, 14);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_search_pages_through_children() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            populate(&ctx)?;
            let tree = ctx.tree();
            let archive = tree.search(&NodeSearch::new().title("archive"))?.nodes[0].clone();
            let search = NodeSearch::new()
                .parent_id(archive.id)
                .order_by(SortField::Position, SortOrder::Descending)
                .page_unit(5);

            let first = tree.search(&search.clone().page(1))?;
            assert_eq!(first.nodes.len(), 5);
            assert_eq!(first.nodes[0].title(), "entry 11");
            assert_eq!((first.total, first.total_pages), (12, 3));

            let last = tree.search(&search.page(3))?;
            assert_eq!(
                last.nodes.iter().map(|n| n.title()).collect::<Vec<_>>(),
                vec!["entry 01", "entry 00"]
            );
            assert!(last.is_last_page());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_payload_keeps_structure() {
    run_test(
        create_rooted_test_context,
        |ctx| {
            populate(&ctx)?;
            let tree = ctx.tree();
            let before = tree.all_nodes()?;
            let target = before[2].clone();

            let updated = tree.update_payload(
                target.id,
                Payload::new("Renamed").with_attribute("owner", "finance"),
            )?;
            assert_eq!(updated.title(), "Renamed");
            assert_eq!(updated.payload.attribute("owner"), Some("finance"));
            assert_eq!(
                (updated.left, updated.right, updated.level, updated.position, updated.parent_id),
                (target.left, target.right, target.level, target.position, target.parent_id)
            );
            assert_eq!(tree.all_nodes()?.len(), before.len());
            Ok(())
        },
        cleanup,
    )
}
