use nestree::common::ROOT_ID;
use nestree::errors::TreeResult;
use nestree::node::NodeId;
use nestree_int_test::test_util::{cleanup, create_rooted_test_context, random_title};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

fn main() -> TreeResult<()> {
    colog::init();
    println!("Starting stress run...");
    let ctx = create_rooted_test_context()?;
    let tree = ctx.tree();
    let mut rng = StdRng::seed_from_u64(7);
    let mut live: Vec<NodeId> = vec![ROOT_ID];

    let start = Instant::now();
    for round in 0..2_000 {
        let parent = live[rng.random_range(0..live.len())];
        let node = tree.insert_child(parent, random_title(), None)?;
        live.push(node.id);

        if round % 10 == 9 {
            let candidate = live[rng.random_range(1..live.len())];
            let target = live[rng.random_range(0..live.len())];
            let source = tree.get(candidate)?;
            let target_node = tree.get(target)?;
            if target != candidate && !source.is_ancestor_of(&target_node) {
                tree.move_node(candidate, target, None)?;
            }
        }
    }
    println!(
        "Built {} nodes in {:?}; root spans {:?}",
        tree.size()?,
        start.elapsed(),
        tree.get(ROOT_ID).map(|root| (root.left, root.right))?
    );

    cleanup(ctx)?;
    println!("Stress run finished");
    Ok(())
}
