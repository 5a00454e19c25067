use fake::faker::lorem::en::Word;
use fake::Fake;
use nestree::errors::{ErrorKind, TreeError, TreeResult};
use nestree::nested_tree::NestedTree;
use nestree::node::{Bound, Node, NodeId};
use nestree::store::memory::{InMemoryIntervalStore, InMemoryStoreConfig};
use nestree::store::{
    IntervalStore, IntervalStoreProvider, NodeReader, NodeWriter, StoreTransaction,
    TransactionState,
};
use rand::Rng;
use std::backtrace::Backtrace;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Runs a test with retry logic and error handling.
/// Tests run on the current thread; `after` always runs once `before` succeeded.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> TreeResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> TreeResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> TreeResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;
    let mut last_backtrace: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => after(ctx)
                        .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();

        let failure = match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                last_backtrace = Some(bt);
                e
            }
            Err(panic_err) => {
                let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                last_backtrace = Some(Backtrace::capture().to_string());
                format!("Panic: {}", err_msg)
            }
        };

        if attempt < MAX_RETRIES {
            eprintln!(
                "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                attempt, MAX_RETRIES, elapsed
            );
            eprintln!("Error: {}", failure);
            eprintln!("Retrying in {}ms...\n", 100 * attempt);
            thread::sleep(Duration::from_millis(100 * attempt as u64));
        }
        last_error = Some(failure);
    }

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {} attempts", MAX_RETRIES);
    eprintln!("Last error: {}", last_error.as_deref().unwrap_or("Unknown"));
    if let Some(bt) = &last_backtrace {
        if !bt.is_empty() && !bt.contains("disabled") {
            eprintln!("\nBacktrace:\n{}", bt);
        }
    }
    eprintln!("=====================================================\n");

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

#[derive(Clone)]
pub struct TestContext {
    tree: NestedTree,
    faults: Faults,
}

impl TestContext {
    pub fn new(tree: NestedTree, faults: Faults) -> Self {
        Self { tree, faults }
    }

    pub fn tree(&self) -> NestedTree {
        self.tree.clone()
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }
}

/// A table name no other test uses.
pub fn random_table_name() -> String {
    format!("t_test_{}", rand::rng().random::<u32>())
}

pub fn random_title() -> String {
    Word().fake()
}

/// A fresh tree over a fault-injecting in-memory store, verifying the whole
/// tree inside every write.
pub fn create_test_context() -> TreeResult<TestContext> {
    let (store, faults) = fault_injecting_store();
    let tree = NestedTree::builder()
        .verify_after_write(true)
        .lock_timeout(Duration::from_secs(10))
        .open(store)?;
    Ok(TestContext::new(tree, faults))
}

/// Like [`create_test_context`] with a root already in place.
pub fn create_rooted_test_context() -> TreeResult<TestContext> {
    let ctx = create_test_context()?;
    ctx.tree().create_root("root")?;
    Ok(ctx)
}

pub fn cleanup(ctx: TestContext) -> TreeResult<()> {
    ctx.faults().reset();
    let tree = ctx.tree();
    if !tree.is_closed() {
        tree.verify()?;
        tree.close()?;
    }
    Ok(())
}

pub fn fault_injecting_store() -> (IntervalStore, Faults) {
    let faults = Faults::default();
    let memory = InMemoryIntervalStore::new(InMemoryStoreConfig::new().table_name(&random_table_name()));
    let store = IntervalStore::new(FaultInjectingStore {
        inner: IntervalStore::new(memory),
        faults: faults.clone(),
    });
    (store, faults)
}

/// Sum of `right - left + 1` over the root, i.e. twice the node count.
pub fn root_width(tree: &NestedTree) -> TreeResult<Bound> {
    Ok(tree
        .all_nodes()?
        .iter()
        .find(|n| n.is_root())
        .map(|n| n.width())
        .unwrap_or(0))
}

pub fn ids(nodes: &[Node]) -> Vec<NodeId> {
    nodes.iter().map(|n| n.id).collect()
}

/// Switches for [`FaultInjectingStore`], shared with the test body.
#[derive(Clone, Default)]
pub struct Faults {
    inner: Arc<FaultsInner>,
}

#[derive(Default)]
struct FaultsInner {
    // writes left before the next one fails; negative disables
    writes_until_failure: AtomicI64,
    conflicts_to_inject: AtomicU32,
    begin_delay_ms: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
}

impl Faults {
    /// The `n`th write from now (1-based) fails with `StoreFailure`.
    pub fn fail_write_after(&self, n: i64) {
        self.inner.writes_until_failure.store(n, Ordering::SeqCst);
    }

    /// The next `n` commits are rejected with `ConcurrencyConflict`.
    pub fn inject_conflicts(&self, n: u32) {
        self.inner.conflicts_to_inject.store(n, Ordering::SeqCst);
    }

    /// Every `begin` sleeps this long first.
    pub fn delay_begin(&self, delay: Duration) {
        self.inner
            .begin_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn commits(&self) -> u64 {
        self.inner.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> u64 {
        self.inner.rollbacks.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.inner.writes_until_failure.store(0, Ordering::SeqCst);
        self.inner.conflicts_to_inject.store(0, Ordering::SeqCst);
        self.inner.begin_delay_ms.store(0, Ordering::SeqCst);
    }

    fn before_write(&self) -> TreeResult<()> {
        let left = self.inner.writes_until_failure.load(Ordering::SeqCst);
        if left <= 0 {
            return Ok(());
        }
        self.inner.writes_until_failure.store(left - 1, Ordering::SeqCst);
        if left == 1 {
            log::error!("Injected write failure");
            return Err(TreeError::new("Injected write failure", ErrorKind::StoreFailure));
        }
        Ok(())
    }

    fn take_conflict(&self) -> bool {
        self.inner
            .conflicts_to_inject
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Store wrapper that injects failures, conflicts and latency into an inner
/// store. Shares the inner store's lock key.
pub struct FaultInjectingStore {
    inner: IntervalStore,
    faults: Faults,
}

impl IntervalStoreProvider for FaultInjectingStore {
    fn name(&self) -> String {
        self.inner.name()
    }

    fn lock_key(&self) -> String {
        self.inner.lock_key()
    }

    fn begin(&self) -> TreeResult<Box<dyn StoreTransaction>> {
        let delay = self.faults.inner.begin_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }
        Ok(Box::new(FaultInjectingTransaction {
            inner: Some(self.inner.begin()?),
            faults: self.faults.clone(),
        }))
    }

    fn snapshot(&self) -> TreeResult<Box<dyn NodeReader>> {
        self.inner.snapshot()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn close(&self) -> TreeResult<()> {
        self.inner.close()
    }
}

struct FaultInjectingTransaction {
    inner: Option<Box<dyn StoreTransaction>>,
    faults: Faults,
}

impl FaultInjectingTransaction {
    fn tx(&self) -> TreeResult<&dyn StoreTransaction> {
        self.inner
            .as_deref()
            .ok_or_else(|| TreeError::new("Transaction already finished", ErrorKind::StoreFailure))
    }

    fn tx_mut(&mut self) -> TreeResult<&mut (dyn StoreTransaction + 'static)> {
        self.faults.before_write()?;
        self.inner
            .as_deref_mut()
            .ok_or_else(|| TreeError::new("Transaction already finished", ErrorKind::StoreFailure))
    }
}

impl NodeReader for FaultInjectingTransaction {
    fn get_by_id(&self, id: NodeId) -> TreeResult<Option<Node>> {
        self.tx()?.get_by_id(id)
    }

    fn get_children(&self, parent_id: NodeId) -> TreeResult<Vec<Node>> {
        self.tx()?.get_children(parent_id)
    }

    fn get_range(&self, left_bound: Bound, right_bound: Bound) -> TreeResult<Vec<Node>> {
        self.tx()?.get_range(left_bound, right_bound)
    }

    fn get_enclosing(&self, left_bound: Bound, right_bound: Bound) -> TreeResult<Vec<Node>> {
        self.tx()?.get_enclosing(left_bound, right_bound)
    }

    fn all(&self) -> TreeResult<Vec<Node>> {
        self.tx()?.all()
    }

    fn size(&self) -> TreeResult<u64> {
        self.tx()?.size()
    }
}

impl NodeWriter for FaultInjectingTransaction {
    fn next_id(&mut self) -> TreeResult<NodeId> {
        self.inner
            .as_deref_mut()
            .ok_or_else(|| TreeError::new("Transaction already finished", ErrorKind::StoreFailure))?
            .next_id()
    }

    fn insert(&mut self, node: Node) -> TreeResult<()> {
        self.tx_mut()?.insert(node)
    }

    fn update(&mut self, node: Node) -> TreeResult<()> {
        self.tx_mut()?.update(node)
    }

    fn delete(&mut self, id: NodeId) -> TreeResult<Option<Node>> {
        self.tx_mut()?.delete(id)
    }

    fn delete_range(&mut self, left_bound: Bound, right_bound: Bound) -> TreeResult<Vec<Node>> {
        self.tx_mut()?.delete_range(left_bound, right_bound)
    }

    fn shift_left_bounds_above(&mut self, threshold: Bound, delta: Bound) -> TreeResult<u64> {
        self.tx_mut()?.shift_left_bounds_above(threshold, delta)
    }

    fn shift_right_bounds_above(&mut self, threshold: Bound, delta: Bound) -> TreeResult<u64> {
        self.tx_mut()?.shift_right_bounds_above(threshold, delta)
    }

    fn detach_range(&mut self, left_bound: Bound, right_bound: Bound, level_delta: i64) -> TreeResult<u64> {
        self.tx_mut()?.detach_range(left_bound, right_bound, level_delta)
    }

    fn attach_detached(&mut self, offset: Bound, root_id: NodeId, new_parent_id: NodeId) -> TreeResult<u64> {
        self.tx_mut()?.attach_detached(offset, root_id, new_parent_id)
    }
}

impl StoreTransaction for FaultInjectingTransaction {
    fn commit(mut self: Box<Self>) -> TreeResult<()> {
        let inner = self
            .inner
            .take()
            .ok_or_else(|| TreeError::new("Transaction already finished", ErrorKind::StoreFailure))?;
        if self.faults.take_conflict() {
            inner.rollback()?;
            log::error!("Injected commit conflict");
            return Err(TreeError::new("Injected commit conflict", ErrorKind::ConcurrencyConflict));
        }
        inner.commit()?;
        self.faults.inner.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> TreeResult<()> {
        let inner = self
            .inner
            .take()
            .ok_or_else(|| TreeError::new("Transaction already finished", ErrorKind::StoreFailure))?;
        self.faults.inner.rollbacks.fetch_add(1, Ordering::SeqCst);
        inner.rollback()
    }

    fn state(&self) -> TransactionState {
        match &self.inner {
            Some(inner) => inner.state(),
            None => TransactionState::Aborted,
        }
    }
}
