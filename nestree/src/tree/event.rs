use crate::errors::TreeResult;
use crate::node::NodeId;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::Arc;

/// Structural changes a tree publishes after they commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvents {
    RootCreated,
    Inserted,
    Updated,
    Deleted,
    Moved,
    Copied,
    Imported,
}

/// What changed, where, and when.
///
/// `node_ids` lists the rows the operation created or touched directly: the
/// new node for an insert, every removed row for a delete, the copy's root
/// for a copy.
#[derive(Clone)]
pub struct TreeEventInfo {
    inner: Arc<TreeEventInner>,
}

impl TreeEventInfo {
    pub fn new(event_type: TreeEvents, node_ids: Vec<NodeId>, originator: String) -> Self {
        TreeEventInfo {
            inner: Arc::new(TreeEventInner {
                event_type,
                node_ids,
                originator,
                timestamp: Utc::now(),
            }),
        }
    }

    pub fn event_type(&self) -> TreeEvents {
        self.inner.event_type.clone()
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.inner.node_ids
    }

    /// Name of the store the change was committed to.
    pub fn originator(&self) -> &str {
        &self.inner.originator
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.inner.timestamp
    }
}

impl Debug for TreeEventInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeEventInfo")
            .field("event_type", &self.inner.event_type)
            .field("node_ids", &self.inner.node_ids)
            .field("originator", &self.inner.originator)
            .field("timestamp", &self.inner.timestamp)
            .finish()
    }
}

struct TreeEventInner {
    event_type: TreeEvents,
    node_ids: Vec<NodeId>,
    originator: String,
    timestamp: DateTime<Utc>,
}

/// Signature for event handlers. Any `Send + Sync` closure taking a
/// [`TreeEventInfo`] and returning `TreeResult<()>` qualifies.
pub trait TreeEventCallback: Send + Sync + Fn(TreeEventInfo) -> TreeResult<()> {}

impl<F> TreeEventCallback for F where F: Send + Sync + Fn(TreeEventInfo) -> TreeResult<()> {}

/// A subscribed event handler.
///
/// # Examples
///
/// ```rust
/// use nestree::tree::{TreeEventInfo, TreeEventListener, TreeEvents};
///
/// let listener = TreeEventListener::new(|info: TreeEventInfo| {
///     if info.event_type() == TreeEvents::Moved {
///         println!("moved {:?}", info.node_ids());
///     }
///     Ok(())
/// });
/// ```
#[derive(Clone)]
pub struct TreeEventListener {
    on_event: Arc<dyn TreeEventCallback>,
}

impl TreeEventListener {
    pub fn new(on_event: impl TreeEventCallback + 'static) -> Self {
        TreeEventListener {
            on_event: Arc::new(on_event),
        }
    }

    pub(crate) fn notify(&self, info: TreeEventInfo) -> TreeResult<()> {
        (self.on_event)(info)
    }
}

impl Debug for TreeEventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeEventListener").finish()
    }
}

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberRef {
    id: u64,
}

impl SubscriberRef {
    pub(crate) fn new(id: u64) -> Self {
        SubscriberRef { id }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}
