//! The node row and its opaque payload.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::fmt::{Display, Formatter};

use crate::common::{DEFAULT_KIND, FOLDER_KIND, NO_PARENT};

/// Unique, immutable node identifier. `1` is the root, `0` means "no parent".
pub type NodeId = u64;

/// A nested-set bound. Signed, because a subtree being moved is parked at
/// negative bounds while the rest of the tree is relabeled.
pub type Bound = i64;

/// The kind tag carried in a node's payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub enum NodeKind {
    #[default]
    Default,
    Folder,
    Custom(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Default => DEFAULT_KIND,
            NodeKind::Folder => FOLDER_KIND,
            NodeKind::Custom(tag) => tag,
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for NodeKind {
    fn from(value: &str) -> Self {
        match value {
            DEFAULT_KIND => NodeKind::Default,
            FOLDER_KIND => NodeKind::Folder,
            other => NodeKind::Custom(other.to_string()),
        }
    }
}

impl From<String> for NodeKind {
    fn from(value: String) -> Self {
        NodeKind::from(value.as_str())
    }
}

impl From<NodeKind> for String {
    fn from(value: NodeKind) -> Self {
        value.as_str().to_string()
    }
}

/// Presentation data attached to a node. The tree algebra never looks inside.
///
/// # Examples
///
/// ```rust
/// use nestree::node::{NodeKind, Payload};
///
/// let payload = Payload::new("Reports")
///     .with_kind(NodeKind::Folder)
///     .with_attribute("owner", "ops");
/// assert_eq!(payload.attribute("owner"), Some("ops"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Payload {
    pub title: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: NodeKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: IndexMap<String, String>,
}

impl Payload {
    pub fn new(title: impl Into<String>) -> Self {
        Payload {
            title: title.into(),
            kind: NodeKind::Default,
            attributes: IndexMap::new(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<NodeKind>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

impl From<&str> for Payload {
    fn from(title: &str) -> Self {
        Payload::new(title)
    }
}

impl From<String> for Payload {
    fn from(title: String) -> Self {
        Payload::new(title)
    }
}

/// One row of the interval-coded store.
///
/// Bounds, level and position are owned by the engine; callers only ever
/// choose the payload.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub id: NodeId,
    pub parent_id: NodeId,
    pub left: Bound,
    pub right: Bound,
    pub level: u32,
    pub position: u32,
    pub payload: Payload,
    pub created_at: DateTime<Utc>,
}

impl Node {
    /// `right - left + 1`; a leaf has width 2.
    #[inline]
    pub fn width(&self) -> Bound {
        self.right - self.left + 1
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.right - self.left == 1
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_id == NO_PARENT
    }

    /// Number of nodes strictly inside this node's interval.
    #[inline]
    pub fn descendant_count(&self) -> u64 {
        ((self.right - self.left - 1) / 2).max(0) as u64
    }

    /// `true` when `other` lies strictly inside this node's interval.
    #[inline]
    pub fn is_ancestor_of(&self, other: &Node) -> bool {
        self.left < other.left && other.right < self.right
    }

    /// `true` when `other` is this node or one of its descendants.
    #[inline]
    pub fn contains(&self, other: &Node) -> bool {
        self.left <= other.left && other.right <= self.right
    }

    pub fn title(&self) -> &str {
        &self.payload.title
    }

    pub fn kind(&self) -> &NodeKind {
        &self.payload.kind
    }
}
