use crate::node::{Bound, NodeId};

// node constants
pub const ROOT_ID: NodeId = 1;
pub const NO_PARENT: NodeId = 0;
pub const ROOT_LEFT: Bound = 1;
pub const LEAF_WIDTH: Bound = 2;

// payload kinds
pub const DEFAULT_KIND: &str = "default";
pub const FOLDER_KIND: &str = "folder";

// store constants
pub const DEFAULT_TABLE_NAME: &str = "tree_node";

// search constants
pub const DEFAULT_PAGE_UNIT: usize = 10;
