use crate::common::DEFAULT_TABLE_NAME;

/// Configuration for an in-memory interval store.
///
/// The table name is the tenant binding: a store instance serves exactly
/// one table for its whole life.
///
/// # Usage
/// ```text
/// let config = InMemoryStoreConfig::new().table_name("t_req_7");
/// let store = InMemoryIntervalStore::new(config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryStoreConfig {
    table_name: String,
}

impl InMemoryStoreConfig {
    /// Creates a configuration bound to the default `tree_node` table.
    pub fn new() -> InMemoryStoreConfig {
        InMemoryStoreConfig {
            table_name: DEFAULT_TABLE_NAME.to_string(),
        }
    }

    /// Binds the store to another table / tenant.
    pub fn table_name(mut self, table_name: &str) -> Self {
        self.table_name = table_name.to_string();
        self
    }

    pub fn get_table_name(&self) -> &str {
        &self.table_name
    }
}

impl Default for InMemoryStoreConfig {
    fn default() -> Self {
        Self::new()
    }
}
