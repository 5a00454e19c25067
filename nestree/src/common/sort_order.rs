/// Direction used when ordering search results.
///
/// # Variants
/// - `Ascending`: smallest first (A to Z, shallow to deep, left to right)
/// - `Descending`: largest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Applies this direction to an ascending comparison result.
    #[inline]
    pub fn apply(self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}
