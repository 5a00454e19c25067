use crate::common::{SortOrder, DEFAULT_PAGE_UNIT};
use crate::errors::{ErrorKind, TreeError, TreeResult};
use crate::node::{Node, NodeId, NodeKind};
use icu_collator::options::{CollatorOptions, Strength};
use icu_collator::{Collator, CollatorBorrowed, CollatorPreferences};
use itertools::Itertools;
use std::cmp::Ordering;

/// Field a search orders its results by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    /// Pre-order (document order); the natural order of a nested-set tree
    #[default]
    Left,
    Id,
    Level,
    Position,
    /// Case-insensitive, locale-aware title order
    Title,
}

impl SortField {
    fn collator(self) -> TreeResult<Option<CollatorBorrowed<'static>>> {
        if self != SortField::Title {
            return Ok(None);
        }
        let mut options = CollatorOptions::default();
        options.strength = Some(Strength::Secondary);
        Collator::try_new(CollatorPreferences::default(), options)
            .map(Some)
            .map_err(|_| {
                log::error!("Failed to create collator for title ordering");
                TreeError::new(
                    "Failed to create collator for title ordering",
                    ErrorKind::InternalError,
                )
            })
    }

    fn compare(self, a: &Node, b: &Node, collator: Option<&CollatorBorrowed<'_>>) -> Ordering {
        match self {
            SortField::Left => a.left.cmp(&b.left),
            SortField::Id => a.id.cmp(&b.id),
            SortField::Level => a.level.cmp(&b.level),
            SortField::Position => a.position.cmp(&b.position),
            SortField::Title => collator
                .map(|c| c.compare(a.title(), b.title()))
                .unwrap_or_else(|| a.title().cmp(b.title())),
        }
    }
}

/// Filter, order and paging for a node listing.
///
/// Every filter is optional and filters combine with AND. Title and search
/// string filters are case-insensitive substring matches on the title.
/// Without [`NodeSearch::page`] the whole result set comes back as one page.
///
/// # Examples
///
/// ```rust
/// use nestree::common::SortOrder;
/// use nestree::tree::{NodeSearch, SortField};
///
/// let search = NodeSearch::new()
///     .level(1)
///     .title("report")
///     .order_by(SortField::Title, SortOrder::Ascending)
///     .page(2)
///     .page_unit(20);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeSearch {
    id: Option<NodeId>,
    parent_id: Option<NodeId>,
    level: Option<u32>,
    kind: Option<NodeKind>,
    title: Option<String>,
    search_string: Option<String>,
    sort_field: SortField,
    sort_order: SortOrder,
    page: Option<usize>,
    page_unit: Option<usize>,
}

impl NodeSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn parent_id(mut self, parent_id: NodeId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn kind(mut self, kind: impl Into<NodeKind>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_lowercase());
        self
    }

    /// Free-text filter; blank strings are ignored.
    pub fn search_string(mut self, search_string: &str) -> Self {
        let trimmed = search_string.trim();
        self.search_string = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_lowercase())
        };
        self
    }

    pub fn order_by(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_field = field;
        self.sort_order = order;
        self
    }

    /// One-based page index.
    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Rows per page, `DEFAULT_PAGE_UNIT` unless set.
    pub fn page_unit(mut self, page_unit: usize) -> Self {
        self.page_unit = Some(page_unit);
        self
    }

    pub fn matches(&self, node: &Node) -> bool {
        let contains = |needle: &Option<String>| match needle {
            Some(needle) => node.title().to_lowercase().contains(needle.as_str()),
            None => true,
        };

        self.id.is_none_or(|id| node.id == id)
            && self.parent_id.is_none_or(|parent_id| node.parent_id == parent_id)
            && self.level.is_none_or(|level| node.level == level)
            && self.kind.as_ref().is_none_or(|kind| node.kind() == kind)
            && contains(&self.title)
            && contains(&self.search_string)
    }

    /// Number of rows matching the filters, ignoring paging.
    pub fn count(&self, nodes: &[Node]) -> u64 {
        nodes.iter().filter(|node| self.matches(node)).count() as u64
    }

    /// Filters, orders and pages `nodes`.
    pub fn apply(&self, nodes: Vec<Node>) -> TreeResult<SearchPage> {
        let (field, order) = (self.sort_field, self.sort_order);
        let collator = field.collator()?;
        let matching = nodes
            .into_iter()
            .filter(|node| self.matches(node))
            .sorted_by(|a, b| {
                order
                    .apply(field.compare(a, b, collator.as_ref()))
                    .then_with(|| a.left.cmp(&b.left))
            })
            .collect_vec();
        let total = matching.len();

        let Some(page_index) = self.page else {
            return Ok(SearchPage {
                total_pages: usize::from(total > 0),
                nodes: matching,
                total,
                page_index: 1,
                page_unit: total,
            });
        };

        let page_unit = self.page_unit.unwrap_or(DEFAULT_PAGE_UNIT);
        if page_index == 0 || page_unit == 0 {
            log::error!("Invalid paging: page {} of {} rows", page_index, page_unit);
            return Err(TreeError::new(
                &format!(
                    "Page index and page unit must be at least 1 (got page {}, unit {})",
                    page_index, page_unit
                ),
                ErrorKind::ValidationError,
            ));
        }

        let nodes = matching
            .into_iter()
            .skip((page_index - 1).saturating_mul(page_unit))
            .take(page_unit)
            .collect_vec();
        Ok(SearchPage {
            nodes,
            total,
            page_index,
            page_unit,
            total_pages: total.div_ceil(page_unit),
        })
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub nodes: Vec<Node>,
    /// Matches across all pages
    pub total: usize,
    pub page_index: usize,
    pub page_unit: usize,
    pub total_pages: usize,
}

impl SearchPage {
    pub fn is_last_page(&self) -> bool {
        self.page_index >= self.total_pages
    }
}
